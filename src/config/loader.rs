use super::structs::Config;
use std::fs;
use std::path::Path;
use log::{info, warn};

const CONFIG_PATH: &str = "/etc/speedmeter/config.toml";

/// Load the config from `path` (or the default location), falling back to defaults
pub fn load_config(path: Option<&Path>) -> Config {
    let path = path.unwrap_or_else(|| Path::new(CONFIG_PATH));

    if path.exists() {
        match fs::read_to_string(path) {
            Ok(content) => match toml::from_str(&content) {
                Ok(config) => {
                    info!("Loaded configuration from {}", path.display());
                    return config;
                }
                Err(e) => {
                    warn!("Failed to parse config file: {}. Using defaults.", e);
                }
            },
            Err(e) => {
                warn!("Failed to read config file: {}. Using defaults.", e);
            }
        }
    } else {
        info!("No config file found at {}. Using defaults.", path.display());
    }

    Config::default()
}
