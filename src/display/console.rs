//! Console output, one line per update

use anyhow::Result;
use std::io::Write;

use crate::service::monitor::SpeedUpdate;

pub struct ConsoleRenderer {
    out: Box<dyn Write + Send>,
}

impl Default for ConsoleRenderer {
    fn default() -> Self {
        Self::with_writer(std::io::stdout())
    }
}

impl ConsoleRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_writer(out: impl Write + Send + 'static) -> Self {
        Self { out: Box::new(out) }
    }

    pub fn present(&mut self, update: &SpeedUpdate) -> Result<()> {
        writeln!(self.out, "{}", status_line(update))?;
        self.out.flush()?;
        Ok(())
    }
}

pub fn status_line(update: &SpeedUpdate) -> String {
    let mut line = format!(
        "↓ {:>9}  ↑ {:>9}",
        update.rates.download_label, update.rates.upload_label
    );
    if let Some(pct) = update.signal_percent {
        line.push_str(&format!("  Signal: {}%", pct));
    }
    line
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::estimator::RateResult;

    #[test]
    fn test_status_line() {
        let update = SpeedUpdate {
            rates: RateResult::new(3 * 1024 * 1024, 0),
            signal_percent: Some(50),
        };
        assert_eq!(status_line(&update), "↓    3 MB/s  ↑     0 B/s  Signal: 50%");
    }
}
