pub mod loader;
pub mod structs;
