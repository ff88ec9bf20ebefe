//! Long-running monitoring services

pub mod activity;
pub mod background;
pub mod monitor;
pub mod pause;
