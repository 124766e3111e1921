//! Core application infrastructure

pub mod cli;
pub mod config;
pub mod constants;
pub mod storage;

pub use cli::Commands;
pub use config::LucienConfig;
pub use storage::{AppStorage, DataSubdir};
