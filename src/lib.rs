pub mod app;
pub mod cli;
pub mod config;
pub mod fmt;
pub mod logging;
pub mod poller;
pub mod portal;
pub mod prompt;
pub mod signals;
pub mod utils;
