pub mod cli;
pub mod cli_handlers;
pub mod config;
pub mod error;
pub mod logging;
pub mod relay;
pub mod server;
