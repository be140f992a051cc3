// CLI command handlers
//
// serve: run the relay in the foreground
// status: query a running relay over HTTP

pub mod serve;
pub mod status;

pub use serve::handle_serve_command;
pub use status::handle_status_command;
