use clap::{Parser, Subcommand};

const LONG_ABOUT: &str = r#"
Chat Relay - real-time WebSocket message relay

Clients connect to ws://<host>:<port>/ws and exchange JSON frames:
  {"type": "message", "to": "<client id>", "content": "hi", "timestamp": 1}

Routing:
  • "to" set and connected   → delivered to that client only
  • "to" absent or unknown   → broadcast to every other client
  • {"type": "ping"}         → server answers with "pong"

Unresponsive clients are evicted after two missed heartbeats.

Environment:
  RELAY_HOST, RELAY_PORT, RELAY_HEARTBEAT_SECS   server defaults
  RELAY_LOG_FILE                                  log to ~/.chat-relay/logs
  RELAY_LOG_RETENTION_DAYS                        rotated log retention (default 7)
"#;

#[derive(Parser, Clone)]
#[command(name = "chat-relay")]
#[command(about = "Real-time WebSocket chat relay with heartbeat liveness tracking")]
#[command(long_about = LONG_ABOUT)]
#[command(version)]
pub struct Cli {
    /// Enable verbose output (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress non-error output (-q)
    #[arg(short, long)]
    pub quiet: bool,

    /// Output logs in JSON format
    #[arg(long)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Clone)]
pub enum Commands {
    /// Run the relay server
    Serve {
        /// Address to bind (default: 127.0.0.1 or RELAY_HOST)
        #[arg(long)]
        host: Option<String>,

        /// Port to bind (default: 3000 or RELAY_PORT)
        #[arg(long)]
        port: Option<u16>,

        /// Heartbeat sweep period in seconds (default: 30 or RELAY_HEARTBEAT_SECS)
        #[arg(long)]
        heartbeat_secs: Option<u64>,
    },

    /// Query a running relay for its status and connected clients
    Status {
        /// Relay host (default: 127.0.0.1 or RELAY_HOST)
        #[arg(long)]
        host: Option<String>,

        /// Relay port (default: 3000 or RELAY_PORT)
        #[arg(long)]
        port: Option<u16>,
    },
}
