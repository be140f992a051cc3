use chat_relay::cli::{Cli, Commands};
use chat_relay::cli_handlers::{handle_serve_command, handle_status_command};
use chat_relay::error::{RelayError, Result};
use chat_relay::logging::{
    cleanup_old_logs, init_logging, log_file_path, ApplicationMode, LoggingConfig,
};
use clap::Parser;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(e) = setup_logging(&cli) {
        exit_with_error(e);
    }

    if let Err(e) = run(&cli).await {
        exit_with_error(e);
    }
}

fn setup_logging(cli: &Cli) -> Result<()> {
    let mut log_config = LoggingConfig::from_args(cli.quiet, cli.verbose, cli.json);

    // Long-running servers can log to ~/.chat-relay/logs instead of stdout
    let file_logging =
        matches!(cli.command, Commands::Serve { .. }) && std::env::var("RELAY_LOG_FILE").is_ok();
    let mut log_dir = None;
    if file_logging {
        let path = log_file_path(ApplicationMode::Server)?;
        log_dir = path.parent().map(|dir| dir.to_path_buf());

        let level = log_config.level;
        log_config = LoggingConfig::for_mode(ApplicationMode::Server);
        log_config.level = level;
        log_config.json_format = cli.json;
        log_config.file_output = Some(path);
    }

    init_logging(log_config)?;

    if let Some(dir) = log_dir {
        let retention_days = std::env::var("RELAY_LOG_RETENTION_DAYS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(7);
        if let Err(e) = cleanup_old_logs(&dir, retention_days) {
            tracing::warn!("Log cleanup failed in {}: {}", dir.display(), e);
        }
    }

    Ok(())
}

async fn run(cli: &Cli) -> Result<()> {
    match cli.command.clone() {
        Commands::Serve {
            host,
            port,
            heartbeat_secs,
        } => handle_serve_command(host, port, heartbeat_secs).await?,

        Commands::Status { host, port } => handle_status_command(host, port).await?,
    }

    Ok(())
}

fn exit_with_error(e: RelayError) -> ! {
    let error_response = e.to_error_response();
    match serde_json::to_string_pretty(&error_response) {
        Ok(json) => eprintln!("{}", json),
        Err(_) => eprintln!("{}", e),
    }
    std::process::exit(1);
}
