use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use hubchat::{HubchatError, HubchatServer, ServerConfig};
use tracing::{info, warn};

/// Multi-client text chat server.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Socket address to listen on. Overrides the config file.
    #[arg(long)]
    listen: Option<String>,

    /// JSON configuration file.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Stamp messages in UTC instead of local time.
    #[arg(long)]
    utc: bool,
}

impl Cli {
    /// Loads the config file (if any) and applies flag overrides.
    fn server_config(&self) -> Result<ServerConfig, HubchatError> {
        let mut config = match &self.config {
            Some(path) => ServerConfig::from_json_file(path)?,
            None => ServerConfig::default(),
        };
        if let Some(listen) = &self.listen {
            config.bind_addr = listen.clone();
        }
        if self.utc {
            config.utc_timestamps = true;
        }
        Ok(config)
    }
}

fn init_tracing() {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = fmt().with_env_filter(filter).with_target(false).try_init();
}

async fn run(cli: Cli) -> Result<(), HubchatError> {
    let config = cli.server_config()?;
    let server = HubchatServer::builder().config(config).build().await?;
    info!(addr = %server.local_addr()?, "hubchat listening");
    server.run_until_ctrl_c().await
}

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();

    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            warn!(error = %err, "server exited with error");
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_defaults_to_default_config() {
        let cli = Cli::parse_from(["hubchat-server"]);
        assert_eq!(cli.server_config().unwrap(), ServerConfig::default());
    }

    #[test]
    fn test_cli_flags_override_config() {
        let cli = Cli::parse_from(["hubchat-server", "--listen", "0.0.0.0:9000", "--utc"]);
        let config = cli.server_config().unwrap();
        assert_eq!(config.bind_addr, "0.0.0.0:9000");
        assert!(config.utc_timestamps);
    }

    #[test]
    fn test_cli_missing_config_file_fails() {
        let cli = Cli::parse_from(["hubchat-server", "--config", "/nonexistent/hubchat.json"]);
        assert!(matches!(cli.server_config(), Err(HubchatError::Config { .. })));
    }
}
