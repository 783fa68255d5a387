use std::path::PathBuf;

use clap::{Parser, Subcommand};

use super::config::Config;
use crate::api::types::PacketDirection;
use crate::error_handling::types::ConfigError;

/// Command line of the `flagwatch` binary.
///
/// The configuration file is optional; `--base-url` (or `FLAGWATCH_BASE_URL`)
/// takes precedence over the `[api]` section.
#[derive(Parser, Debug, Clone, PartialEq)]
#[command(name = "flagwatch")]
#[command(version)]
#[command(about = "Follows captured traffic streams and edits services and rules")]
pub struct Cli {
    /// TOML configuration file
    #[arg(long, short = 'c', global = true)]
    pub config: Option<PathBuf>,

    /// Backend base URL, e.g. `http://localhost:2137`
    #[arg(long, env = "FLAGWATCH_BASE_URL", global = true)]
    pub base_url: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// Load the latest streams and keep polling for new ones
    Watch {
        /// Number of streams fetched by the initial load
        #[arg(long)]
        limit: Option<u32>,
        /// Serve the dashboard on this port
        #[arg(long)]
        serve: Option<u16>,
    },
    /// List services with their rules
    Services,
    /// List rules
    Rules,
    RuleCreate {
        #[arg(long)]
        name: String,
        #[arg(long, value_parser = parse_direction)]
        direction: PacketDirection,
        #[arg(long)]
        regexp: String,
        #[arg(long)]
        color: String,
    },
    RuleUpdate {
        id: i64,
        #[arg(long)]
        name: String,
        #[arg(long, value_parser = parse_direction)]
        direction: PacketDirection,
        #[arg(long)]
        regexp: String,
        #[arg(long)]
        color: String,
    },
    RuleDelete {
        id: i64,
    },
    /// Create a service, or update it when `--id` names an existing one
    ServiceUpsert {
        #[arg(long)]
        id: Option<i64>,
        #[arg(long)]
        name: String,
        #[arg(long)]
        port: u16,
        /// Rule to attach; repeatable
        #[arg(long = "attach")]
        attach: Vec<i64>,
        /// Rule to detach; repeatable
        #[arg(long = "detach")]
        detach: Vec<i64>,
    },
    ServiceDelete {
        id: i64,
    },
}

fn parse_direction(s: &str) -> Result<PacketDirection, String> {
    PacketDirection::parse(&s.to_ascii_uppercase())
        .ok_or_else(|| format!("`{}` is not a packet direction (IN or OUT)", s))
}

impl Cli {
    /// Loads the configuration file, if any, then applies the command line
    /// overrides and validates the result.
    pub fn load_config(&self) -> Result<Config, ConfigError> {
        let mut config = match &self.config {
            Some(path) => Config::from_file(path)?,
            None => Config::default(),
        };
        self.apply_overrides(&mut config);
        config.validate()?;
        Ok(config)
    }

    pub fn apply_overrides(&self, config: &mut Config) {
        if let Some(base_url) = &self.base_url {
            config.api.base_url = base_url.clone();
        }
        if let Command::Watch { limit, serve } = &self.command {
            if let Some(limit) = limit {
                config.feed.initial_limit = *limit;
            }
            if let Some(port) = serve {
                config.web.enabled = true;
                config.web.port = *port;
            }
        }
    }
}
