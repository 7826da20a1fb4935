//! CLI argument definitions for the UrbanReporter binary.
//!
//! Uses `clap` with derive macros.
//! Priority resolution: CLI args > env vars > config file > defaults.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use urban_core::UrbanConfig;

/// UrbanReporter - civic-issue chat proxy and conversational client.
#[derive(Parser, Debug)]
#[command(name = "urban-reporter", version, about)]
pub struct CliArgs {
    /// Path to the configuration file.
    #[arg(short = 'c', long = "config", global = true)]
    pub config: Option<PathBuf>,

    /// Data directory for the SQLite database.
    #[arg(short = 'd', long = "data-dir", global = true)]
    pub data_dir: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(short = 'l', long = "log-level", global = true)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the chat proxy server.
    Serve {
        /// Port to listen on.
        #[arg(short = 'p', long = "port")]
        port: Option<u16>,

        /// Address to bind.
        #[arg(long = "host")]
        host: Option<String>,
    },
    /// Chat with the assistant on stdin/stdout.
    Chat {
        /// Chat proxy endpoint.
        #[arg(long = "proxy-url")]
        proxy_url: Option<String>,
    },
    /// Inspect and update filed reports.
    Reports {
        #[command(subcommand)]
        action: ReportsAction,
    },
    /// Manage the local account session.
    Account {
        #[command(subcommand)]
        action: AccountAction,
    },
}

#[derive(Subcommand, Debug)]
pub enum ReportsAction {
    /// List reports, newest first.
    List {
        #[arg(long = "issue-type")]
        issue_type: Option<String>,

        /// pending, in_progress or resolved.
        #[arg(long = "status")]
        status: Option<String>,

        #[arg(long = "limit", default_value_t = 20)]
        limit: usize,

        /// Keep printing the list as reports change.
        #[arg(long = "watch")]
        watch: bool,
    },
    /// Change the status of a report.
    Update {
        id: uuid::Uuid,

        #[arg(long = "status")]
        status: String,
    },
}

#[derive(Subcommand, Debug)]
pub enum AccountAction {
    /// Create an account and sign in. The password is read from stdin.
    Register {
        #[arg(long = "name")]
        name: String,
        #[arg(long = "email")]
        email: String,
    },
    /// Sign in. The password is read from stdin.
    Login {
        #[arg(long = "email")]
        email: String,
    },
    Logout,
    /// Show the signed-in user.
    Whoami,
}

impl CliArgs {
    /// Resolve the configuration file path.
    ///
    /// Priority: --config flag > URBAN_CONFIG env var > ~/.urban/config.toml.
    pub fn resolve_config_path(&self) -> PathBuf {
        if let Some(ref p) = self.config {
            return p.clone();
        }
        if let Ok(p) = std::env::var("URBAN_CONFIG") {
            return PathBuf::from(p);
        }
        default_config_path()
    }

    /// Apply command-line and environment overrides to a loaded config.
    pub fn apply_overrides(&self, config: &mut UrbanConfig) {
        if let Some(ref level) = self.log_level {
            config.general.log_level = level.clone();
        }
        if let Some(ref dir) = self.data_dir {
            config.general.data_dir = dir.to_string_lossy().to_string();
        }
        match &self.command {
            Command::Serve { port, host } => {
                config.server.port = resolve_port(*port, config.server.port);
                if let Some(host) = host {
                    config.server.host = host.clone();
                }
            }
            Command::Chat {
                proxy_url: Some(url),
            } => {
                config.chat.proxy_url = url.clone();
            }
            _ => {}
        }
    }
}

/// Resolve the proxy port.
///
/// Priority: --port flag > URBAN_PORT env var > config file value.
fn resolve_port(flag: Option<u16>, config_port: u16) -> u16 {
    if let Some(p) = flag {
        return p;
    }
    if let Ok(val) = std::env::var("URBAN_PORT") {
        if let Ok(p) = val.parse::<u16>() {
            return p;
        }
    }
    config_port
}

/// Default config file path for the current platform.
fn default_config_path() -> PathBuf {
    #[cfg(target_os = "windows")]
    if let Ok(home) = std::env::var("USERPROFILE") {
        return PathBuf::from(home).join(".urban").join("config.toml");
    }
    #[cfg(not(target_os = "windows"))]
    if let Ok(home) = std::env::var("HOME") {
        return PathBuf::from(home).join(".urban").join("config.toml");
    }
    PathBuf::from("config.toml")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> CliArgs {
        CliArgs::try_parse_from(std::iter::once("urban-reporter").chain(args.iter().copied()))
            .unwrap()
    }

    #[test]
    fn test_serve_flags() {
        let args = parse(&["serve", "--port", "8080", "--host", "0.0.0.0"]);
        match args.command {
            Command::Serve { port, host } => {
                assert_eq!(port, Some(8080));
                assert_eq!(host.as_deref(), Some("0.0.0.0"));
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let args = parse(&["chat", "--log-level", "debug", "--config", "/tmp/u.toml"]);
        assert_eq!(args.log_level.as_deref(), Some("debug"));
        assert_eq!(args.resolve_config_path(), PathBuf::from("/tmp/u.toml"));
    }

    #[test]
    fn test_overrides_applied_to_config() {
        let args = parse(&[
            "--data-dir",
            "/var/lib/urban",
            "--log-level",
            "warn",
            "serve",
            "--port",
            "9000",
            "--host",
            "0.0.0.0",
        ]);
        let mut config = UrbanConfig::default();
        args.apply_overrides(&mut config);

        assert_eq!(config.general.data_dir, "/var/lib/urban");
        assert_eq!(config.general.log_level, "warn");
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.server.host, "0.0.0.0");
    }

    #[test]
    fn test_chat_proxy_url_override() {
        let args = parse(&["chat", "--proxy-url", "http://proxy.local/api/chat"]);
        let mut config = UrbanConfig::default();
        args.apply_overrides(&mut config);
        assert_eq!(config.chat.proxy_url, "http://proxy.local/api/chat");
    }

    #[test]
    fn test_chat_without_flags_keeps_config() {
        let args = parse(&["chat"]);
        let mut config = UrbanConfig::default();
        args.apply_overrides(&mut config);
        assert_eq!(config.chat.proxy_url, UrbanConfig::default().chat.proxy_url);
    }

    #[test]
    fn test_port_flag_wins() {
        assert_eq!(resolve_port(Some(7000), 5000), 7000);
    }

    #[test]
    fn test_reports_list_defaults() {
        let args = parse(&["reports", "list"]);
        match args.command {
            Command::Reports {
                action:
                    ReportsAction::List {
                        issue_type,
                        status,
                        limit,
                        watch,
                    },
            } => {
                assert!(issue_type.is_none());
                assert!(status.is_none());
                assert_eq!(limit, 20);
                assert!(!watch);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_reports_update_requires_uuid() {
        let bad = CliArgs::try_parse_from([
            "urban-reporter",
            "reports",
            "update",
            "not-a-uuid",
            "--status",
            "resolved",
        ]);
        assert!(bad.is_err());
    }

    #[test]
    fn test_account_login() {
        let args = parse(&["account", "login", "--email", "a@b.c"]);
        assert!(matches!(
            args.command,
            Command::Account {
                action: AccountAction::Login { .. }
            }
        ));
    }

    #[test]
    fn test_subcommand_required() {
        assert!(CliArgs::try_parse_from(["urban-reporter"]).is_err());
    }
}
