//! UrbanReporter application binary - composition root.
//!
//! 1. Parse the command line and load configuration from TOML
//! 2. Initialize tracing
//! 3. Dispatch: run the chat proxy, the terminal chat client, or one of the
//!    report/account maintenance commands against the local database

mod cli;
mod console;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};

use urban_api::{start_server, AppState};
use urban_chat::{ChatSession, HttpProxyClient};
use urban_core::config::UrbanConfig;
use urban_store::{
    Credentials, Database, Profile, Report, ReportQuery, ReportStatus, ReportStore,
    SessionService, SqliteSessionService,
};

use cli::{AccountAction, CliArgs, Command, ReportsAction};

/// Expand ~ to home directory in a path string.
fn resolve_data_dir(data_dir: &str) -> PathBuf {
    if data_dir.starts_with("~/") || data_dir.starts_with("~\\") {
        #[cfg(target_os = "windows")]
        let home = std::env::var("USERPROFILE").unwrap_or_else(|_| ".".to_string());
        #[cfg(not(target_os = "windows"))]
        let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
        PathBuf::from(home).join(&data_dir[2..])
    } else {
        PathBuf::from(data_dir)
    }
}

fn open_database(config: &UrbanConfig) -> Result<Arc<Database>, Box<dyn std::error::Error>> {
    let db_path = resolve_data_dir(&config.general.data_dir).join("urban.db");
    let db = Database::new(&db_path)?;
    tracing::info!(path = %db_path.display(), "SQLite database opened");
    Ok(Arc::new(db))
}

async fn read_password() -> Result<String, Box<dyn std::error::Error>> {
    eprint!("password: ");
    let mut line = String::new();
    BufReader::new(tokio::io::stdin()).read_line(&mut line).await?;
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}

fn print_reports(reports: &[Report]) {
    if reports.is_empty() {
        println!("(no reports)");
        return;
    }
    for r in reports {
        println!(
            "{}  {}  {:<11}  {:<14}  {}  - {}",
            r.created_at.format("%Y-%m-%d %H:%M"),
            r.id,
            r.status.label(),
            r.issue_type,
            r.location,
            r.description
        );
    }
}

async fn run_reports(
    action: ReportsAction,
    store: ReportStore,
) -> Result<(), Box<dyn std::error::Error>> {
    match action {
        ReportsAction::List {
            issue_type,
            status,
            limit,
            watch,
        } => {
            let mut query = ReportQuery::all().limit(limit);
            if let Some(issue_type) = issue_type {
                query = query.issue_type(issue_type);
            }
            if let Some(status) = status {
                query = query.status(status.parse::<ReportStatus>()?);
            }

            if !watch {
                print_reports(&store.query(&query)?);
                return Ok(());
            }

            let mut subscription = store.subscribe(query);
            loop {
                tokio::select! {
                    snapshot = subscription.next() => match snapshot {
                        Some(reports) => {
                            println!("--- {} report(s)", reports.as_ref().map_or(0, Vec::len));
                            print_reports(&reports?);
                        }
                        None => break,
                    },
                    _ = tokio::signal::ctrl_c() => break,
                }
            }
            subscription.unsubscribe();
        }
        ReportsAction::Update { id, status } => {
            let report = store.update_status(id, status.parse::<ReportStatus>()?)?;
            println!("{} is now {}", report.id, report.status.label());
        }
    }
    Ok(())
}

async fn run_account(
    action: AccountAction,
    accounts: &dyn SessionService,
) -> Result<(), Box<dyn std::error::Error>> {
    match action {
        AccountAction::Register { name, email } => {
            let password = read_password().await?;
            let user = accounts.register(&Profile {
                name,
                email,
                password,
            })?;
            println!("Registered and signed in as {} <{}>", user.name, user.email);
        }
        AccountAction::Login { email } => {
            let password = read_password().await?;
            let user = accounts.login(&Credentials { email, password })?;
            println!("Signed in as {} <{}>", user.name, user.email);
        }
        AccountAction::Logout => {
            accounts.logout()?;
            println!("Signed out");
        }
        AccountAction::Whoami => match accounts.current_user()? {
            Some(user) => println!("{} <{}>", user.name, user.email),
            None => println!("Not signed in"),
        },
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = CliArgs::parse();

    // Config.
    let config_file = args.resolve_config_path();
    let mut config = UrbanConfig::load_or_default(&config_file);
    args.apply_overrides(&mut config);

    // Tracing. RUST_LOG wins over the configured level.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.general.log_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    tracing::info!("Starting UrbanReporter v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!(path = %config_file.display(), "Configuration resolved");

    match args.command {
        Command::Serve { .. } => {
            if std::env::var(&config.upstream.api_key_env).is_err() {
                tracing::warn!(
                    var = %config.upstream.api_key_env,
                    "Completion API key not set; chat requests will fail until it is"
                );
            }
            let port = config.server.port;
            let state = AppState::new(config)?;
            if let Err(e) = start_server(state).await {
                tracing::error!(error = %e, "Chat proxy stopped");
                tracing::error!("Try: URBAN_PORT={} urban-reporter serve", port.wrapping_add(1));
                return Err(e.into());
            }
        }
        Command::Chat { .. } => {
            let db = open_database(&config)?;
            let transport = HttpProxyClient::new(
                config.chat.proxy_url.clone(),
                Duration::from_secs(config.chat.request_timeout_secs),
            )?;
            tracing::info!(url = %transport.url(), "Chatting through proxy");

            let session = ChatSession::new(&config.chat, Arc::new(transport), console::navigator());
            let accounts: Arc<dyn SessionService> =
                Arc::new(SqliteSessionService::new(Arc::clone(&db)));
            console::run(session, ReportStore::new(db), accounts).await?;
        }
        Command::Reports { action } => {
            let db = open_database(&config)?;
            run_reports(action, ReportStore::new(db)).await?;
        }
        Command::Account { action } => {
            let db = open_database(&config)?;
            run_account(action, &SqliteSessionService::new(db)).await?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_data_dir_plain_path() {
        assert_eq!(resolve_data_dir("/srv/urban"), PathBuf::from("/srv/urban"));
    }

    #[cfg(not(target_os = "windows"))]
    #[test]
    fn test_resolve_data_dir_expands_home() {
        let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
        assert_eq!(
            resolve_data_dir("~/.urban/data"),
            PathBuf::from(home).join(".urban/data")
        );
    }

    #[tokio::test]
    async fn test_reports_update_via_store() {
        let db = Arc::new(Database::in_memory().unwrap());
        let store = ReportStore::new(db);
        let report = store
            .create(urban_core::ReportDraft {
                reporter: "Asha".to_string(),
                issue_type: "Pothole".to_string(),
                location: "Main St".to_string(),
                description: "Deep".to_string(),
                photo_url: None,
            })
            .unwrap();

        run_reports(
            ReportsAction::Update {
                id: report.id,
                status: "resolved".to_string(),
            },
            store.clone(),
        )
        .await
        .unwrap();

        let updated = store.get(report.id).unwrap().unwrap();
        assert_eq!(updated.status, ReportStatus::Resolved);
    }

    #[tokio::test]
    async fn test_reports_list_rejects_bad_status() {
        let store = ReportStore::new(Arc::new(Database::in_memory().unwrap()));
        let result = run_reports(
            ReportsAction::List {
                issue_type: None,
                status: Some("closed".to_string()),
                limit: 10,
                watch: false,
            },
            store,
        )
        .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_account_logout_and_whoami() {
        let accounts = SqliteSessionService::new(Arc::new(Database::in_memory().unwrap()));
        run_account(AccountAction::Whoami, &accounts).await.unwrap();
        run_account(AccountAction::Logout, &accounts).await.unwrap();
        assert!(accounts.current_user().unwrap().is_none());
    }
}
