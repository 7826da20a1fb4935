//! Line-oriented chat client for the terminal.

use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use urban_chat::{ChatSession, Navigator, SubmitOutcome};
use urban_core::ReportDraft;
use urban_store::{ReportStore, SessionService};

/// Prints navigation requests instead of switching views.
struct ConsoleNavigator;

impl Navigator for ConsoleNavigator {
    fn navigate(&self, route: &str) {
        println!("[navigate] {}", route);
    }
}

pub fn navigator() -> Arc<dyn Navigator> {
    Arc::new(ConsoleNavigator)
}

/// Fill a blank reporter with the signed-in user's name.
///
/// A failed session lookup is logged and leaves the draft as it was.
fn credit_reporter(mut draft: ReportDraft, accounts: &dyn SessionService) -> ReportDraft {
    if !draft.reporter.trim().is_empty() {
        return draft;
    }
    match accounts.current_user() {
        Ok(Some(user)) => draft.reporter = user.name,
        Ok(None) => {}
        Err(e) => tracing::warn!(error = %e, "Could not look up signed-in user for report"),
    }
    draft
}

/// Run the chat loop until EOF or `/quit`.
///
/// Final reports produced by the assistant are filed in `reports`, credited
/// to the signed-in user when the assistant left the name blank.
pub async fn run(
    mut session: ChatSession,
    reports: ReportStore,
    accounts: Arc<dyn SessionService>,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();

    for message in session.messages() {
        println!("assistant> {}", message.text);
    }

    loop {
        stdout.write_all(b"you> ").await?;
        stdout.flush().await?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        match line.trim() {
            "/quit" | "/exit" => break,
            "/reset" => {
                session.reset();
                println!("assistant> {}", session.messages()[0].text);
                continue;
            }
            _ => {}
        }

        let outcome = session.submit(&line).await;
        if outcome == SubmitOutcome::Ignored {
            continue;
        }
        if let Some(reply) = session.messages().last() {
            println!("assistant> {}", reply.text);
        }

        if let SubmitOutcome::Replied {
            report: Some(report),
        } = outcome
        {
            let draft = credit_reporter(report.into_draft(), accounts.as_ref());
            match reports.create(draft) {
                Ok(filed) => println!("[report filed] {} ({})", filed.id, filed.issue_type),
                Err(e) => {
                    tracing::warn!(error = %e, "Could not file report from chat");
                    println!("[report not filed] {}", e);
                }
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use urban_store::{Credentials, Database, Profile, SqliteSessionService, StoreError, User};

    /// Session service whose storage is unavailable.
    struct BrokenAccounts;

    impl SessionService for BrokenAccounts {
        fn current_user(&self) -> Result<Option<User>, StoreError> {
            Err(StoreError::LockPoisoned("connection lost".to_string()))
        }
        fn login(&self, _credentials: &Credentials) -> Result<User, StoreError> {
            Err(StoreError::InvalidCredentials)
        }
        fn logout(&self) -> Result<(), StoreError> {
            Ok(())
        }
        fn register(&self, _profile: &Profile) -> Result<User, StoreError> {
            Err(StoreError::EmailTaken)
        }
    }

    fn draft(reporter: &str) -> ReportDraft {
        ReportDraft {
            reporter: reporter.to_string(),
            issue_type: "Pothole".to_string(),
            location: "Main St".to_string(),
            description: "Deep hole".to_string(),
            photo_url: None,
        }
    }

    #[test]
    fn test_named_report_keeps_reporter() {
        let out = credit_reporter(draft("Asha"), &BrokenAccounts);
        assert_eq!(out.reporter, "Asha");
    }

    #[test]
    fn test_blank_reporter_credited_to_signed_in_user() {
        let accounts = SqliteSessionService::new(Arc::new(Database::in_memory().unwrap()));
        accounts
            .register(&Profile {
                name: "Ravi".to_string(),
                email: "ravi@example.com".to_string(),
                password: "s3cret-pass".to_string(),
            })
            .unwrap();

        let out = credit_reporter(draft(" "), &accounts);
        assert_eq!(out.reporter, "Ravi");
    }

    #[test]
    fn test_session_lookup_failure_keeps_draft() {
        let out = credit_reporter(draft(""), &BrokenAccounts);
        assert_eq!(out.reporter, "");
        assert_eq!(out.location, "Main St");
    }
}
