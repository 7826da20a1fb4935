//! UrbanReporter storage crate - SQLite persistence for reports and accounts.
//!
//! Provides a WAL-mode SQLite database with migrations, a report store with
//! live query subscriptions, and the account/session service.

pub mod db;
pub mod error;
pub mod migrations;
pub mod reports;
pub mod session;

pub use db::Database;
pub use error::StoreError;
pub use reports::{Report, ReportQuery, ReportStatus, ReportStore, ReportSubscription};
pub use session::{Credentials, Profile, SessionService, SqliteSessionService, User};
