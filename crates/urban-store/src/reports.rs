//! Civic-issue report persistence with live query subscriptions.
//!
//! Every write bumps a `watch` channel version. A [`ReportSubscription`]
//! re-runs its query on each bump, so a subscriber always sees a complete
//! snapshot rather than individual change events. Dropping the
//! subscription releases it.

use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};
use rusqlite::OptionalExtension;
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tokio_stream::wrappers::WatchStream;
use tokio_stream::{Stream, StreamExt};
use uuid::Uuid;

use urban_core::{ReportDraft, DEFAULT_ISSUE_TYPE};

use crate::db::Database;
use crate::error::StoreError;

/// Lifecycle status of a report.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportStatus {
    #[default]
    Pending,
    InProgress,
    Resolved,
}

impl ReportStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReportStatus::Pending => "pending",
            ReportStatus::InProgress => "in_progress",
            ReportStatus::Resolved => "resolved",
        }
    }

    /// Human-readable label.
    pub fn label(&self) -> &'static str {
        match self {
            ReportStatus::Pending => "Pending",
            ReportStatus::InProgress => "In Progress",
            ReportStatus::Resolved => "Resolved",
        }
    }
}

impl std::str::FromStr for ReportStatus {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(ReportStatus::Pending),
            "in_progress" => Ok(ReportStatus::InProgress),
            "resolved" => Ok(ReportStatus::Resolved),
            other => Err(StoreError::Corrupt(format!("unknown report status '{}'", other))),
        }
    }
}

/// A filed report.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Report {
    pub id: Uuid,
    pub reporter: String,
    pub issue_type: String,
    pub location: String,
    pub description: String,
    pub photo_url: Option<String>,
    pub status: ReportStatus,
    pub created_at: DateTime<Utc>,
}

/// Filter for listing and subscribing. Results are always newest first.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ReportQuery {
    pub issue_type: Option<String>,
    pub status: Option<ReportStatus>,
    pub reporter: Option<String>,
    pub limit: Option<usize>,
}

impl ReportQuery {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn issue_type(mut self, issue_type: impl Into<String>) -> Self {
        self.issue_type = Some(issue_type.into());
        self
    }

    pub fn status(mut self, status: ReportStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn reporter(mut self, reporter: impl Into<String>) -> Self {
        self.reporter = Some(reporter.into());
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }
}

/// SQLite-backed report store.
///
/// Cloning is cheap and clones share the database and the change feed.
#[derive(Clone)]
pub struct ReportStore {
    db: Arc<Database>,
    changes: Arc<watch::Sender<u64>>,
}

impl ReportStore {
    pub fn new(db: Arc<Database>) -> Self {
        let (changes, _) = watch::channel(0);
        Self {
            db,
            changes: Arc::new(changes),
        }
    }

    /// Validate and file a draft. New reports start as `Pending`.
    pub fn create(&self, draft: ReportDraft) -> Result<Report, StoreError> {
        let report = Report {
            id: Uuid::new_v4(),
            reporter: required("reporter", &draft.reporter)?,
            issue_type: match draft.issue_type.trim() {
                "" => DEFAULT_ISSUE_TYPE.to_string(),
                t => t.to_string(),
            },
            location: required("location", &draft.location)?,
            description: required("description", &draft.description)?,
            photo_url: draft
                .photo_url
                .map(|u| u.trim().to_string())
                .filter(|u| !u.is_empty()),
            status: ReportStatus::Pending,
            created_at: now_millis(),
        };

        self.db.with_conn(|conn| {
            conn.execute(
                "INSERT INTO reports (id, reporter, issue_type, location, description, photo_url, status, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                rusqlite::params![
                    report.id.to_string(),
                    report.reporter,
                    report.issue_type,
                    report.location,
                    report.description,
                    report.photo_url,
                    report.status.as_str(),
                    report.created_at.timestamp_millis(),
                ],
            )?;
            Ok(())
        })?;

        tracing::info!(id = %report.id, issue_type = %report.issue_type, "Report filed");
        self.notify();
        Ok(report)
    }

    pub fn get(&self, id: Uuid) -> Result<Option<Report>, StoreError> {
        self.db.with_conn(|conn| {
            let row = conn
                .query_row(
                    "SELECT id, reporter, issue_type, location, description, photo_url, status, created_at
                     FROM reports WHERE id = ?1",
                    rusqlite::params![id.to_string()],
                    read_row,
                )
                .optional()?;
            row.map(RawReport::into_report).transpose()
        })
    }

    pub fn update_status(&self, id: Uuid, status: ReportStatus) -> Result<Report, StoreError> {
        let changed = self.db.with_conn(|conn| {
            Ok(conn.execute(
                "UPDATE reports SET status = ?1 WHERE id = ?2",
                rusqlite::params![status.as_str(), id.to_string()],
            )?)
        })?;
        if changed == 0 {
            return Err(StoreError::ReportNotFound(id));
        }

        tracing::info!(id = %id, status = status.as_str(), "Report status updated");
        self.notify();
        self.get(id)?.ok_or(StoreError::ReportNotFound(id))
    }

    /// Reports matching `query`, newest first.
    pub fn query(&self, query: &ReportQuery) -> Result<Vec<Report>, StoreError> {
        // SQLite treats a negative LIMIT as unbounded.
        let limit = query.limit.map(|l| l as i64).unwrap_or(-1);
        self.db.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, reporter, issue_type, location, description, photo_url, status, created_at
                 FROM reports
                 WHERE (?1 IS NULL OR issue_type = ?1)
                   AND (?2 IS NULL OR status = ?2)
                   AND (?3 IS NULL OR reporter = ?3)
                 ORDER BY created_at DESC, rowid DESC
                 LIMIT ?4",
            )?;
            let rows = stmt.query_map(
                rusqlite::params![
                    query.issue_type,
                    query.status.map(|s| s.as_str()),
                    query.reporter,
                    limit,
                ],
                read_row,
            )?;

            let mut reports = Vec::new();
            for row in rows {
                reports.push(row?.into_report()?);
            }
            Ok(reports)
        })
    }

    /// Start a live query. The first snapshot is available immediately.
    pub fn subscribe(&self, query: ReportQuery) -> ReportSubscription {
        ReportSubscription {
            store: self.clone(),
            query,
            changes: WatchStream::new(self.changes.subscribe()),
        }
    }

    /// Number of live subscriptions.
    pub fn subscriber_count(&self) -> usize {
        self.changes.receiver_count()
    }

    fn notify(&self) {
        self.changes.send_modify(|version| *version += 1);
    }
}

/// A live report query. Drop it (or call [`unsubscribe`](Self::unsubscribe))
/// to release it.
pub struct ReportSubscription {
    store: ReportStore,
    query: ReportQuery,
    changes: WatchStream<u64>,
}

impl ReportSubscription {
    /// Wait for the next snapshot.
    ///
    /// Writes that land while no one is waiting coalesce into one snapshot.
    pub async fn next(&mut self) -> Option<Result<Vec<Report>, StoreError>> {
        self.changes.next().await?;
        Some(self.store.query(&self.query))
    }

    pub fn query(&self) -> &ReportQuery {
        &self.query
    }

    pub fn unsubscribe(self) {}

    pub fn into_stream(self) -> impl Stream<Item = Result<Vec<Report>, StoreError>> {
        let Self {
            store,
            query,
            changes,
        } = self;
        changes.map(move |_| store.query(&query))
    }
}

// =============================================================================
// Row mapping
// =============================================================================

struct RawReport {
    id: String,
    reporter: String,
    issue_type: String,
    location: String,
    description: String,
    photo_url: Option<String>,
    status: String,
    created_at: i64,
}

impl RawReport {
    fn into_report(self) -> Result<Report, StoreError> {
        Ok(Report {
            id: Uuid::parse_str(&self.id)
                .map_err(|e| StoreError::Corrupt(format!("report id '{}': {}", self.id, e)))?,
            reporter: self.reporter,
            issue_type: self.issue_type,
            location: self.location,
            description: self.description,
            photo_url: self.photo_url,
            status: self.status.parse()?,
            created_at: Utc
                .timestamp_millis_opt(self.created_at)
                .single()
                .ok_or_else(|| StoreError::Corrupt(format!("timestamp {}", self.created_at)))?,
        })
    }
}

fn read_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawReport> {
    Ok(RawReport {
        id: row.get(0)?,
        reporter: row.get(1)?,
        issue_type: row.get(2)?,
        location: row.get(3)?,
        description: row.get(4)?,
        photo_url: row.get(5)?,
        status: row.get(6)?,
        created_at: row.get(7)?,
    })
}

fn required(field: &'static str, value: &str) -> Result<String, StoreError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(StoreError::validation(field, "must not be empty"));
    }
    Ok(trimmed.to_string())
}

/// Current time truncated to the millisecond precision stored on disk.
fn now_millis() -> DateTime<Utc> {
    let now = Utc::now();
    Utc.timestamp_millis_opt(now.timestamp_millis())
        .single()
        .unwrap_or(now)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn make_store() -> ReportStore {
        ReportStore::new(Arc::new(Database::in_memory().unwrap()))
    }

    fn draft(issue_type: &str, location: &str) -> ReportDraft {
        ReportDraft {
            reporter: "Asha".to_string(),
            issue_type: issue_type.to_string(),
            location: location.to_string(),
            description: "Needs attention".to_string(),
            photo_url: None,
        }
    }

    // ---- Create / get ----

    #[test]
    fn test_create_and_get() {
        let store = make_store();
        let report = store.create(draft("Pothole", "MG Road")).unwrap();

        assert_eq!(report.status, ReportStatus::Pending);
        assert_eq!(report.issue_type, "Pothole");

        let fetched = store.get(report.id).unwrap().unwrap();
        assert_eq!(fetched, report);
    }

    #[test]
    fn test_create_trims_and_defaults_issue_type() {
        let store = make_store();
        let mut d = draft("   ", "  Sector 17  ");
        d.photo_url = Some("  ".to_string());
        let report = store.create(d).unwrap();

        assert_eq!(report.issue_type, DEFAULT_ISSUE_TYPE);
        assert_eq!(report.location, "Sector 17");
        assert!(report.photo_url.is_none());
    }

    #[test]
    fn test_create_rejects_blank_fields() {
        let store = make_store();

        let err = store.create(draft("Garbage", " ")).unwrap_err();
        assert!(matches!(err, StoreError::Validation { field: "location", .. }));

        let mut d = draft("Garbage", "Rose Garden");
        d.reporter = String::new();
        let err = store.create(d).unwrap_err();
        assert!(matches!(err, StoreError::Validation { field: "reporter", .. }));

        let mut d = draft("Garbage", "Rose Garden");
        d.description = "\n".to_string();
        let err = store.create(d).unwrap_err();
        assert!(matches!(err, StoreError::Validation { field: "description", .. }));

        assert!(store.query(&ReportQuery::all()).unwrap().is_empty());
    }

    #[test]
    fn test_get_missing_is_none() {
        let store = make_store();
        assert!(store.get(Uuid::new_v4()).unwrap().is_none());
    }

    // ---- Status ----

    #[test]
    fn test_update_status() {
        let store = make_store();
        let report = store.create(draft("Sewage", "Sector 22")).unwrap();
        let updated = store.update_status(report.id, ReportStatus::Resolved).unwrap();
        assert_eq!(updated.status, ReportStatus::Resolved);
        assert_eq!(updated.id, report.id);
    }

    #[test]
    fn test_update_status_unknown_id() {
        let store = make_store();
        let id = Uuid::new_v4();
        let err = store.update_status(id, ReportStatus::InProgress).unwrap_err();
        assert!(matches!(err, StoreError::ReportNotFound(x) if x == id));
    }

    #[test]
    fn test_status_labels_and_parse() {
        assert_eq!(ReportStatus::InProgress.label(), "In Progress");
        assert_eq!("resolved".parse::<ReportStatus>().unwrap(), ReportStatus::Resolved);
        assert!("closed".parse::<ReportStatus>().is_err());
    }

    // ---- Query ----

    #[test]
    fn test_query_newest_first_with_filters() {
        let store = make_store();
        let a = store.create(draft("Pothole", "A")).unwrap();
        let b = store.create(draft("Garbage", "B")).unwrap();
        let c = store.create(draft("Pothole", "C")).unwrap();
        store.update_status(a.id, ReportStatus::Resolved).unwrap();

        let all = store.query(&ReportQuery::all()).unwrap();
        let ids: Vec<Uuid> = all.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![c.id, b.id, a.id]);

        let potholes = store.query(&ReportQuery::all().issue_type("Pothole")).unwrap();
        assert_eq!(potholes.len(), 2);

        let open_potholes = store
            .query(
                &ReportQuery::all()
                    .issue_type("Pothole")
                    .status(ReportStatus::Pending),
            )
            .unwrap();
        assert_eq!(open_potholes.len(), 1);
        assert_eq!(open_potholes[0].id, c.id);

        let latest = store.query(&ReportQuery::all().limit(1)).unwrap();
        assert_eq!(latest.len(), 1);
        assert_eq!(latest[0].id, c.id);

        let none = store.query(&ReportQuery::all().reporter("Nobody")).unwrap();
        assert!(none.is_empty());
    }

    // ---- Subscriptions ----

    #[tokio::test]
    async fn test_subscription_yields_initial_snapshot() {
        let store = make_store();
        store.create(draft("Pothole", "A")).unwrap();

        let mut sub = store.subscribe(ReportQuery::all());
        let snapshot = sub.next().await.unwrap().unwrap();
        assert_eq!(snapshot.len(), 1);
    }

    #[tokio::test]
    async fn test_subscription_sees_writes() {
        let store = make_store();
        let mut sub = store.subscribe(ReportQuery::all().issue_type("Pothole"));
        assert!(sub.next().await.unwrap().unwrap().is_empty());

        let writer = store.clone();
        tokio::spawn(async move {
            writer.create(draft("Pothole", "MG Road")).unwrap();
        });

        let snapshot = tokio::time::timeout(Duration::from_secs(5), sub.next())
            .await
            .unwrap()
            .unwrap()
            .unwrap();
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].location, "MG Road");
    }

    #[tokio::test]
    async fn test_subscription_snapshot_applies_filter() {
        let store = make_store();
        let mut sub = store.subscribe(ReportQuery::all().issue_type("Streetlight"));
        sub.next().await.unwrap().unwrap();

        store.create(draft("Garbage", "B")).unwrap();
        let snapshot = sub.next().await.unwrap().unwrap();
        assert!(snapshot.is_empty());
    }

    #[tokio::test]
    async fn test_subscription_release_on_drop() {
        let store = make_store();
        assert_eq!(store.subscriber_count(), 0);

        let first = store.subscribe(ReportQuery::all());
        let second = store.subscribe(ReportQuery::all());
        assert_eq!(store.subscriber_count(), 2);

        drop(first);
        assert_eq!(store.subscriber_count(), 1);

        second.unsubscribe();
        assert_eq!(store.subscriber_count(), 0);

        // Writes with no subscribers still succeed.
        store.create(draft("Pothole", "A")).unwrap();
    }

    #[tokio::test]
    async fn test_subscription_as_stream() {
        let store = make_store();
        let mut stream = Box::pin(store.subscribe(ReportQuery::all()).into_stream());

        assert!(stream.next().await.unwrap().unwrap().is_empty());
        store.create(draft("Pothole", "A")).unwrap();
        assert_eq!(stream.next().await.unwrap().unwrap().len(), 1);
    }
}
