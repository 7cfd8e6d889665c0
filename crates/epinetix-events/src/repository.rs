//! Read-only access to the externally-written action/belief event tables.
//!
//! One [`EventRepository`] is bound to a single tenant's connection
//! (obtained from `epinetix_tenant::ConnectionPool::get_or_open`). It never
//! writes; the content server owns those tables.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use epinetix_tenant::BackendConnection;

use crate::error::EventRepositoryError;
use crate::timestamp::parse_tolerant;
use crate::types::{ActionEvent, BeliefEvent};

pub struct EventRepository {
    conn: BackendConnection,
}

impl EventRepository {
    #[must_use]
    pub fn new(conn: BackendConnection) -> Self {
        Self { conn }
    }

    /// Action events in `[start, end)` whose verb is in `verb_filter`
    /// (no filtering if empty).
    ///
    /// # Errors
    ///
    /// Returns [`EventRepositoryError`] if the underlying query fails.
    pub async fn find_action_events(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        verb_filter: &[String],
    ) -> Result<Vec<ActionEvent>, EventRepositoryError> {
        match &self.conn {
            BackendConnection::Sqlite(pool) => {
                find_action_events_sqlite(pool, start, end, verb_filter).await
            }
            BackendConnection::Turso(db) => {
                find_action_events_turso(db, start, end, verb_filter).await
            }
        }
    }

    /// Belief events in `[start, end)` whose verb is in `value_filter`
    /// (no filtering if empty).
    ///
    /// # Errors
    ///
    /// Returns [`EventRepositoryError`] if the underlying query fails.
    pub async fn find_belief_events(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        value_filter: &[String],
    ) -> Result<Vec<BeliefEvent>, EventRepositoryError> {
        match &self.conn {
            BackendConnection::Sqlite(pool) => {
                find_belief_events_sqlite(pool, start, end, value_filter).await
            }
            BackendConnection::Turso(db) => {
                find_belief_events_turso(db, start, end, value_filter).await
            }
        }
    }

    /// Total action + belief events in `[start, end)`, used by
    /// `epinetix-warming` to decide batch sizing.
    ///
    /// # Errors
    ///
    /// Returns [`EventRepositoryError`] if the underlying query fails.
    pub async fn count_events(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<i64, EventRepositoryError> {
        match &self.conn {
            BackendConnection::Sqlite(pool) => count_events_sqlite(pool, start, end).await,
            BackendConnection::Turso(db) => count_events_turso(db, start, end).await,
        }
    }

    /// All currently held beliefs for one fingerprint, grouped by slug.
    ///
    /// # Errors
    ///
    /// Returns [`EventRepositoryError`] if the underlying query fails.
    pub async fn load_fingerprint_beliefs(
        &self,
        fingerprint_id: &str,
    ) -> Result<Vec<(String, Vec<String>)>, EventRepositoryError> {
        match &self.conn {
            BackendConnection::Sqlite(pool) => {
                load_fingerprint_beliefs_sqlite(pool, fingerprint_id).await
            }
            BackendConnection::Turso(db) => load_fingerprint_beliefs_turso(db, fingerprint_id).await,
        }
    }

    /// Ids of every fingerprint linked to a lead (`fingerprints.lead_id IS NOT NULL`),
    /// used to classify a visitor as known vs. anonymous.
    ///
    /// # Errors
    ///
    /// Returns [`EventRepositoryError`] if the underlying query fails.
    pub async fn known_fingerprint_ids(&self) -> Result<BTreeSet<String>, EventRepositoryError> {
        match &self.conn {
            BackendConnection::Sqlite(pool) => known_fingerprint_ids_sqlite(pool).await,
            BackendConnection::Turso(db) => known_fingerprint_ids_turso(db).await,
        }
    }

    /// Total row count of the `leads` table.
    ///
    /// # Errors
    ///
    /// Returns [`EventRepositoryError`] if the underlying query fails.
    pub async fn count_leads(&self) -> Result<i64, EventRepositoryError> {
        match &self.conn {
            BackendConnection::Sqlite(pool) => count_leads_sqlite(pool).await,
            BackendConnection::Turso(db) => count_leads_turso(db).await,
        }
    }
}

fn group_values(rows: Vec<(String, Option<String>)>) -> Vec<(String, Vec<String>)> {
    let mut grouped: Vec<(String, Vec<String>)> = Vec::new();
    for (slug, value) in rows {
        let Some(value) = value else { continue };
        match grouped.iter_mut().find(|(s, _)| s == &slug) {
            Some((_, values)) => {
                if !values.contains(&value) {
                    values.push(value);
                }
            }
            None => grouped.push((slug, vec![value])),
        }
    }
    grouped
}

// -- sqlite backend ----------------------------------------------------------

async fn find_action_events_sqlite(
    pool: &sqlx::SqlitePool,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    verb_filter: &[String],
) -> Result<Vec<ActionEvent>, EventRepositoryError> {
    let mut builder = sqlx::QueryBuilder::new(
        "SELECT object_id, object_type, verb, fingerprint_id, created_at FROM actions WHERE created_at >= "
    );
    builder.push_bind(start.to_rfc3339());
    builder.push(" AND created_at < ");
    builder.push_bind(end.to_rfc3339());
    if !verb_filter.is_empty() {
        builder.push(" AND verb IN (");
        let mut separated = builder.separated(", ");
        for verb in verb_filter {
            separated.push_bind(verb);
        }
        separated.push_unseparated(")");
    }

    let rows: Vec<(String, String, String, String, String)> =
        builder.build_query_as().fetch_all(pool).await?;

    Ok(rows
        .into_iter()
        .filter_map(|(object_id, object_type, verb, fingerprint_id, created_at)| {
            let created_at = parse_tolerant(&created_at).or_else(|| {
                tracing::warn!(object_id = %object_id, created_at, "dropping action event with unparseable timestamp");
                None
            })?;
            Some(ActionEvent {
                object_id,
                object_type,
                verb,
                fingerprint_id,
                created_at,
            })
        })
        .collect())
}

async fn find_belief_events_sqlite(
    pool: &sqlx::SqlitePool,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    value_filter: &[String],
) -> Result<Vec<BeliefEvent>, EventRepositoryError> {
    let mut builder = sqlx::QueryBuilder::new(
        "SELECT beliefs.slug, heldbeliefs.fingerprint_id, heldbeliefs.verb, heldbeliefs.object, heldbeliefs.updated_at \
         FROM heldbeliefs JOIN beliefs ON heldbeliefs.belief_id = beliefs.id \
         WHERE heldbeliefs.updated_at >= "
    );
    builder.push_bind(start.to_rfc3339());
    builder.push(" AND heldbeliefs.updated_at < ");
    builder.push_bind(end.to_rfc3339());
    if !value_filter.is_empty() {
        builder.push(" AND heldbeliefs.verb IN (");
        let mut separated = builder.separated(", ");
        for value in value_filter {
            separated.push_bind(value);
        }
        separated.push_unseparated(")");
    }

    let rows: Vec<(String, String, String, Option<String>, String)> =
        builder.build_query_as().fetch_all(pool).await?;

    Ok(rows
        .into_iter()
        .filter_map(|(slug, fingerprint_id, verb, object, updated_at)| {
            let updated_at = parse_tolerant(&updated_at).or_else(|| {
                tracing::warn!(slug = %slug, updated_at, "dropping belief event with unparseable timestamp");
                None
            })?;
            Some(BeliefEvent {
                slug,
                fingerprint_id,
                verb,
                object,
                updated_at,
            })
        })
        .collect())
}

async fn count_events_sqlite(
    pool: &sqlx::SqlitePool,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> Result<i64, EventRepositoryError> {
    let start = start.to_rfc3339();
    let end = end.to_rfc3339();

    let actions: (i64,) =
        sqlx::query_as("SELECT COUNT(*) FROM actions WHERE created_at >= ? AND created_at < ?")
            .bind(&start)
            .bind(&end)
            .fetch_one(pool)
            .await?;
    let beliefs: (i64,) = sqlx::query_as(
        "SELECT COUNT(*) FROM heldbeliefs WHERE updated_at >= ? AND updated_at < ?",
    )
    .bind(&start)
    .bind(&end)
    .fetch_one(pool)
    .await?;

    Ok(actions.0 + beliefs.0)
}

async fn load_fingerprint_beliefs_sqlite(
    pool: &sqlx::SqlitePool,
    fingerprint_id: &str,
) -> Result<Vec<(String, Vec<String>)>, EventRepositoryError> {
    let rows: Vec<(String, Option<String>)> = sqlx::query_as(
        "SELECT beliefs.slug, heldbeliefs.object FROM heldbeliefs \
         JOIN beliefs ON heldbeliefs.belief_id = beliefs.id \
         WHERE heldbeliefs.fingerprint_id = ?",
    )
    .bind(fingerprint_id)
    .fetch_all(pool)
    .await?;

    Ok(group_values(rows))
}

async fn known_fingerprint_ids_sqlite(
    pool: &sqlx::SqlitePool,
) -> Result<BTreeSet<String>, EventRepositoryError> {
    let rows: Vec<(String,)> =
        sqlx::query_as("SELECT id FROM fingerprints WHERE lead_id IS NOT NULL")
            .fetch_all(pool)
            .await?;
    Ok(rows.into_iter().map(|(id,)| id).collect())
}

async fn count_leads_sqlite(pool: &sqlx::SqlitePool) -> Result<i64, EventRepositoryError> {
    let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM leads")
        .fetch_one(pool)
        .await?;
    Ok(row.0)
}

// -- turso backend -------------------------------------------------------

async fn find_action_events_turso(
    db: &libsql::Database,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    verb_filter: &[String],
) -> Result<Vec<ActionEvent>, EventRepositoryError> {
    let conn = db.connect()?;
    let mut sql = "SELECT object_id, object_type, verb, fingerprint_id, created_at FROM actions \
                   WHERE created_at >= ? AND created_at < ?"
        .to_string();
    let mut params: Vec<libsql::Value> = vec![start.to_rfc3339().into(), end.to_rfc3339().into()];
    push_in_clause(&mut sql, &mut params, "verb", verb_filter);

    let mut rows = conn.query(&sql, params).await?;
    let mut events = Vec::new();
    while let Some(row) = rows.next().await? {
        let object_id: String = row.get(0)?;
        let object_type: String = row.get(1)?;
        let verb: String = row.get(2)?;
        let fingerprint_id: String = row.get(3)?;
        let created_at: String = row.get(4)?;
        let Some(created_at) = parse_tolerant(&created_at) else {
            tracing::warn!(object_id = %object_id, created_at, "dropping action event with unparseable timestamp");
            continue;
        };
        events.push(ActionEvent {
            object_id,
            object_type,
            verb,
            fingerprint_id,
            created_at,
        });
    }
    Ok(events)
}

async fn find_belief_events_turso(
    db: &libsql::Database,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    value_filter: &[String],
) -> Result<Vec<BeliefEvent>, EventRepositoryError> {
    let conn = db.connect()?;
    let mut sql = "SELECT beliefs.slug, heldbeliefs.fingerprint_id, heldbeliefs.verb, heldbeliefs.object, heldbeliefs.updated_at \
                   FROM heldbeliefs JOIN beliefs ON heldbeliefs.belief_id = beliefs.id \
                   WHERE heldbeliefs.updated_at >= ? AND heldbeliefs.updated_at < ?"
        .to_string();
    let mut params: Vec<libsql::Value> = vec![start.to_rfc3339().into(), end.to_rfc3339().into()];
    push_in_clause(&mut sql, &mut params, "heldbeliefs.verb", value_filter);

    let mut rows = conn.query(&sql, params).await?;
    let mut events = Vec::new();
    while let Some(row) = rows.next().await? {
        let slug: String = row.get(0)?;
        let fingerprint_id: String = row.get(1)?;
        let verb: String = row.get(2)?;
        let object: Option<String> = row.get(3)?;
        let updated_at: String = row.get(4)?;
        let Some(updated_at) = parse_tolerant(&updated_at) else {
            tracing::warn!(slug = %slug, updated_at, "dropping belief event with unparseable timestamp");
            continue;
        };
        events.push(BeliefEvent {
            slug,
            fingerprint_id,
            verb,
            object,
            updated_at,
        });
    }
    Ok(events)
}

async fn count_events_turso(
    db: &libsql::Database,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> Result<i64, EventRepositoryError> {
    let conn = db.connect()?;
    let start = start.to_rfc3339();
    let end = end.to_rfc3339();

    let mut actions_rows = conn
        .query(
            "SELECT COUNT(*) FROM actions WHERE created_at >= ? AND created_at < ?",
            (start.clone(), end.clone()),
        )
        .await?;
    let actions_count: i64 = match actions_rows.next().await? {
        Some(row) => row.get(0)?,
        None => 0,
    };

    let mut beliefs_rows = conn
        .query(
            "SELECT COUNT(*) FROM heldbeliefs WHERE updated_at >= ? AND updated_at < ?",
            (start, end),
        )
        .await?;
    let beliefs_count: i64 = match beliefs_rows.next().await? {
        Some(row) => row.get(0)?,
        None => 0,
    };

    Ok(actions_count + beliefs_count)
}

async fn load_fingerprint_beliefs_turso(
    db: &libsql::Database,
    fingerprint_id: &str,
) -> Result<Vec<(String, Vec<String>)>, EventRepositoryError> {
    let conn = db.connect()?;
    let mut rows = conn
        .query(
            "SELECT beliefs.slug, heldbeliefs.object FROM heldbeliefs \
             JOIN beliefs ON heldbeliefs.belief_id = beliefs.id \
             WHERE heldbeliefs.fingerprint_id = ?",
            (fingerprint_id.to_string(),),
        )
        .await?;

    let mut out = Vec::new();
    while let Some(row) = rows.next().await? {
        let slug: String = row.get(0)?;
        let object: Option<String> = row.get(1)?;
        out.push((slug, object));
    }
    Ok(group_values(out))
}

async fn known_fingerprint_ids_turso(
    db: &libsql::Database,
) -> Result<BTreeSet<String>, EventRepositoryError> {
    let conn = db.connect()?;
    let mut rows = conn
        .query("SELECT id FROM fingerprints WHERE lead_id IS NOT NULL", ())
        .await?;
    let mut ids = BTreeSet::new();
    while let Some(row) = rows.next().await? {
        ids.insert(row.get::<String>(0)?);
    }
    Ok(ids)
}

async fn count_leads_turso(db: &libsql::Database) -> Result<i64, EventRepositoryError> {
    let conn = db.connect()?;
    let mut rows = conn.query("SELECT COUNT(*) FROM leads", ()).await?;
    match rows.next().await? {
        Some(row) => Ok(row.get(0)?),
        None => Ok(0),
    }
}

fn push_in_clause(sql: &mut String, params: &mut Vec<libsql::Value>, column: &str, values: &[String]) {
    if values.is_empty() {
        return;
    }
    sql.push_str(&format!(" AND {column} IN ("));
    for (i, value) in values.iter().enumerate() {
        if i > 0 {
            sql.push_str(", ");
        }
        sql.push('?');
        params.push(value.clone().into());
    }
    sql.push(')');
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::sqlite::SqlitePoolOptions;

    async fn seeded_pool() -> sqlx::SqlitePool {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();

        sqlx::query(
            "CREATE TABLE actions (object_id TEXT, object_type TEXT, verb TEXT, fingerprint_id TEXT, created_at TEXT)",
        )
        .execute(&pool)
        .await
        .unwrap();
        sqlx::query("CREATE TABLE beliefs (id TEXT PRIMARY KEY, slug TEXT)")
            .execute(&pool)
            .await
            .unwrap();
        sqlx::query(
            "CREATE TABLE heldbeliefs (belief_id TEXT, fingerprint_id TEXT, verb TEXT, object TEXT, updated_at TEXT)",
        )
        .execute(&pool)
        .await
        .unwrap();

        sqlx::query("INSERT INTO actions VALUES ('pane1', 'Pane', 'PAGEVIEWED', 'fp1', '2026-07-31T09:15:00Z')")
            .execute(&pool)
            .await
            .unwrap();
        sqlx::query("INSERT INTO actions VALUES ('pane2', 'Pane', 'CLICKED', 'fp1', 'garbage-timestamp')")
            .execute(&pool)
            .await
            .unwrap();
        sqlx::query("INSERT INTO beliefs VALUES ('b1', 'GNOSIS')")
            .execute(&pool)
            .await
            .unwrap();
        sqlx::query(
            "INSERT INTO heldbeliefs VALUES ('b1', 'fp1', 'BELIEVES', 'YES', '2026-07-31T09:20:00Z')",
        )
        .execute(&pool)
        .await
        .unwrap();

        sqlx::query("CREATE TABLE fingerprints (id TEXT PRIMARY KEY, lead_id TEXT)")
            .execute(&pool)
            .await
            .unwrap();
        sqlx::query("INSERT INTO fingerprints VALUES ('fp1', 'lead1')")
            .execute(&pool)
            .await
            .unwrap();
        sqlx::query("INSERT INTO fingerprints VALUES ('fp2', NULL)")
            .execute(&pool)
            .await
            .unwrap();
        sqlx::query("CREATE TABLE leads (id TEXT PRIMARY KEY)")
            .execute(&pool)
            .await
            .unwrap();
        sqlx::query("INSERT INTO leads VALUES ('lead1')")
            .execute(&pool)
            .await
            .unwrap();

        pool
    }

    fn hour_bounds() -> (DateTime<Utc>, DateTime<Utc>) {
        let start = DateTime::parse_from_rfc3339("2026-07-31T09:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        let end = DateTime::parse_from_rfc3339("2026-07-31T10:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        (start, end)
    }

    #[tokio::test]
    async fn find_action_events_drops_unparseable_timestamps() {
        let pool = seeded_pool().await;
        let repo = EventRepository::new(BackendConnection::Sqlite(pool));
        let (start, end) = hour_bounds();

        let events = repo.find_action_events(start, end, &[]).await.unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].object_id, "pane1");
    }

    #[tokio::test]
    async fn find_action_events_filters_by_verb() {
        let pool = seeded_pool().await;
        let repo = EventRepository::new(BackendConnection::Sqlite(pool));
        let (start, end) = hour_bounds();

        let events = repo
            .find_action_events(start, end, &["CLICKED".to_string()])
            .await
            .unwrap();
        assert!(events.is_empty(), "garbage-timestamp row still dropped");
    }

    #[tokio::test]
    async fn find_belief_events_joins_slug() {
        let pool = seeded_pool().await;
        let repo = EventRepository::new(BackendConnection::Sqlite(pool));
        let (start, end) = hour_bounds();

        let events = repo.find_belief_events(start, end, &[]).await.unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].slug, "GNOSIS");
        assert_eq!(events[0].object.as_deref(), Some("YES"));
    }

    #[tokio::test]
    async fn count_events_sums_both_tables() {
        let pool = seeded_pool().await;
        let repo = EventRepository::new(BackendConnection::Sqlite(pool));
        let (start, end) = hour_bounds();

        let count = repo.count_events(start, end).await.unwrap();
        assert_eq!(count, 3, "two action rows (one malformed) plus one belief row");
    }

    #[tokio::test]
    async fn load_fingerprint_beliefs_groups_by_slug() {
        let pool = seeded_pool().await;
        let repo = EventRepository::new(BackendConnection::Sqlite(pool));

        let beliefs = repo.load_fingerprint_beliefs("fp1").await.unwrap();
        assert_eq!(beliefs, vec![("GNOSIS".to_string(), vec!["YES".to_string()])]);
    }

    #[tokio::test]
    async fn known_fingerprint_ids_excludes_unlinked_rows() {
        let pool = seeded_pool().await;
        let repo = EventRepository::new(BackendConnection::Sqlite(pool));

        let known = repo.known_fingerprint_ids().await.unwrap();
        assert_eq!(known, BTreeSet::from(["fp1".to_string()]));
    }

    #[tokio::test]
    async fn count_leads_counts_all_rows() {
        let pool = seeded_pool().await;
        let repo = EventRepository::new(BackendConnection::Sqlite(pool));

        assert_eq!(repo.count_leads().await.unwrap(), 1);
    }
}
