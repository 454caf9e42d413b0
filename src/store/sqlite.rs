use async_trait::async_trait;
use chrono::{SecondsFormat, Utc};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension};
use std::sync::{Arc, Mutex, MutexGuard};

use crate::core::{ProfileRecord, ProfileSnapshot, PublicProfile, SkillClaim, SkillRef};
use crate::error::{MatchEngineError, Result};
use crate::store::{
    Pagination, ProfileStore, SearchFilters, SearchPage, SkillEntry, StoreStats,
};

const SCHEMA: &str = "
    PRAGMA foreign_keys = ON;

    CREATE TABLE IF NOT EXISTS users (
        id TEXT PRIMARY KEY,
        name TEXT NOT NULL,
        location TEXT,
        is_public INTEGER NOT NULL DEFAULT 1,
        is_banned INTEGER NOT NULL DEFAULT 0,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL
    );

    CREATE TABLE IF NOT EXISTS skills (
        name TEXT PRIMARY KEY,
        category TEXT,
        is_approved INTEGER NOT NULL DEFAULT 0
    );

    CREATE TABLE IF NOT EXISTS user_skills (
        user_id TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
        skill_name TEXT NOT NULL REFERENCES skills(name) ON DELETE CASCADE,
        kind TEXT NOT NULL,
        level TEXT NOT NULL,
        position INTEGER NOT NULL,
        UNIQUE (user_id, skill_name, kind)
    );

    CREATE TABLE IF NOT EXISTS user_availability (
        user_id TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
        token TEXT NOT NULL,
        position INTEGER NOT NULL,
        UNIQUE (user_id, token)
    );

    CREATE TABLE IF NOT EXISTS swap_requests (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        sender_id TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
        receiver_id TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
        sender_skill TEXT NOT NULL,
        receiver_skill TEXT NOT NULL,
        message TEXT,
        status TEXT NOT NULL DEFAULT 'PENDING',
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL,
        completed_at TEXT
    );

    CREATE TABLE IF NOT EXISTS ratings (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        request_id INTEGER NOT NULL UNIQUE REFERENCES swap_requests(id) ON DELETE CASCADE,
        giver_id TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
        receiver_id TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
        rating INTEGER NOT NULL CHECK (rating BETWEEN 1 AND 5),
        feedback TEXT,
        created_at TEXT NOT NULL
    );

    CREATE TABLE IF NOT EXISTS admin_messages (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        title TEXT NOT NULL,
        content TEXT NOT NULL,
        is_active INTEGER NOT NULL DEFAULT 1,
        created_at TEXT NOT NULL
    );

    CREATE INDEX IF NOT EXISTS idx_users_created_at ON users(created_at);
    CREATE INDEX IF NOT EXISTS idx_user_skills_user ON user_skills(user_id);
    CREATE INDEX IF NOT EXISTS idx_swap_requests_sender ON swap_requests(sender_id);
    CREATE INDEX IF NOT EXISTS idx_swap_requests_receiver ON swap_requests(receiver_id);
    CREATE INDEX IF NOT EXISTS idx_ratings_receiver ON ratings(receiver_id);
";

/// Newest profiles first; rowid breaks ties between equal timestamps
const NEWEST_FIRST: &str = "ORDER BY u.created_at DESC, u.rowid DESC";

/// SQLite-backed store for profiles, swap requests, ratings and messages
///
/// One connection guarded by a mutex. Claims and availability keep a
/// `position` column so snapshots come back in the order the provider
/// listed them.
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    /// Open (or create) the store at `db_path`
    pub async fn new(db_path: &str) -> Result<Self> {
        let conn = Connection::open(db_path)?;
        conn.execute_batch(SCHEMA)?;

        tracing::debug!("Store opened at {}", db_path);

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub(super) fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| MatchEngineError::Store("connection lock poisoned".to_string()))
    }

    pub(super) fn now() -> String {
        Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
    }
}

/// Load one snapshot given its users row values
fn load_snapshot(conn: &Connection, id: &str, location: Option<String>) -> Result<ProfileSnapshot> {
    let mut stmt = conn.prepare_cached(
        "SELECT token FROM user_availability WHERE user_id = ? ORDER BY position",
    )?;
    let availability = stmt
        .query_map(params![id], |row| row.get::<_, String>(0))?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    let mut stmt = conn.prepare_cached(
        "SELECT us.skill_name, s.category, us.level, us.kind
         FROM user_skills us
         JOIN skills s ON s.name = us.skill_name
         WHERE us.user_id = ?
         ORDER BY us.position",
    )?;
    let rows = stmt
        .query_map(params![id], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, Option<String>>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
            ))
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    let mut claims = Vec::with_capacity(rows.len());
    for (name, category, level, kind) in rows {
        claims.push(SkillClaim {
            skill: SkillRef { name, category },
            level: level.parse()?,
            kind: kind.parse()?,
        });
    }

    Ok(ProfileSnapshot {
        id: id.to_string(),
        location,
        availability,
        claims,
    })
}

/// (ratings received, average rounded to one decimal)
fn rating_summary(conn: &Connection, id: &str) -> Result<(u32, f64)> {
    let (count, avg): (u32, Option<f64>) = conn.query_row(
        "SELECT COUNT(*), AVG(rating) FROM ratings WHERE receiver_id = ?",
        params![id],
        |row| Ok((row.get(0)?, row.get(1)?)),
    )?;
    let average = avg.map(|a| (a * 10.0).round() / 10.0).unwrap_or(0.0);
    Ok((count, average))
}

/// WHERE clause and its positional arguments for a directory search
///
/// Needles are lowercased here with full Unicode folding. SQLite's `lower()`
/// only folds ASCII, so a column holding non-ASCII capitals ("ZÜRICH") is
/// still compared with those capitals intact.
fn search_clause(filters: &SearchFilters) -> (String, Vec<Value>) {
    let mut clauses = vec!["u.is_public = 1".to_string(), "u.is_banned = 0".to_string()];
    let mut args = Vec::new();

    if let Some(query) = filters.query() {
        clauses.push(
            "(instr(lower(u.name), ?) > 0
              OR instr(lower(coalesce(u.location, '')), ?) > 0
              OR EXISTS (SELECT 1 FROM user_skills us
                         WHERE us.user_id = u.id AND instr(lower(us.skill_name), ?) > 0))"
                .to_string(),
        );
        let needle = query.to_lowercase();
        for _ in 0..3 {
            args.push(Value::Text(needle.clone()));
        }
    }

    if let Some(location) = filters.location() {
        clauses.push("instr(lower(coalesce(u.location, '')), ?) > 0".to_string());
        args.push(Value::Text(location.to_lowercase()));
    }

    if let Some(token) = filters.availability() {
        clauses.push(
            "EXISTS (SELECT 1 FROM user_availability ua WHERE ua.user_id = u.id AND ua.token = ?)"
                .to_string(),
        );
        args.push(Value::Text(token.to_string()));
    }

    let category = filters.skill_category();
    if category.is_some() || filters.skill_level.is_some() {
        let mut skill_conditions = vec!["us.user_id = u.id".to_string()];
        if let Some(category) = category {
            skill_conditions.push("lower(coalesce(s.category, '')) = ?".to_string());
            args.push(Value::Text(category.to_lowercase()));
        }
        if let Some(level) = filters.skill_level {
            skill_conditions.push("us.level = ?".to_string());
            args.push(Value::Text(level.as_str().to_string()));
        }
        clauses.push(format!(
            "EXISTS (SELECT 1 FROM user_skills us JOIN skills s ON s.name = us.skill_name WHERE {})",
            skill_conditions.join(" AND ")
        ));
    }

    (clauses.join(" AND "), args)
}

#[async_trait]
impl ProfileStore for SqliteStore {
    async fn upsert_profile(&self, record: &ProfileRecord) -> Result<()> {
        record.validate()?;

        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        let now = Self::now();
        let snapshot = &record.snapshot;

        // is_banned is owned by set_banned and never written here
        tx.execute(
            "INSERT INTO users (id, name, location, is_public, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?5)
             ON CONFLICT(id) DO UPDATE SET
                name = excluded.name,
                location = excluded.location,
                is_public = excluded.is_public,
                updated_at = excluded.updated_at",
            params![snapshot.id, record.name.trim(), snapshot.location, record.is_public, now],
        )?;

        tx.execute("DELETE FROM user_skills WHERE user_id = ?", params![snapshot.id])?;
        tx.execute("DELETE FROM user_availability WHERE user_id = ?", params![snapshot.id])?;

        for (position, claim) in snapshot.claims.iter().enumerate() {
            tx.execute(
                "INSERT INTO skills (name, category) VALUES (?1, ?2)
                 ON CONFLICT(name) DO UPDATE SET category = COALESCE(skills.category, excluded.category)",
                params![claim.skill.name, claim.skill.category],
            )?;
            tx.execute(
                "INSERT INTO user_skills (user_id, skill_name, kind, level, position)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    snapshot.id,
                    claim.skill.name,
                    claim.kind.as_str(),
                    claim.level.as_str(),
                    position as i64,
                ],
            )?;
        }

        for (position, token) in snapshot.availability.iter().enumerate() {
            tx.execute(
                "INSERT INTO user_availability (user_id, token, position) VALUES (?1, ?2, ?3)",
                params![snapshot.id, token, position as i64],
            )?;
        }

        tx.commit()?;

        tracing::debug!(
            "Stored profile {} ({} offered, {} wanted)",
            snapshot.id,
            snapshot.offered().count(),
            snapshot.wanted().count()
        );

        Ok(())
    }

    async fn get_snapshot(&self, id: &str) -> Result<Option<ProfileSnapshot>> {
        let conn = self.lock()?;

        let location: Option<Option<String>> = conn
            .query_row("SELECT location FROM users WHERE id = ?", params![id], |row| {
                row.get(0)
            })
            .optional()?;

        match location {
            Some(location) => Ok(Some(load_snapshot(&conn, id, location)?)),
            None => Ok(None),
        }
    }

    async fn candidates_for(&self, id: &str) -> Result<Vec<ProfileSnapshot>> {
        let conn = self.lock()?;

        let mut stmt = conn.prepare(&format!(
            "SELECT u.id, u.location FROM users u
             WHERE u.is_public = 1 AND u.is_banned = 0 AND u.id != ?
             {}",
            NEWEST_FIRST
        ))?;
        let rows = stmt
            .query_map(params![id], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, Option<String>>(1)?))
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        rows.into_iter()
            .map(|(candidate_id, location)| load_snapshot(&conn, &candidate_id, location))
            .collect()
    }

    async fn search(&self, filters: &SearchFilters) -> Result<SearchPage> {
        filters.validate()?;

        let conn = self.lock()?;
        let (where_clause, args) = search_clause(filters);

        let total_count: u64 = conn.query_row(
            &format!("SELECT COUNT(*) FROM users u WHERE {}", where_clause),
            params_from_iter(args.iter()),
            |row| row.get(0),
        )?;

        let mut page_args = args.clone();
        page_args.push(Value::Integer(i64::from(filters.limit)));
        page_args.push(Value::Integer(filters.offset() as i64));

        let mut stmt = conn.prepare(&format!(
            "SELECT u.id, u.name, u.location FROM users u WHERE {} {} LIMIT ? OFFSET ?",
            where_clause, NEWEST_FIRST
        ))?;
        let rows = stmt
            .query_map(params_from_iter(page_args.iter()), |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, Option<String>>(2)?,
                ))
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let mut profiles = Vec::with_capacity(rows.len());
        for (id, name, location) in rows {
            let snapshot = load_snapshot(&conn, &id, location)?;
            let (total_ratings, average_rating) = rating_summary(&conn, &id)?;
            profiles.push(PublicProfile {
                name,
                snapshot,
                average_rating,
                total_ratings,
            });
        }

        Ok(SearchPage {
            profiles,
            pagination: Pagination::new(filters.page, filters.limit, total_count),
            filters: filters.clone(),
        })
    }

    async fn set_banned(&self, id: &str, banned: bool) -> Result<bool> {
        let conn = self.lock()?;
        let updated = conn.execute(
            "UPDATE users SET is_banned = ?1, updated_at = ?2 WHERE id = ?3",
            params![banned, Self::now(), id],
        )?;
        Ok(updated > 0)
    }

    async fn delete_profile(&self, id: &str) -> Result<bool> {
        let conn = self.lock()?;
        let deleted = conn.execute("DELETE FROM users WHERE id = ?", params![id])?;
        Ok(deleted > 0)
    }

    async fn list_skills(&self, pending_only: bool) -> Result<Vec<SkillEntry>> {
        let conn = self.lock()?;

        let mut stmt = conn.prepare(&format!(
            "SELECT s.name, s.category, s.is_approved, COUNT(DISTINCT us.user_id)
             FROM skills s
             LEFT JOIN user_skills us ON us.skill_name = s.name
             {}
             GROUP BY s.name
             ORDER BY s.name",
            if pending_only { "WHERE s.is_approved = 0" } else { "" }
        ))?;
        let skills = stmt
            .query_map([], |row| {
                Ok(SkillEntry {
                    name: row.get(0)?,
                    category: row.get(1)?,
                    is_approved: row.get(2)?,
                    claimed_by: row.get(3)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(skills)
    }

    async fn set_skill_approval(&self, name: &str, approved: bool) -> Result<bool> {
        let conn = self.lock()?;
        let changed = if approved {
            conn.execute("UPDATE skills SET is_approved = 1 WHERE name = ?", params![name])?
        } else {
            // user_skills rows go with it (ON DELETE CASCADE)
            conn.execute("DELETE FROM skills WHERE name = ?", params![name])?
        };
        Ok(changed > 0)
    }

    async fn stats(&self) -> Result<StoreStats> {
        let conn = self.lock()?;

        let (total_profiles, public_profiles, banned_profiles): (u64, u64, u64) = conn.query_row(
            "SELECT COUNT(*),
                    COALESCE(SUM(is_public = 1 AND is_banned = 0), 0),
                    COALESCE(SUM(is_banned = 1), 0)
             FROM users",
            [],
            |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
        )?;

        let total_skills: u64 = conn.query_row(
            "SELECT COUNT(DISTINCT skill_name) FROM user_skills",
            [],
            |row| row.get(0),
        )?;
        let (total_requests, pending_requests): (u64, u64) = conn.query_row(
            "SELECT COUNT(*), COALESCE(SUM(status = 'PENDING'), 0) FROM swap_requests",
            [],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;
        let total_ratings: u64 =
            conn.query_row("SELECT COUNT(*) FROM ratings", [], |row| row.get(0))?;

        Ok(StoreStats {
            total_profiles,
            public_profiles,
            banned_profiles,
            total_skills,
            total_requests,
            pending_requests,
            total_ratings,
        })
    }
}
