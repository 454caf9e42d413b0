use async_trait::async_trait;
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSqlOutput, Value, ValueRef};
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row, ToSql};

use crate::core::{
    AdminMessage, NewAdminMessage, NewRating, NewSwapRequest, Rating, RequestDirection,
    SwapDecision, SwapRequest, SwapRequestStatus,
};
use crate::error::{MatchEngineError, Result};
use crate::store::{
    MessageStore, Pagination, RequestFilters, RequestPage, SqliteStore, SwapStore,
};

/// Request columns followed by its rating, if any
const REQUEST_SELECT: &str = "
    SELECT sr.id, sr.sender_id, sr.receiver_id, sr.sender_skill, sr.receiver_skill,
           sr.message, sr.status, sr.created_at, sr.updated_at, sr.completed_at,
           r.id, r.giver_id, r.receiver_id, r.rating, r.feedback, r.created_at
    FROM swap_requests sr
    LEFT JOIN ratings r ON r.request_id = sr.id";

impl ToSql for SwapRequestStatus {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for SwapRequestStatus {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        value
            .as_str()?
            .parse()
            .map_err(|e: MatchEngineError| FromSqlError::Other(Box::new(e)))
    }
}

fn request_from_row(row: &Row<'_>) -> rusqlite::Result<SwapRequest> {
    let id: i64 = row.get(0)?;

    let rating = match row.get::<_, Option<i64>>(10)? {
        Some(rating_id) => Some(Rating {
            id: rating_id,
            request_id: id,
            giver_id: row.get(11)?,
            receiver_id: row.get(12)?,
            rating: row.get(13)?,
            feedback: row.get(14)?,
            created_at: row.get(15)?,
        }),
        None => None,
    };

    Ok(SwapRequest {
        id,
        sender_id: row.get(1)?,
        receiver_id: row.get(2)?,
        sender_skill: row.get(3)?,
        receiver_skill: row.get(4)?,
        message: row.get(5)?,
        status: row.get(6)?,
        created_at: row.get(7)?,
        updated_at: row.get(8)?,
        completed_at: row.get(9)?,
        rating,
    })
}

fn fetch_request(conn: &Connection, id: i64) -> Result<Option<SwapRequest>> {
    let request = conn
        .query_row(
            &format!("{} WHERE sr.id = ?", REQUEST_SELECT),
            params![id],
            request_from_row,
        )
        .optional()?;
    Ok(request)
}

fn require_request(conn: &Connection, id: i64) -> Result<SwapRequest> {
    fetch_request(conn, id)?
        .ok_or_else(|| MatchEngineError::not_found(format!("swap request {}", id)))
}

fn user_exists(conn: &Connection, id: &str) -> Result<bool> {
    let exists = conn.query_row(
        "SELECT EXISTS (SELECT 1 FROM users WHERE id = ?)",
        params![id],
        |row| row.get(0),
    )?;
    Ok(exists)
}

fn offers_skill(conn: &Connection, user_id: &str, skill: &str) -> Result<bool> {
    let offered = conn.query_row(
        "SELECT EXISTS (SELECT 1 FROM user_skills
                        WHERE user_id = ?1 AND skill_name = ?2 AND kind = 'OFFERED')",
        params![user_id, skill],
        |row| row.get(0),
    )?;
    Ok(offered)
}

fn message_from_row(row: &Row<'_>) -> rusqlite::Result<AdminMessage> {
    Ok(AdminMessage {
        id: row.get(0)?,
        title: row.get(1)?,
        content: row.get(2)?,
        is_active: row.get(3)?,
        created_at: row.get(4)?,
    })
}

#[async_trait]
impl SwapStore for SqliteStore {
    async fn create_request(&self, request: &NewSwapRequest) -> Result<SwapRequest> {
        request.validate()?;

        let conn = self.lock()?;

        for user_id in [&request.sender_id, &request.receiver_id] {
            if !user_exists(&conn, user_id)? {
                return Err(MatchEngineError::ProfileNotFound(user_id.clone()));
            }
        }
        if !offers_skill(&conn, &request.sender_id, &request.sender_skill)? {
            return Err(MatchEngineError::validation(format!(
                "sender_skill: '{}' is not offered by {}",
                request.sender_skill, request.sender_id
            )));
        }
        if !offers_skill(&conn, &request.receiver_id, &request.receiver_skill)? {
            return Err(MatchEngineError::validation(format!(
                "receiver_skill: '{}' is not offered by {}",
                request.receiver_skill, request.receiver_id
            )));
        }

        let duplicate: bool = conn.query_row(
            "SELECT EXISTS (SELECT 1 FROM swap_requests
                            WHERE sender_id = ?1 AND receiver_id = ?2
                              AND sender_skill = ?3 AND receiver_skill = ?4
                              AND status = ?5)",
            params![
                request.sender_id,
                request.receiver_id,
                request.sender_skill,
                request.receiver_skill,
                SwapRequestStatus::Pending,
            ],
            |row| row.get(0),
        )?;
        if duplicate {
            return Err(MatchEngineError::conflict(
                "a pending request for these skills already exists",
            ));
        }

        conn.execute(
            "INSERT INTO swap_requests
                (sender_id, receiver_id, sender_skill, receiver_skill, message, status,
                 created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7)",
            params![
                request.sender_id,
                request.receiver_id,
                request.sender_skill,
                request.receiver_skill,
                request.message(),
                SwapRequestStatus::Pending,
                Self::now(),
            ],
        )?;

        require_request(&conn, conn.last_insert_rowid())
    }

    async fn get_request(&self, id: i64) -> Result<Option<SwapRequest>> {
        let conn = self.lock()?;
        fetch_request(&conn, id)
    }

    async fn list_requests(&self, user_id: &str, filters: &RequestFilters) -> Result<RequestPage> {
        filters.validate()?;

        let (mut clauses, mut args) = match filters.direction {
            RequestDirection::Sent => (
                vec!["sr.sender_id = ?"],
                vec![Value::Text(user_id.to_string())],
            ),
            RequestDirection::Received => (
                vec!["sr.receiver_id = ?"],
                vec![Value::Text(user_id.to_string())],
            ),
            RequestDirection::All => (
                vec!["(sr.sender_id = ? OR sr.receiver_id = ?)"],
                vec![Value::Text(user_id.to_string()), Value::Text(user_id.to_string())],
            ),
        };
        if let Some(status) = filters.status {
            clauses.push("sr.status = ?");
            args.push(Value::Text(status.as_str().to_string()));
        }
        let where_clause = clauses.join(" AND ");

        let conn = self.lock()?;

        let total_count: u64 = conn.query_row(
            &format!("SELECT COUNT(*) FROM swap_requests sr WHERE {}", where_clause),
            params_from_iter(args.iter()),
            |row| row.get(0),
        )?;

        args.push(Value::Integer(i64::from(filters.limit)));
        args.push(Value::Integer(filters.offset() as i64));

        let mut stmt = conn.prepare(&format!(
            "{} WHERE {} ORDER BY sr.created_at DESC, sr.id DESC LIMIT ? OFFSET ?",
            REQUEST_SELECT, where_clause
        ))?;
        let requests = stmt
            .query_map(params_from_iter(args.iter()), request_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(RequestPage {
            requests,
            pagination: Pagination::new(filters.page, filters.limit, total_count),
        })
    }

    async fn respond_to_request(
        &self,
        actor_id: &str,
        id: i64,
        decision: SwapDecision,
    ) -> Result<SwapRequest> {
        let conn = self.lock()?;
        let request = require_request(&conn, id)?;

        if request.receiver_id != actor_id {
            return Err(MatchEngineError::forbidden(
                "only the receiver can accept or reject a request",
            ));
        }
        if request.status != SwapRequestStatus::Pending {
            return Err(MatchEngineError::conflict(format!(
                "request {} has already been processed ({})",
                id, request.status
            )));
        }

        let now = Self::now();
        let completed_at = (decision == SwapDecision::Accept).then(|| now.clone());
        conn.execute(
            "UPDATE swap_requests SET status = ?1, updated_at = ?2, completed_at = ?3 WHERE id = ?4",
            params![decision.status(), now, completed_at, id],
        )?;

        require_request(&conn, id)
    }

    async fn delete_request(&self, actor_id: &str, id: i64) -> Result<()> {
        let conn = self.lock()?;
        let request = require_request(&conn, id)?;

        if request.sender_id != actor_id {
            return Err(MatchEngineError::forbidden("only the sender can delete a request"));
        }
        if request.status != SwapRequestStatus::Pending {
            return Err(MatchEngineError::conflict(format!(
                "request {} is {} and can no longer be deleted",
                id, request.status
            )));
        }

        conn.execute("DELETE FROM swap_requests WHERE id = ?", params![id])?;
        Ok(())
    }

    async fn rate_request(&self, rating: &NewRating) -> Result<Rating> {
        rating.validate()?;

        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        let request = require_request(&tx, rating.request_id)?;

        if !request.status.is_rateable() {
            return Err(MatchEngineError::conflict(
                "only accepted or completed requests can be rated",
            ));
        }
        let receiver_id = request
            .counterpart(&rating.rater_id)
            .ok_or_else(|| MatchEngineError::forbidden("only participants can rate a request"))?
            .to_string();
        if request.rating.is_some() {
            return Err(MatchEngineError::conflict(format!(
                "request {} has already been rated",
                request.id
            )));
        }

        let now = Self::now();
        tx.execute(
            "INSERT INTO ratings (request_id, giver_id, receiver_id, rating, feedback, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                request.id,
                rating.rater_id,
                receiver_id,
                rating.rating,
                rating.feedback(),
                now,
            ],
        )?;
        let rating_id = tx.last_insert_rowid();

        if request.status == SwapRequestStatus::Accepted {
            tx.execute(
                "UPDATE swap_requests SET status = ?1, updated_at = ?2 WHERE id = ?3",
                params![SwapRequestStatus::Completed, now, request.id],
            )?;
        }

        tx.commit()?;

        Ok(Rating {
            id: rating_id,
            request_id: request.id,
            giver_id: rating.rater_id.clone(),
            receiver_id,
            rating: rating.rating,
            feedback: rating.feedback().map(str::to_string),
            created_at: now,
        })
    }
}

#[async_trait]
impl MessageStore for SqliteStore {
    async fn create_message(&self, message: &NewAdminMessage) -> Result<AdminMessage> {
        message.validate()?;

        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO admin_messages (title, content, is_active, created_at)
             VALUES (?1, ?2, 1, ?3)",
            params![message.title.trim(), message.content.trim(), Self::now()],
        )?;

        let id = conn.last_insert_rowid();
        let stored = conn.query_row(
            "SELECT id, title, content, is_active, created_at FROM admin_messages WHERE id = ?",
            params![id],
            message_from_row,
        )?;
        Ok(stored)
    }

    async fn list_messages(&self, active_only: bool) -> Result<Vec<AdminMessage>> {
        let conn = self.lock()?;

        let mut stmt = conn.prepare(&format!(
            "SELECT id, title, content, is_active, created_at FROM admin_messages
             {}
             ORDER BY created_at DESC, id DESC",
            if active_only { "WHERE is_active = 1" } else { "" }
        ))?;
        let messages = stmt
            .query_map([], message_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(messages)
    }

    async fn set_message_active(&self, id: i64, active: bool) -> Result<bool> {
        let conn = self.lock()?;
        let updated = conn.execute(
            "UPDATE admin_messages SET is_active = ?1 WHERE id = ?2",
            params![active, id],
        )?;
        Ok(updated > 0)
    }
}
