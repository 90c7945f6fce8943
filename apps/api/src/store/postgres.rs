use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgConnection, PgPool};
use tracing::{debug, info};
use uuid::Uuid;

use super::{apply_commit, CandidateDirectory, Commit, SessionStore};
use crate::errors::AppError;
use crate::models::candidate::{CandidateRow, JobPostingRow};
use crate::models::session::{ChatSession, Message, MessageRole, SessionStatus};

#[derive(Debug, FromRow)]
struct SessionRow {
    id: Uuid,
    candidate_id: Uuid,
    job_id: Uuid,
    tenant_id: Uuid,
    candidate_name: String,
    job_title: String,
    status: String,
    access_token: Option<String>,
    expires_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    completed_at: Option<DateTime<Utc>>,
    questions_asked: i32,
    first_response_at: Option<DateTime<Utc>>,
    last_activity_at: Option<DateTime<Utc>>,
    summary: Option<String>,
}

#[derive(Debug, FromRow)]
struct MessageRow {
    sequence: i32,
    role: String,
    content: String,
    created_at: DateTime<Utc>,
}

impl MessageRow {
    fn into_message(self) -> Result<Message, AppError> {
        Ok(Message {
            role: self
                .role
                .parse::<MessageRole>()
                .map_err(|e| AppError::Internal(anyhow::anyhow!(e)))?,
            content: self.content,
            timestamp: self.created_at,
            sequence: self.sequence,
        })
    }
}

impl SessionRow {
    fn into_session(self, messages: Vec<Message>) -> Result<ChatSession, AppError> {
        Ok(ChatSession {
            session_id: self.id,
            candidate_id: self.candidate_id,
            job_id: self.job_id,
            tenant_id: self.tenant_id,
            candidate_name: self.candidate_name,
            job_title: self.job_title,
            status: self
                .status
                .parse::<SessionStatus>()
                .map_err(|e| AppError::Internal(anyhow::anyhow!(e)))?,
            messages,
            created_at: self.created_at,
            completed_at: self.completed_at,
            expires_at: self.expires_at,
            access_token: self.access_token,
            questions_asked: self.questions_asked,
            first_response_at: self.first_response_at,
            last_activity_at: self.last_activity_at,
            summary: self.summary,
        })
    }
}

/// Postgres-backed session store.
///
/// `screening_messages` is append-only: rows are INSERTed, never UPDATEd.
/// Appends lock the parent `screening_sessions` row, so concurrent writers
/// on one session are serialized by arrival order.
#[derive(Clone)]
pub struct PgSessionStore {
    pool: PgPool,
}

impl PgSessionStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn load_messages(
        conn: &mut PgConnection,
        session_id: Uuid,
    ) -> Result<Vec<Message>, AppError> {
        let rows: Vec<MessageRow> = sqlx::query_as(
            "SELECT sequence, role, content, created_at FROM screening_messages \
             WHERE session_id = $1 ORDER BY sequence ASC",
        )
        .bind(session_id)
        .fetch_all(conn)
        .await?;
        rows.into_iter().map(MessageRow::into_message).collect()
    }

    async fn load(&self, row: Option<SessionRow>) -> Result<Option<ChatSession>, AppError> {
        let Some(row) = row else {
            return Ok(None);
        };
        let mut conn = self.pool.acquire().await?;
        let messages = Self::load_messages(&mut conn, row.id).await?;
        row.into_session(messages).map(Some)
    }
}

#[async_trait]
impl SessionStore for PgSessionStore {
    async fn insert(&self, session: &ChatSession) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO screening_sessions
                (id, candidate_id, job_id, tenant_id, candidate_name, job_title, status,
                 access_token, expires_at, created_at, completed_at, questions_asked,
                 first_response_at, last_activity_at, summary)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)
            "#,
        )
        .bind(session.session_id)
        .bind(session.candidate_id)
        .bind(session.job_id)
        .bind(session.tenant_id)
        .bind(&session.candidate_name)
        .bind(&session.job_title)
        .bind(session.status.as_str())
        .bind(&session.access_token)
        .bind(session.expires_at)
        .bind(session.created_at)
        .bind(session.completed_at)
        .bind(session.questions_asked)
        .bind(session.first_response_at)
        .bind(session.last_activity_at)
        .bind(&session.summary)
        .execute(&mut *tx)
        .await?;

        for message in &session.messages {
            insert_message(&mut tx, session.session_id, message).await?;
        }

        tx.commit().await?;
        info!("Inserted screening session {}", session.session_id);
        Ok(())
    }

    async fn get(&self, session_id: Uuid) -> Result<Option<ChatSession>, AppError> {
        let row: Option<SessionRow> =
            sqlx::query_as("SELECT * FROM screening_sessions WHERE id = $1")
                .bind(session_id)
                .fetch_optional(&self.pool)
                .await?;
        self.load(row).await
    }

    async fn find_by_token(&self, token: &str) -> Result<Option<ChatSession>, AppError> {
        let row: Option<SessionRow> =
            sqlx::query_as("SELECT * FROM screening_sessions WHERE access_token = $1")
                .bind(token)
                .fetch_optional(&self.pool)
                .await?;
        self.load(row).await
    }

    async fn commit(&self, session_id: Uuid, commit: Commit) -> Result<ChatSession, AppError> {
        let mut tx = self.pool.begin().await?;

        let row: Option<SessionRow> =
            sqlx::query_as("SELECT * FROM screening_sessions WHERE id = $1 FOR UPDATE")
                .bind(session_id)
                .fetch_optional(&mut *tx)
                .await?;
        let row = row.ok_or_else(|| AppError::NotFound(format!("Session {session_id} not found")))?;
        let messages = Self::load_messages(&mut tx, session_id).await?;
        let mut session = row.into_session(messages)?;

        // On error the transaction is dropped and rolled back.
        let appended = apply_commit(&mut session, commit, Utc::now())?;

        for message in &appended {
            insert_message(&mut tx, session_id, message).await?;
        }

        sqlx::query(
            r#"
            UPDATE screening_sessions
            SET status = $1, completed_at = $2, questions_asked = $3,
                first_response_at = $4, last_activity_at = $5
            WHERE id = $6
            "#,
        )
        .bind(session.status.as_str())
        .bind(session.completed_at)
        .bind(session.questions_asked)
        .bind(session.first_response_at)
        .bind(session.last_activity_at)
        .bind(session_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        debug!(
            "Committed {} message(s) to session {session_id}, status={}",
            appended.len(),
            session.status
        );
        Ok(session)
    }

    async fn set_summary(&self, session_id: Uuid, summary: &str) -> Result<(), AppError> {
        let result = sqlx::query("UPDATE screening_sessions SET summary = $1 WHERE id = $2")
            .bind(summary)
            .bind(session_id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Session {session_id} not found")));
        }
        Ok(())
    }
}

async fn insert_message(
    conn: &mut PgConnection,
    session_id: Uuid,
    message: &Message,
) -> Result<(), AppError> {
    sqlx::query(
        "INSERT INTO screening_messages (session_id, sequence, role, content, created_at) \
         VALUES ($1, $2, $3, $4, $5)",
    )
    .bind(session_id)
    .bind(message.sequence)
    .bind(message.role.as_str())
    .bind(&message.content)
    .bind(message.timestamp)
    .execute(conn)
    .await?;
    Ok(())
}

/// Reads candidates and job postings from the tables owned by the HR backend.
#[derive(Clone)]
pub struct PgDirectory {
    pool: PgPool,
}

impl PgDirectory {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CandidateDirectory for PgDirectory {
    async fn find_candidate(&self, candidate_id: Uuid) -> Result<Option<CandidateRow>, AppError> {
        Ok(
            sqlx::query_as("SELECT id, name, job_posting_id FROM candidates WHERE id = $1")
                .bind(candidate_id)
                .fetch_optional(&self.pool)
                .await?,
        )
    }

    async fn find_job(&self, job_id: Uuid) -> Result<Option<JobPostingRow>, AppError> {
        Ok(sqlx::query_as(
            "SELECT id, tenant_id, title, department, location, description, requirements \
             FROM job_postings WHERE id = $1",
        )
        .bind(job_id)
        .fetch_optional(&self.pool)
        .await?)
    }
}
