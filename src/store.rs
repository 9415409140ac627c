//! SQLite persistence for users, expenses, and live-message handles

mod schema;

pub use schema::*;

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::{Arc, Mutex};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("User already registered: {0}")]
    DuplicateUser(UserId),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Thread-safe store handle
#[derive(Clone)]
pub struct ExpenseStore {
    conn: Arc<Mutex<Connection>>,
}

impl ExpenseStore {
    /// Open or create the database at the given path
    pub fn open<P: AsRef<Path>>(path: P) -> StoreResult<Self> {
        let conn = Connection::open(path)?;
        let store = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        store.run_migrations()?;
        Ok(store)
    }

    /// Open an in-memory database (for testing)
    #[allow(dead_code)] // Used in tests
    pub fn open_in_memory() -> StoreResult<Self> {
        let conn = Connection::open_in_memory()?;
        let store = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        store.run_migrations()?;
        Ok(store)
    }

    fn run_migrations(&self) -> StoreResult<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute_batch(SCHEMA)?;
        Ok(())
    }

    // ==================== User Operations ====================

    /// Register a new user. Signals `DuplicateUser` if the id is already
    /// present; handling a racing second registration is the caller's job.
    pub fn register_user(&self, user: &User) -> StoreResult<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO users (user_id, name, registered_at) VALUES (?1, ?2, ?3)",
            params![user.id.0, user.name, user.registered_at.to_rfc3339()],
        )
        .map_err(|e| match e {
            rusqlite::Error::SqliteFailure(err, _)
                if err.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                StoreError::DuplicateUser(user.id)
            }
            other => StoreError::Sqlite(other),
        })?;
        Ok(())
    }

    /// Registration timestamp for a user, or `None` if never registered
    pub fn registration(&self, id: UserId) -> StoreResult<Option<DateTime<Utc>>> {
        let conn = self.conn.lock().unwrap();
        let row = conn.query_row(
            "SELECT registered_at FROM users WHERE user_id = ?1",
            params![id.0],
            |row| row.get::<_, String>(0),
        );
        match row {
            Ok(raw) => Ok(Some(parse_datetime(&raw))),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(other) => Err(StoreError::Sqlite(other)),
        }
    }

    /// Total number of registered users
    pub fn user_count(&self) -> StoreResult<i64> {
        let conn = self.conn.lock().unwrap();
        conn.query_row("SELECT COUNT(*) FROM users", [], |row| row.get(0))
            .map_err(StoreError::from)
    }

    // ==================== Expense Operations ====================

    /// Record one expense
    pub fn record_expense(&self, expense: &Expense) -> StoreResult<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO expenses (user_id, occurred_at, occurred_at_ms, category, amount)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                expense.user_id.0,
                expense.occurred_at.to_rfc3339(),
                expense.occurred_at.timestamp_millis(),
                expense.category,
                expense.amount,
            ],
        )?;
        Ok(())
    }

    /// Per-category sums for one user over the inclusive `[start, end]`
    /// range. Only categories with at least one expense appear.
    pub fn sum_by_category(
        &self,
        user: UserId,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> StoreResult<BTreeMap<String, f64>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT category, SUM(amount) FROM expenses
             WHERE user_id = ?1 AND occurred_at_ms >= ?2 AND occurred_at_ms <= ?3
             GROUP BY category",
        )?;

        let rows = stmt.query_map(
            params![user.0, start.timestamp_millis(), end.timestamp_millis()],
            |row| Ok((row.get::<_, String>(0)?, row.get::<_, f64>(1)?)),
        )?;

        rows.collect::<Result<BTreeMap<_, _>, _>>()
            .map_err(StoreError::from)
    }

    // ==================== Live-Message Operations ====================

    /// Remember the user's live menu message. Last write wins; a write for
    /// an unregistered user is a no-op.
    pub fn set_display_handle(&self, user: UserId, msg: MessageRef) -> StoreResult<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "UPDATE users SET last_chat_id = ?1, last_message_id = ?2 WHERE user_id = ?3",
            params![msg.chat.0, msg.message.0, user.0],
        )?;
        Ok(())
    }

    /// The user's live menu message, or `None` if nothing was tracked yet
    pub fn display_handle(&self, user: UserId) -> StoreResult<Option<MessageRef>> {
        let conn = self.conn.lock().unwrap();
        let row = conn.query_row(
            "SELECT last_chat_id, last_message_id FROM users WHERE user_id = ?1",
            params![user.0],
            |row| {
                Ok((
                    row.get::<_, Option<i64>>(0)?,
                    row.get::<_, Option<i64>>(1)?,
                ))
            },
        );
        match row {
            Ok((Some(chat), Some(message))) => Ok(Some(MessageRef {
                chat: ChatId(chat),
                message: MessageId(message),
            })),
            Ok(_) | Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(other) => Err(StoreError::Sqlite(other)),
        }
    }
}

fn parse_datetime(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s).map_or_else(|_| Utc::now(), |dt| dt.with_timezone(&Utc))
}
