use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Ledger record for one Telegram user. Created lazily on first
/// contact, never deleted.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub id_telegram: String,
    /// USD ledger balance, read and written without transactions
    pub summ_dolar: f64,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl User {
    /// Freshly created rows carry identical timestamps.
    pub fn is_new(&self) -> bool {
        self.created_at == self.updated_at
    }
}
