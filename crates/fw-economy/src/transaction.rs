//! Immutable credit transaction records.
//!
//! Every balance mutation appends exactly one record. The log is the
//! durable contract consumed by analytics and admin tooling; records are
//! never edited or deleted.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::account::UserId;

/// Unique identifier for a credit transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TransactionId(pub Uuid);

impl TransactionId {
    /// Generate a new random transaction ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for TransactionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", &self.0.to_string()[..8])
    }
}

/// What kind of balance movement a transaction records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionKind {
    /// Balance decreased by a user action.
    Spend,
    /// Balance increased through the validated earn path.
    Earn,
    /// Balance restored, saturating at capacity.
    Refund,
    /// Reward credit, saturating at capacity.
    Bonus,
}

impl fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Spend => write!(f, "spend"),
            Self::Earn => write!(f, "earn"),
            Self::Refund => write!(f, "refund"),
            Self::Bonus => write!(f, "bonus"),
        }
    }
}

/// One immutable entry in a user's credit history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreditTransaction {
    /// Unique transaction id.
    pub id: TransactionId,
    /// The account this transaction belongs to.
    pub user_id: UserId,
    /// Kind of balance movement.
    pub kind: TransactionKind,
    /// Free-text cause: "choice", "review", "achievement", "refill", ...
    pub source: String,
    /// Credits moved. Always positive.
    pub amount: u32,
    /// Balance immediately before this transaction.
    pub balance_before: u32,
    /// Balance immediately after this transaction.
    pub balance_after: u32,
    /// Optional structured context.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
    /// When the transaction was committed.
    pub created_at: DateTime<Utc>,
}

impl CreditTransaction {
    /// Record a new transaction.
    pub fn record(
        user_id: UserId,
        kind: TransactionKind,
        source: impl Into<String>,
        amount: u32,
        balance_before: u32,
        balance_after: u32,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: TransactionId::new(),
            user_id,
            kind,
            source: source.into(),
            amount,
            balance_before,
            balance_after,
            metadata: None,
            created_at: now,
        }
    }

    /// Attach structured metadata.
    #[must_use]
    pub fn with_metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = Some(metadata);
        self
    }
}
