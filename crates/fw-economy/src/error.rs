use crate::account::UserId;

/// Alias for `Result<T, EconomyError>`.
pub type EconomyResult<T> = Result<T, EconomyError>;

/// Errors that can occur during credit operations.
///
/// All variants except [`EconomyError::UnknownUser`] are expected,
/// recoverable conditions surfaced to the caller as typed results — they are
/// rejected before any mutation and leave no log entry.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EconomyError {
    /// Amount is zero or above the per-transaction limit.
    #[error("invalid amount: {amount} (limit {limit})")]
    InvalidAmount {
        /// The rejected amount.
        amount: u32,
        /// The per-transaction limit.
        limit: u32,
    },

    /// Spend exceeds the available balance.
    #[error("insufficient credits: need {required}, have {available}")]
    InsufficientCredits {
        /// Credits the operation needed.
        required: u32,
        /// Credits actually available.
        available: u32,
    },

    /// A generic earn would push the balance over the validated ceiling.
    #[error("earn of {amount} on balance {balance} exceeds ceiling {ceiling}")]
    ExceedsCap {
        /// Balance before the rejected earn.
        balance: u32,
        /// The rejected amount.
        amount: u32,
        /// The binding ceiling.
        ceiling: u32,
    },

    /// No account exists for the given user.
    #[error("unknown user: {0}")]
    UnknownUser(UserId),
}
