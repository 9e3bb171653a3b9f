use fw_core::AchievementId;

/// Alias for `Result<T, AchievementError>`.
pub type AchievementResult<T> = Result<T, AchievementError>;

/// Errors that can occur during achievement operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AchievementError {
    /// The requested achievement is not in the catalog.
    #[error("unknown achievement: {0}")]
    UnknownAchievement(AchievementId),

    /// An achievement with the same id is already in the catalog.
    #[error("duplicate achievement id: {0}")]
    DuplicateAchievement(AchievementId),

    /// Catalog content could not be parsed.
    #[error("invalid achievement content: {0}")]
    Parse(String),
}

impl From<serde_json::Error> for AchievementError {
    fn from(err: serde_json::Error) -> Self {
        Self::Parse(err.to_string())
    }
}
