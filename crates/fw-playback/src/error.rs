use fw_achievements::AchievementError;
use fw_core::{NodeId, StoryError};
use fw_economy::{EconomyError, UserId};

/// Alias for `Result<T, PlaybackError>`.
pub type PlaybackResult<T> = Result<T, PlaybackError>;

/// Errors that can occur while driving a playthrough.
///
/// Recoverable gating conditions (a locked choice, an insufficient
/// balance) are not errors: they surface as
/// [`EngineEvent::ChoiceRejected`](crate::event::EngineEvent) with no
/// mutation. These variants are for caller bugs, missing state, and the
/// one fatal case: broken story content.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PlaybackError {
    /// The user has no playthrough in progress.
    #[error("no active playthrough for user {0}")]
    NoActivePlaythrough(UserId),

    /// The selected choice index does not exist on the current node.
    #[error("no choice {index} on node {node}")]
    NoSuchChoice {
        /// The node presenting the choices.
        node: NodeId,
        /// The out-of-range index.
        index: usize,
    },

    /// Story content error, including the fatal graph-integrity case.
    #[error(transparent)]
    Story(#[from] StoryError),

    /// Credit operation error.
    #[error(transparent)]
    Economy(#[from] EconomyError),

    /// Achievement operation error.
    #[error(transparent)]
    Achievement(#[from] AchievementError),
}
