use crate::id::{ChoiceId, NodeId, StoryId};

/// Alias for `Result<T, StoryError>`.
pub type StoryResult<T> = Result<T, StoryError>;

/// Errors that can occur when loading or traversing story content.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoryError {
    /// The requested story does not exist in the catalog.
    #[error("story not found: {0}")]
    StoryNotFound(StoryId),

    /// A story with the same id is already in the catalog.
    #[error("duplicate story id: {0}")]
    DuplicateStory(StoryId),

    /// A node with the same id is already in the graph.
    #[error("duplicate node id in \"{story}\": {node}")]
    DuplicateNode {
        /// The story being built.
        story: StoryId,
        /// The colliding node id.
        node: NodeId,
    },

    /// The requested node does not exist in the graph.
    #[error("node not found in \"{story}\": {node}")]
    NodeNotFound {
        /// The story that was searched.
        story: StoryId,
        /// The missing node id.
        node: NodeId,
    },

    /// The graph's designated start node does not exist.
    #[error("start node missing in \"{story}\": {start}")]
    MissingStart {
        /// The story with the broken start reference.
        story: StoryId,
        /// The dangling start node id.
        start: NodeId,
    },

    /// A choice's target node does not resolve to an existing node.
    ///
    /// This is a content bug. It is fatal to the playthrough that hits it,
    /// never a recoverable user-facing condition.
    #[error(
        "broken choice target in \"{story}\": node {node}, choice {choice} points at missing node {target}"
    )]
    GraphIntegrity {
        /// The story containing the broken reference.
        story: StoryId,
        /// The node whose choice is broken.
        node: NodeId,
        /// The broken choice.
        choice: ChoiceId,
        /// The node id that does not exist.
        target: NodeId,
    },

    /// Story content could not be parsed.
    #[error("invalid story content: {0}")]
    Parse(String),
}

impl From<serde_json::Error> for StoryError {
    fn from(err: serde_json::Error) -> Self {
        Self::Parse(err.to_string())
    }
}
