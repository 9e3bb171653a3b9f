//! Story collections, loaded once and shared read-only.

use std::collections::HashMap;

use crate::error::{StoryError, StoryResult};
use crate::graph::StoryGraph;
use crate::id::StoryId;

/// An immutable-after-load collection of story graphs.
#[derive(Debug, Clone, Default)]
pub struct StoryCatalog {
    stories: HashMap<StoryId, StoryGraph>,
}

impl StoryCatalog {
    /// Create an empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a validated story. The graph is linted on the way in so broken
    /// content is rejected at load time rather than mid-playthrough.
    pub fn add_story(&mut self, graph: StoryGraph) -> StoryResult<()> {
        if self.stories.contains_key(&graph.id) {
            return Err(StoryError::DuplicateStory(graph.id.clone()));
        }
        graph.validate()?;
        self.stories.insert(graph.id.clone(), graph);
        Ok(())
    }

    /// Add a story without linting it. Used by tests that exercise the
    /// runtime integrity path with deliberately broken content.
    pub fn add_story_unchecked(&mut self, graph: StoryGraph) -> StoryResult<()> {
        if self.stories.contains_key(&graph.id) {
            return Err(StoryError::DuplicateStory(graph.id.clone()));
        }
        self.stories.insert(graph.id.clone(), graph);
        Ok(())
    }

    /// Look up a story by id.
    pub fn story(&self, id: &StoryId) -> StoryResult<&StoryGraph> {
        self.stories
            .get(id)
            .ok_or_else(|| StoryError::StoryNotFound(id.clone()))
    }

    /// Iterate over all stories in no particular order.
    pub fn all_stories(&self) -> impl Iterator<Item = &StoryGraph> {
        self.stories.values()
    }

    /// Number of stories in the catalog.
    pub fn len(&self) -> usize {
        self.stories.len()
    }

    /// Whether the catalog holds no stories.
    pub fn is_empty(&self) -> bool {
        self.stories.is_empty()
    }
}
