//! The directed story graph.
//!
//! A graph is authored ahead of time and never mutated at runtime. The
//! progression engine only reads from it. [`StoryGraph::validate`] is the
//! content linter: it reports every dangling node reference before a player
//! can hit one.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::{StoryError, StoryResult};
use crate::id::{NodeId, StoryId};
use crate::node::StoryNode;

/// A complete authored story: metadata, a start node, and the node map.
#[derive(Debug, Clone)]
pub struct StoryGraph {
    /// Unique story identifier.
    pub id: StoryId,
    /// Display title.
    pub title: String,
    /// Genre tag used by achievement conditions.
    pub genre: String,
    /// The node a fresh playthrough begins at.
    pub start: NodeId,
    nodes: HashMap<NodeId, StoryNode>,
}

/// Serialized form of a graph: nodes as an ordered list.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoryGraphData {
    id: StoryId,
    title: String,
    #[serde(default)]
    genre: String,
    start: NodeId,
    nodes: Vec<StoryNode>,
}

impl StoryGraph {
    /// Create an empty graph with the given metadata.
    pub fn new(
        id: impl Into<StoryId>,
        title: impl Into<String>,
        genre: impl Into<String>,
        start: impl Into<NodeId>,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            genre: genre.into(),
            start: start.into(),
            nodes: HashMap::new(),
        }
    }

    /// Add a node to the graph.
    pub fn add_node(&mut self, node: StoryNode) -> StoryResult<()> {
        if self.nodes.contains_key(&node.id) {
            return Err(StoryError::DuplicateNode {
                story: self.id.clone(),
                node: node.id.clone(),
            });
        }
        self.nodes.insert(node.id.clone(), node);
        Ok(())
    }

    /// Builder-style [`Self::add_node`]. Panics on duplicate ids, so only
    /// suitable for hand-assembled graphs in tests and tools.
    #[must_use]
    pub fn with_node(mut self, node: StoryNode) -> Self {
        let id = node.id.clone();
        assert!(
            self.nodes.insert(id.clone(), node).is_none(),
            "duplicate node id: {id}"
        );
        self
    }

    /// Look up a node by id.
    pub fn node(&self, id: &NodeId) -> Option<&StoryNode> {
        self.nodes.get(id)
    }

    /// The start node, or an error if the start reference is dangling.
    pub fn start_node(&self) -> StoryResult<&StoryNode> {
        self.nodes.get(&self.start).ok_or(StoryError::MissingStart {
            story: self.id.clone(),
            start: self.start.clone(),
        })
    }

    /// Iterate over all nodes in no particular order.
    pub fn all_nodes(&self) -> impl Iterator<Item = &StoryNode> {
        self.nodes.values()
    }

    /// Number of nodes in the graph.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Number of ending nodes (no outgoing choices).
    pub fn ending_count(&self) -> usize {
        self.nodes.values().filter(|n| n.is_ending()).count()
    }

    /// Every integrity problem in the graph: a dangling start reference and
    /// each choice whose target node does not exist.
    pub fn issues(&self) -> Vec<StoryError> {
        let mut issues = Vec::new();

        if !self.nodes.contains_key(&self.start) {
            issues.push(StoryError::MissingStart {
                story: self.id.clone(),
                start: self.start.clone(),
            });
        }

        let mut node_ids: Vec<&NodeId> = self.nodes.keys().collect();
        node_ids.sort();
        for node_id in node_ids {
            let node = &self.nodes[node_id];
            for choice in &node.choices {
                if !self.nodes.contains_key(&choice.next_node) {
                    issues.push(StoryError::GraphIntegrity {
                        story: self.id.clone(),
                        node: node.id.clone(),
                        choice: choice.id.clone(),
                        target: choice.next_node.clone(),
                    });
                }
            }
        }

        issues
    }

    /// Validate the graph, returning the first integrity issue found.
    pub fn validate(&self) -> StoryResult<()> {
        match self.issues().into_iter().next() {
            Some(issue) => Err(issue),
            None => Ok(()),
        }
    }

    /// Parse a graph from authored JSON.
    pub fn from_json(json: &str) -> StoryResult<Self> {
        let data: StoryGraphData = serde_json::from_str(json)?;
        let mut graph = Self::new(data.id, data.title, data.genre, data.start);
        for node in data.nodes {
            graph.add_node(node)?;
        }
        Ok(graph)
    }

    /// Serialize the graph to JSON, nodes sorted by id for stable output.
    pub fn to_json(&self) -> StoryResult<String> {
        let mut nodes: Vec<StoryNode> = self.nodes.values().cloned().collect();
        nodes.sort_by(|a, b| a.id.cmp(&b.id));
        let data = StoryGraphData {
            id: self.id.clone(),
            title: self.title.clone(),
            genre: self.genre.clone(),
            start: self.start.clone(),
            nodes,
        };
        Ok(serde_json::to_string_pretty(&data)?)
    }
}
