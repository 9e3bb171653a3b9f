//! The per-user playthrough state machine.
//!
//! `Playing -> AwaitingChoice -> Playing (next node) | Ended`. A node's
//! segments advance by elapsed display duration or an explicit skip; after
//! the last segment the playthrough awaits a choice, or ends immediately
//! when the node has none. The completion signal fires exactly once per
//! run: replaying the final node does not re-fire it, restarting re-arms
//! it.
//!
//! Gating (achievements, credit spend) happens in the service before
//! [`Playthrough::commit_choice`] is called; this type never touches the
//! ledger.

use std::fmt;

use serde::{Deserialize, Serialize};

use fw_core::{NodeId, StoryError, StoryGraph, StoryId, StoryNode};

use crate::error::{PlaybackError, PlaybackResult};
use crate::history::{HistoryEntry, HistoryLog};

/// Where the state machine currently sits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlaybackPhase {
    /// Segments of the current node are being displayed.
    Playing,
    /// All segments shown; waiting for the player to pick a choice.
    AwaitingChoice,
    /// A terminal node was reached.
    Ended,
}

impl fmt::Display for PlaybackPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Playing => write!(f, "playing"),
            Self::AwaitingChoice => write!(f, "awaiting choice"),
            Self::Ended => write!(f, "ended"),
        }
    }
}

/// One user's traversal of a story graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Playthrough {
    story: StoryId,
    current: NodeId,
    segment_index: usize,
    segment_elapsed_ms: u64,
    phase: PlaybackPhase,
    history: HistoryLog,
    ending_fired: bool,
}

impl Playthrough {
    /// Begin a playthrough at the story's start node.
    ///
    /// Returns the playthrough and, for the degenerate story whose start
    /// node is already terminal with no segments, the ending that fired.
    pub fn begin(graph: &StoryGraph) -> PlaybackResult<(Self, Option<NodeId>)> {
        graph.start_node()?;
        let mut playthrough = Self {
            story: graph.id.clone(),
            current: graph.start.clone(),
            segment_index: 0,
            segment_elapsed_ms: 0,
            phase: PlaybackPhase::Playing,
            history: HistoryLog::new(),
            ending_fired: false,
        };
        let ending = playthrough.settle(graph)?;
        Ok((playthrough, ending))
    }

    /// The story being played.
    pub fn story(&self) -> &StoryId {
        &self.story
    }

    /// The current node id.
    pub fn current(&self) -> &NodeId {
        &self.current
    }

    /// The current phase.
    pub fn phase(&self) -> PlaybackPhase {
        self.phase
    }

    /// Index of the segment currently displayed.
    pub fn segment_index(&self) -> usize {
        self.segment_index
    }

    /// The history log so far.
    pub fn history(&self) -> &HistoryLog {
        &self.history
    }

    /// The current node, resolved against the graph.
    pub fn current_node<'g>(&self, graph: &'g StoryGraph) -> PlaybackResult<&'g StoryNode> {
        graph.node(&self.current).ok_or_else(|| {
            PlaybackError::Story(StoryError::NodeNotFound {
                story: self.story.clone(),
                node: self.current.clone(),
            })
        })
    }

    /// Advance segment display by `ms` of wall-clock time.
    ///
    /// Timed segments roll over automatically, carrying the remainder into
    /// the next; an untimed segment absorbs the rest and waits for an
    /// explicit skip. Returns the ending node if the advance ran off the
    /// end of a terminal node.
    pub fn elapse(&mut self, graph: &StoryGraph, ms: u64) -> PlaybackResult<Option<NodeId>> {
        if self.phase != PlaybackPhase::Playing {
            return Ok(None);
        }
        let node = self.current_node(graph)?;
        let mut remaining = ms;

        while self.segment_index < node.segments.len() {
            match node.segments[self.segment_index].duration_ms {
                None => return Ok(None),
                Some(duration) => {
                    let needed = duration.saturating_sub(self.segment_elapsed_ms);
                    if remaining < needed {
                        self.segment_elapsed_ms += remaining;
                        return Ok(None);
                    }
                    remaining -= needed;
                    self.segment_index += 1;
                    self.segment_elapsed_ms = 0;
                }
            }
        }
        self.settle(graph)
    }

    /// Skip the current segment. Only the segment timer is affected.
    pub fn skip_segment(&mut self, graph: &StoryGraph) -> PlaybackResult<Option<NodeId>> {
        if self.phase != PlaybackPhase::Playing {
            return Ok(None);
        }
        let node = self.current_node(graph)?;
        if self.segment_index < node.segments.len() {
            self.segment_index += 1;
            self.segment_elapsed_ms = 0;
        }
        self.settle(graph)
    }

    /// Re-display the current node from its first segment. History and
    /// ledger are untouched, and an already-fired ending stays fired.
    pub fn replay_node(&mut self, graph: &StoryGraph) -> PlaybackResult<Option<NodeId>> {
        self.segment_index = 0;
        self.segment_elapsed_ms = 0;
        self.phase = PlaybackPhase::Playing;
        self.settle(graph)
    }

    /// Restart from the story's start node: history cleared, completion
    /// signal re-armed.
    pub fn restart(&mut self, graph: &StoryGraph) -> PlaybackResult<Option<NodeId>> {
        graph.start_node()?;
        self.current = graph.start.clone();
        self.segment_index = 0;
        self.segment_elapsed_ms = 0;
        self.phase = PlaybackPhase::Playing;
        self.history.clear();
        self.ending_fired = false;
        self.settle(graph)
    }

    /// Commit a gated, paid-for choice: append history, move to the target
    /// node, and settle.
    ///
    /// The caller has already verified gating and spent the credits. A
    /// choice targeting the start node is a full restart: history is
    /// cleared and the completion signal re-armed.
    pub fn commit_choice(
        &mut self,
        graph: &StoryGraph,
        index: usize,
    ) -> PlaybackResult<Option<NodeId>> {
        if self.phase != PlaybackPhase::AwaitingChoice {
            return Ok(None);
        }
        let node = self.current_node(graph)?;
        let choice = node
            .choices
            .get(index)
            .ok_or_else(|| PlaybackError::NoSuchChoice {
                node: self.current.clone(),
                index,
            })?;

        if graph.node(&choice.next_node).is_none() {
            return Err(PlaybackError::Story(StoryError::GraphIntegrity {
                story: self.story.clone(),
                node: node.id.clone(),
                choice: choice.id.clone(),
                target: choice.next_node.clone(),
            }));
        }

        let narrative = node.narrative_text();
        let choice_text = choice.text.clone();
        let next = choice.next_node.clone();

        self.history.append(HistoryEntry::Narrative {
            text: narrative,
            node: self.current.clone(),
        });
        self.history.append(HistoryEntry::Choice { text: choice_text });

        self.current = next;
        self.segment_index = 0;
        self.segment_elapsed_ms = 0;
        self.phase = PlaybackPhase::Playing;

        if self.current == graph.start {
            self.history.clear();
            self.ending_fired = false;
        }

        self.settle(graph)
    }

    /// Resolve the phase after segment exhaustion: a node with choices
    /// awaits one, a node without ends the playthrough. The returned node
    /// id is the completion signal; it fires at most once per run.
    fn settle(&mut self, graph: &StoryGraph) -> PlaybackResult<Option<NodeId>> {
        if self.phase != PlaybackPhase::Playing {
            return Ok(None);
        }
        let node = self.current_node(graph)?;
        if self.segment_index < node.segments.len() {
            return Ok(None);
        }

        if node.is_ending() {
            self.phase = PlaybackPhase::Ended;
            if !self.ending_fired {
                self.ending_fired = true;
                return Ok(Some(self.current.clone()));
            }
        } else {
            self.phase = PlaybackPhase::AwaitingChoice;
        }
        Ok(None)
    }
}
