//! Nodes, narrative segments, and player choices.

use serde::{Deserialize, Serialize};

use crate::id::{AchievementId, ChoiceId, NodeId};

/// Credits a choice costs when the author does not set one.
pub const DEFAULT_CHOICE_COST: u32 = 1;

/// One displayed narrative beat within a node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Segment {
    /// The narrative text shown to the reader.
    pub text: String,
    /// Opaque asset URI (image or audio). Never fetched or validated here.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media: Option<String>,
    /// Display duration in milliseconds before auto-advancing.
    /// `None` means the segment waits for an explicit advance.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
}

impl Segment {
    /// Create a segment with the given text.
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            media: None,
            duration_ms: None,
        }
    }

    /// Attach a media asset URI.
    pub fn with_media(mut self, uri: impl Into<String>) -> Self {
        self.media = Some(uri.into());
        self
    }

    /// Set an auto-advance display duration in milliseconds.
    pub fn with_duration_ms(mut self, ms: u64) -> Self {
        self.duration_ms = Some(ms);
        self
    }
}

/// A selectable branch out of a story node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Choice {
    /// Unique identifier within the owning node.
    pub id: ChoiceId,
    /// The text shown to the player.
    pub text: String,
    /// The node this choice leads to.
    pub next_node: NodeId,
    /// Achievement required before this choice can be selected.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub required_achievement: Option<AchievementId>,
    /// Credit cost override. Absent means [`DEFAULT_CHOICE_COST`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cost: Option<u32>,
}

impl Choice {
    /// Create a choice leading to the given node.
    pub fn new(id: impl Into<ChoiceId>, text: impl Into<String>, next_node: impl Into<NodeId>) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
            next_node: next_node.into(),
            required_achievement: None,
            cost: None,
        }
    }

    /// Gate this choice behind an achievement.
    pub fn with_required_achievement(mut self, achievement: impl Into<AchievementId>) -> Self {
        self.required_achievement = Some(achievement.into());
        self
    }

    /// Override the credit cost.
    pub fn with_cost(mut self, cost: u32) -> Self {
        self.cost = Some(cost);
        self
    }

    /// The credits selecting this choice spends.
    pub fn credit_cost(&self) -> u32 {
        self.cost.unwrap_or(DEFAULT_CHOICE_COST)
    }
}

/// A story-graph vertex: an ordered list of segments plus outgoing choices.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoryNode {
    /// Unique identifier within the story.
    pub id: NodeId,
    /// Narrative beats, displayed in order.
    #[serde(default)]
    pub segments: Vec<Segment>,
    /// Outgoing choices. Empty means this node is an ending.
    #[serde(default)]
    pub choices: Vec<Choice>,
}

impl StoryNode {
    /// Create an empty node with the given id.
    pub fn new(id: impl Into<NodeId>) -> Self {
        Self {
            id: id.into(),
            segments: Vec::new(),
            choices: Vec::new(),
        }
    }

    /// Append a segment.
    pub fn with_segment(mut self, segment: Segment) -> Self {
        self.segments.push(segment);
        self
    }

    /// Append a choice.
    pub fn with_choice(mut self, choice: Choice) -> Self {
        self.choices.push(choice);
        self
    }

    /// Whether this node terminates the story (no outgoing choices).
    pub fn is_ending(&self) -> bool {
        self.choices.is_empty()
    }

    /// All segment texts joined into one narrative block, as recorded in
    /// playthrough history.
    pub fn narrative_text(&self) -> String {
        let texts: Vec<&str> = self.segments.iter().map(|s| s.text.as_str()).collect();
        texts.join("\n")
    }

    /// Media URIs referenced by this node's segments, in display order.
    pub fn media_refs(&self) -> Vec<&str> {
        self.segments
            .iter()
            .filter_map(|s| s.media.as_deref())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn segment_builder() {
        let seg = Segment::new("The gate creaks open.")
            .with_media("img/gate.png")
            .with_duration_ms(4000);

        assert_eq!(seg.text, "The gate creaks open.");
        assert_eq!(seg.media.as_deref(), Some("img/gate.png"));
        assert_eq!(seg.duration_ms, Some(4000));
    }

    #[test]
    fn choice_cost_defaults_to_one() {
        let choice = Choice::new("enter", "Step through the gate", "courtyard");
        assert_eq!(choice.credit_cost(), 1);

        let pricey = choice.with_cost(3);
        assert_eq!(pricey.credit_cost(), 3);
    }

    #[test]
    fn choice_builder_gating() {
        let choice = Choice::new("bribe", "Bribe the guard", "inside")
            .with_required_achievement("silver-tongue");

        assert_eq!(
            choice.required_achievement,
            Some(AchievementId::new("silver-tongue"))
        );
    }

    #[test]
    fn node_ending_detection() {
        let node = StoryNode::new("finale").with_segment(Segment::new("The end."));
        assert!(node.is_ending());

        let node = node.with_choice(Choice::new("again", "Start over", "intro"));
        assert!(!node.is_ending());
    }

    #[test]
    fn narrative_text_joins_segments() {
        let node = StoryNode::new("intro")
            .with_segment(Segment::new("Rain hammers the roof."))
            .with_segment(Segment::new("Someone knocks twice."));

        assert_eq!(
            node.narrative_text(),
            "Rain hammers the roof.\nSomeone knocks twice."
        );
    }

    #[test]
    fn media_refs_in_order() {
        let node = StoryNode::new("intro")
            .with_segment(Segment::new("a").with_media("img/a.png"))
            .with_segment(Segment::new("b"))
            .with_segment(Segment::new("c").with_media("img/c.png"));

        assert_eq!(node.media_refs(), vec!["img/a.png", "img/c.png"]);
    }

    #[test]
    fn node_serde_roundtrip() {
        let node = StoryNode::new("intro")
            .with_segment(Segment::new("Hello.").with_duration_ms(1000))
            .with_choice(Choice::new("go", "Go north", "gate").with_cost(2));

        let json = serde_json::to_string(&node).unwrap();
        let back: StoryNode = serde_json::from_str(&json).unwrap();
        assert_eq!(back, node);
    }
}
