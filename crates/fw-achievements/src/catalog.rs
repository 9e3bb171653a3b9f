//! The static achievement catalog.
//!
//! Loaded once at startup and shared read-only, like story content.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use fw_core::AchievementId;

use crate::condition::UnlockCondition;
use crate::error::{AchievementError, AchievementResult};
use crate::reward::RewardSet;

/// How rare an achievement is, for display ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Rarity {
    /// Most users will unlock this.
    Common,
    /// Takes deliberate effort.
    Rare,
    /// Dedicated users only.
    Epic,
    /// A handful of users ever see this.
    Legendary,
}

impl fmt::Display for Rarity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Common => write!(f, "common"),
            Self::Rare => write!(f, "rare"),
            Self::Epic => write!(f, "epic"),
            Self::Legendary => write!(f, "legendary"),
        }
    }
}

/// One achievement definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Achievement {
    /// Unique identifier.
    pub id: AchievementId,
    /// Display name.
    pub name: String,
    /// Display description.
    #[serde(default)]
    pub description: String,
    /// The condition that completes this achievement.
    pub condition: UnlockCondition,
    /// What unlocking grants.
    #[serde(default)]
    pub rewards: RewardSet,
    /// Display rarity.
    pub rarity: Rarity,
}

impl Achievement {
    /// Create an achievement with empty rewards.
    pub fn new(
        id: impl Into<AchievementId>,
        name: impl Into<String>,
        condition: UnlockCondition,
        rarity: Rarity,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: String::new(),
            condition,
            rewards: RewardSet::default(),
            rarity,
        }
    }

    /// Set the rewards.
    #[must_use]
    pub fn with_rewards(mut self, rewards: RewardSet) -> Self {
        self.rewards = rewards;
        self
    }

    /// Set the description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }
}

/// Serialized catalog form.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct CatalogData {
    achievements: Vec<Achievement>,
}

/// An immutable-after-load collection of achievements.
#[derive(Debug, Clone, Default)]
pub struct AchievementCatalog {
    by_id: HashMap<AchievementId, Achievement>,
    order: Vec<AchievementId>,
}

impl AchievementCatalog {
    /// Create an empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an achievement definition.
    pub fn add_achievement(&mut self, achievement: Achievement) -> AchievementResult<()> {
        if self.by_id.contains_key(&achievement.id) {
            return Err(AchievementError::DuplicateAchievement(
                achievement.id.clone(),
            ));
        }
        self.order.push(achievement.id.clone());
        self.by_id.insert(achievement.id.clone(), achievement);
        Ok(())
    }

    /// Look up an achievement by id.
    pub fn get(&self, id: &AchievementId) -> Option<&Achievement> {
        self.by_id.get(id)
    }

    /// Iterate over all achievements in catalog order.
    pub fn all(&self) -> impl Iterator<Item = &Achievement> {
        self.order.iter().filter_map(|id| self.by_id.get(id))
    }

    /// Number of achievements.
    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    /// Whether the catalog is empty.
    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }

    /// Parse a catalog from authored JSON.
    pub fn from_json(json: &str) -> AchievementResult<Self> {
        let data: CatalogData = serde_json::from_str(json)?;
        let mut catalog = Self::new();
        for achievement in data.achievements {
            catalog.add_achievement(achievement)?;
        }
        Ok(catalog)
    }
}
