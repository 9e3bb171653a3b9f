//! Reward definitions.

use serde::{Deserialize, Serialize};

/// What unlocking an achievement grants.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RewardSet {
    /// One-time credit grant, applied through the saturating bonus path.
    #[serde(default)]
    pub credit_bonus: u32,
    /// Permanent increase to the account's credit capacity.
    #[serde(default)]
    pub max_credit_increase: u32,
    /// Cosmetic avatar ids unlocked.
    #[serde(default)]
    pub avatar_unlocks: Vec<String>,
}

impl RewardSet {
    /// A reward that grants credits only.
    pub fn credits(credit_bonus: u32) -> Self {
        Self {
            credit_bonus,
            ..Self::default()
        }
    }

    /// A reward that raises capacity only.
    pub fn capacity(max_credit_increase: u32) -> Self {
        Self {
            max_credit_increase,
            ..Self::default()
        }
    }

    /// Add an avatar unlock.
    #[must_use]
    pub fn with_avatar(mut self, avatar: impl Into<String>) -> Self {
        self.avatar_unlocks.push(avatar.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builders() {
        let reward = RewardSet::credits(5).with_avatar("wanderer");
        assert_eq!(reward.credit_bonus, 5);
        assert_eq!(reward.max_credit_increase, 0);
        assert_eq!(reward.avatar_unlocks, vec!["wanderer".to_string()]);
    }

    #[test]
    fn serde_defaults_missing_fields() {
        let reward: RewardSet = serde_json::from_str(r#"{ "credit_bonus": 3 }"#).unwrap();
        assert_eq!(reward.credit_bonus, 3);
        assert_eq!(reward.max_credit_increase, 0);
        assert!(reward.avatar_unlocks.is_empty());
    }
}
