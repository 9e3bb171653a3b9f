pub mod check;
pub mod play;
pub mod show;

use std::fs;
use std::path::Path;

use fw_achievements::AchievementCatalog;
use fw_core::StoryGraph;

/// Read and parse a story file.
pub fn load_story(path: &Path) -> Result<StoryGraph, String> {
    let json = fs::read_to_string(path)
        .map_err(|e| format!("cannot read {}: {e}", path.display()))?;
    StoryGraph::from_json(&json).map_err(|e| e.to_string())
}

/// Read and parse an achievement catalog file.
pub fn load_achievements(path: &Path) -> Result<AchievementCatalog, String> {
    let json = fs::read_to_string(path)
        .map_err(|e| format!("cannot read {}: {e}", path.display()))?;
    AchievementCatalog::from_json(&json).map_err(|e| e.to_string())
}
