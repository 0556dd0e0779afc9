//! Per-game display and launch customization

use serde::{Deserialize, Serialize};

/// An extra executable the user pinned to a game
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PinnedExecutable {
    pub name: String,
    pub path: String,
}

/// User overrides for one game. Every field is optional; a record with no
/// field set is removed from its table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Customization {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cover_image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub background_image: Option<String>,
    /// Executable launched instead of the scanned one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exe_override: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub launch_args: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub pinned_executables: Vec<PinnedExecutable>,
    /// Wine/Proton runner binary
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub runner_path: Option<String>,
    /// Wine prefix directory
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prefix_path: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub custom_tags: Vec<String>,
}

fn blank(field: &Option<String>) -> bool {
    field.as_deref().is_none_or(|s| s.trim().is_empty())
}

impl Customization {
    pub fn is_empty(&self) -> bool {
        blank(&self.display_name)
            && blank(&self.cover_image)
            && blank(&self.background_image)
            && blank(&self.exe_override)
            && blank(&self.launch_args)
            && self.pinned_executables.is_empty()
            && blank(&self.runner_path)
            && blank(&self.prefix_path)
            && self.custom_tags.is_empty()
    }

    /// Rewrite every field that holds a filesystem path.
    /// Returns the number of fields changed.
    pub fn rewrite_paths(&mut self, rewrite: &impl Fn(&str) -> Option<String>) -> usize {
        let mut changed = 0;
        for field in [
            &mut self.exe_override,
            &mut self.runner_path,
            &mut self.prefix_path,
            &mut self.cover_image,
            &mut self.background_image,
        ] {
            if let Some(new) = field.as_deref().and_then(rewrite) {
                *field = Some(new);
                changed += 1;
            }
        }
        for pinned in &mut self.pinned_executables {
            if let Some(new) = rewrite(&pinned.path) {
                pinned.path = new;
                changed += 1;
            }
        }
        changed
    }
}
