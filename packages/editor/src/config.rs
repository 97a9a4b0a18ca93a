use odfkit_dom::ns;
use serde::{Deserialize, Serialize};

/// Engine tunables, usually read from the `editor` section of
/// `odfkit.config.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditorConfig {
    /// Distance in steps between cached step checkpoints
    #[serde(default = "default_checkpoint_interval")]
    pub checkpoint_interval: usize,

    /// Namespaces whose elements are invisible to position walking
    #[serde(default = "default_blacklisted_namespaces")]
    pub blacklisted_namespaces: Vec<String>,
}

fn default_checkpoint_interval() -> usize {
    500
}

fn default_blacklisted_namespaces() -> Vec<String> {
    vec![ns::CURSOR.to_string(), ns::EDITINFO.to_string()]
}

impl EditorConfig {
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Checkpoint interval clamped to at least one step.
    pub fn effective_checkpoint_interval(&self) -> usize {
        self.checkpoint_interval.max(1)
    }
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            checkpoint_interval: default_checkpoint_interval(),
            blacklisted_namespaces: default_blacklisted_namespaces(),
        }
    }
}
