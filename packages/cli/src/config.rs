use odfkit_editor::EditorConfig;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub const DEFAULT_CONFIG_NAME: &str = "odfkit.config.json";

/// odfkit configuration file format
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Editing engine tunables
    #[serde(default)]
    pub editor: EditorConfig,

    /// Member id used for operations that carry none
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_member: Option<String>,
}

impl Config {
    /// Load config from a directory
    pub fn load(cwd: &str) -> anyhow::Result<Self> {
        let config_path = PathBuf::from(cwd).join(DEFAULT_CONFIG_NAME);

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let config: Config = serde_json::from_str(&content)?;
            Ok(config)
        } else {
            Ok(Config::default())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_config() {
        let json = r#"{
            "editor": { "checkpointInterval": 64 },
            "defaultMember": "replayer"
        }"#;

        let config: Config = serde_json::from_str(json).unwrap();
        assert_eq!(config.editor.checkpoint_interval, 64);
        assert_eq!(config.editor.blacklisted_namespaces.len(), 2);
        assert_eq!(config.default_member.as_deref(), Some("replayer"));
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.editor, EditorConfig::default());
        assert!(config.default_member.is_none());
    }

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = std::env::temp_dir().join("odfkit-config-missing");
        let config = Config::load(&dir.display().to_string()).unwrap();
        assert_eq!(config.editor.checkpoint_interval, 500);
    }
}
