//! Session configuration: loading and validation.

use std::path::Path;

use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Private chat channels start at this chat channel number.
const PRIVATE_CHAT_CHANNEL_BASE: u32 = 11;

/// Errors loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid public trigger pattern: {0}")]
    Pattern(#[from] regex::Error),
}

/// Settings for one command session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandConfig {
    /// Slot of the virtual private channel in the client's channel list.
    #[serde(default = "default_private_channel_index")]
    pub private_channel_index: u32,
    /// Id of the virtual private channel. Must not collide with real ones.
    #[serde(default = "default_private_channel_id")]
    pub private_channel_id: u32,
    /// Tab name shown by the client.
    #[serde(default = "default_private_channel_name")]
    pub private_channel_name: String,
    /// Whether chat and whispers matching `public_pattern` are commands.
    #[serde(default = "default_public_enable")]
    pub public_enable: bool,
    /// Pattern for public triggers. Capture group 1 is the command string.
    #[serde(default = "default_public_pattern")]
    pub public_pattern: String,
    /// Whether to greet the user after login.
    #[serde(default = "default_login_message")]
    pub login_message: bool,
    /// Greeting text; the client version is appended.
    #[serde(default = "default_login_banner")]
    pub login_banner: String,
}

fn default_private_channel_index() -> u32 {
    7
}

fn default_private_channel_id() -> u32 {
    u32::MAX - 1
}

fn default_private_channel_name() -> String {
    "Proxy".to_string()
}

fn default_public_enable() -> bool {
    true
}

fn default_public_pattern() -> String {
    "^!([^!].*)$".to_string()
}

fn default_login_message() -> bool {
    true
}

fn default_login_banner() -> String {
    "Command proxy enabled.".to_string()
}

impl Default for CommandConfig {
    fn default() -> Self {
        Self {
            private_channel_index: default_private_channel_index(),
            private_channel_id: default_private_channel_id(),
            private_channel_name: default_private_channel_name(),
            public_enable: default_public_enable(),
            public_pattern: default_public_pattern(),
            login_message: default_login_message(),
            login_banner: default_login_banner(),
        }
    }
}

impl CommandConfig {
    /// Parse a config file. Missing keys take their defaults.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Chat channel number the client uses for the private channel.
    pub fn private_chat_channel(&self) -> u32 {
        PRIVATE_CHAT_CHANNEL_BASE + self.private_channel_index
    }

    /// Compile the public trigger pattern, or `None` when disabled.
    pub fn public_trigger(&self) -> Result<Option<Regex>, ConfigError> {
        if !self.public_enable {
            return Ok(None);
        }
        Ok(Some(Regex::new(&self.public_pattern)?))
    }
}

/// Load configuration from the two-tier hierarchy.
///
/// 1. `{working_dir}/.chatcmd/config.toml` (project-local)
/// 2. `~/.config/chatcmd/config.toml` (user-global)
///
/// The first readable file wins. Unparseable files are skipped with a
/// warning; with nothing usable the defaults apply.
pub fn load_config(working_dir: &Path) -> CommandConfig {
    let project_config = working_dir.join(".chatcmd").join("config.toml");
    if let Some(config) = load_config_file(&project_config) {
        return config;
    }

    if let Some(config_dir) = dirs::config_dir() {
        let user_config = config_dir.join("chatcmd").join("config.toml");
        if let Some(config) = load_config_file(&user_config) {
            return config;
        }
    }

    CommandConfig::default()
}

fn load_config_file(path: &Path) -> Option<CommandConfig> {
    let content = std::fs::read_to_string(path).ok()?;
    CommandConfig::from_toml(&content)
        .map_err(|e| {
            tracing::warn!("Failed to parse command config {}: {}", path.display(), e);
            e
        })
        .ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = CommandConfig::default();
        assert_eq!(config.private_channel_index, 7);
        assert_eq!(config.private_channel_id, 4_294_967_294);
        assert_eq!(config.private_chat_channel(), 18);
        assert!(config.public_enable);
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config = CommandConfig::from_toml("private_channel_name = \"Cmd\"\nlogin_message = false\n").unwrap();
        assert_eq!(config.private_channel_name, "Cmd");
        assert!(!config.login_message);
        assert_eq!(config.private_channel_index, 7);
        assert_eq!(config.public_pattern, "^!([^!].*)$");
    }

    #[test]
    fn test_empty_toml_equals_default() {
        assert_eq!(CommandConfig::from_toml("").unwrap(), CommandConfig::default());
    }

    #[test]
    fn test_invalid_toml() {
        assert!(matches!(
            CommandConfig::from_toml("private_channel_index = \"seven\""),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_public_trigger() {
        let config = CommandConfig::default();
        let re = config.public_trigger().unwrap().unwrap();
        assert_eq!(&re.captures("!heal me").unwrap()[1], "heal me");
        assert!(re.captures("!!shout").is_none());
        assert!(re.captures("!").is_none());
        assert!(re.captures("hello").is_none());
    }

    #[test]
    fn test_public_trigger_disabled() {
        let config = CommandConfig {
            public_enable: false,
            ..CommandConfig::default()
        };
        assert!(config.public_trigger().unwrap().is_none());
    }

    #[test]
    fn test_public_trigger_invalid_pattern() {
        let config = CommandConfig {
            public_pattern: "^!(".to_string(),
            ..CommandConfig::default()
        };
        assert!(matches!(config.public_trigger(), Err(ConfigError::Pattern(_))));
    }

    #[test]
    fn test_load_config_from_project() {
        let tmp = tempfile::TempDir::new().unwrap();
        let dir = tmp.path().join(".chatcmd");
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("config.toml"), "public_pattern = \"^\\\\.(.+)$\"\n").unwrap();

        let config = load_config(tmp.path());
        assert_eq!(config.public_pattern, r"^\.(.+)$");
    }

    #[test]
    fn test_from_file_missing() {
        let tmp = tempfile::TempDir::new().unwrap();
        assert!(matches!(
            CommandConfig::from_file(&tmp.path().join("missing.toml")),
            Err(ConfigError::Io(_))
        ));
    }
}
