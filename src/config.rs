use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Chat endpoint receiving the message history
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    /// Prompts offered on the welcome screen
    #[serde(default = "default_suggested_prompts")]
    pub suggested_prompts: Vec<String>,

    /// Chatflow home directory
    #[serde(default = "default_home")]
    pub chatflow_home: PathBuf,
}

fn default_endpoint() -> String {
    "http://localhost:3000/api/chat".to_string()
}

fn default_suggested_prompts() -> Vec<String> {
    vec![
        "What can you help me with?".to_string(),
        "Explain quantum computing".to_string(),
    ]
}

fn default_home() -> PathBuf {
    let home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("~"));
    home.join(".chatflow")
}

impl Default for Config {
    fn default() -> Self {
        Config {
            endpoint: default_endpoint(),
            suggested_prompts: default_suggested_prompts(),
            chatflow_home: default_home(),
        }
    }
}

impl Config {
    /// Load configuration from `~/.chatflow/config.toml`, falling back to
    /// defaults when the file does not exist.
    pub fn load() -> Result<Self> {
        let chatflow_home = default_home();
        let config_path = chatflow_home.join("config.toml");

        // Ensure the chatflow directory exists
        fs::create_dir_all(&chatflow_home).context("Failed to create .chatflow directory")?;

        let mut config = if config_path.exists() {
            let content =
                fs::read_to_string(&config_path).context("Failed to read config file")?;
            toml::from_str(&content).context("Failed to parse config file")?
        } else {
            Config::default()
        };

        config.chatflow_home = chatflow_home;
        Ok(config)
    }

    /// Save configuration to file
    #[allow(dead_code)]
    pub fn save(&self) -> Result<()> {
        let config_path = self.chatflow_home.join("config.toml");
        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        fs::write(&config_path, content).context("Failed to write config file")?;
        Ok(())
    }

    /// Log file path; the TUI owns the terminal, so diagnostics go here.
    pub fn log_path(&self) -> PathBuf {
        self.chatflow_home.join("chatflow.log")
    }
}
