//! Settings for the forum index
//!
//! Loaded from (in order of priority):
//! 1. Runtime environment variables (`AGORA_*`)
//! 2. JSON file in the Agora config directory (forum.json)
//! 3. Built-in defaults

use anyhow::{Context, Result, bail};
use log::debug;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::str::FromStr;

/// Settings filename in the Agora config directory
const SETTINGS_FILE: &str = "forum.json";

/// Screen layout the index is shown in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Layout {
    /// Phone layout: list and detail are separate pages
    #[default]
    Narrow,
    /// Tablet split view: list and detail side by side
    Wide,
}

impl Layout {
    pub fn is_wide(&self) -> bool {
        matches!(self, Layout::Wide)
    }
}

impl FromStr for Layout {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "narrow" => Ok(Layout::Narrow),
            "wide" => Ok(Layout::Wide),
            other => bail!("Unknown layout: {}", other),
        }
    }
}

/// Forum index settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForumSettings {
    /// Prefix of discussion paths. `mod_forum/` when the index is embedded
    /// in a course page, empty when it is a page of its own.
    pub path_prefix: String,
    /// Whether the site supports sorting the discussion list
    pub sorting_available: bool,
    /// Whether the site supports pinning discussions
    pub pin_state_available: bool,
    pub layout: Layout,
}

impl Default for ForumSettings {
    fn default() -> Self {
        Self {
            path_prefix: String::new(),
            sorting_available: true,
            pin_state_available: true,
            layout: Layout::Narrow,
        }
    }
}

impl ForumSettings {
    /// Load settings from the config directory, then apply environment
    /// overrides
    pub fn load() -> Result<Self> {
        let mut settings = if config::config_exists(SETTINGS_FILE) {
            config::load_json(SETTINGS_FILE)?
        } else {
            debug!("No {} found, using default forum settings", SETTINGS_FILE);
            Self::default()
        };
        settings.apply_overrides(|key| std::env::var(key).ok())?;
        Ok(settings)
    }

    /// Load settings from a specific JSON file
    pub fn from_file(path: &Path) -> Result<Self> {
        config::load_json_file(path)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).context("Failed to parse forum settings JSON")
    }

    /// Apply `AGORA_PATH_PREFIX`, `AGORA_LAYOUT`, `AGORA_SORTING` and
    /// `AGORA_PIN_STATE` overrides from `lookup`
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(prefix) = lookup("AGORA_PATH_PREFIX") {
            self.path_prefix = prefix;
        }
        if let Some(layout) = lookup("AGORA_LAYOUT") {
            self.layout = layout.parse()?;
        }
        if let Some(value) = lookup("AGORA_SORTING") {
            self.sorting_available = parse_flag("AGORA_SORTING", &value)?;
        }
        if let Some(value) = lookup("AGORA_PIN_STATE") {
            self.pin_state_available = parse_flag("AGORA_PIN_STATE", &value)?;
        }
        Ok(())
    }

    /// Save the settings to the config directory
    pub fn save(&self) -> Result<()> {
        config::save_json(SETTINGS_FILE, self)
    }
}

fn parse_flag(name: &str, value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" => Ok(true),
        "0" | "false" | "no" => Ok(false),
        other => bail!("{} must be a boolean, got {:?}", name, other),
    }
}
