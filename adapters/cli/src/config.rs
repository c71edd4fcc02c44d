use std::{fs, path::Path};

use anyhow::{Context, Result};
use bandits_core::BattleConfig;
use serde::Deserialize;

/// Settings read from the optional TOML configuration file.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct CliConfig {
    /// Safety cap on the number of rounds a battle may take.
    pub max_rounds: Option<u32>,
    /// Unit parameters.
    pub battle: BattleConfig,
}

impl CliConfig {
    /// Reads and parses the file at `path`.
    pub(crate) fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        Self::parse(&text).with_context(|| format!("invalid config file {}", path.display()))
    }

    fn parse(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }
}
