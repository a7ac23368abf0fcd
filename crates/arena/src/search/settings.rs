//! 探索設定ファイル（TOML）
//!
//! ```toml
//! [search]
//! target_param = "MAX_DEPTH"
//! start = 2.0
//! step = 1.0
//! end = 8.0
//! num_games = 50
//!
//! [build]
//! command = "cargo build --release -p engine"
//! artifact = "target/release/engine"
//! output = "target/tune/engine-{param}-{value}"
//! ```
//!
//! コマンドラインで指定した値が常に優先される。

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

use super::BuildSettings;

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SearchSection {
    pub target_param: Option<String>,
    pub engine_params: Option<String>,
    pub start: Option<f64>,
    pub step: Option<f64>,
    pub end: Option<f64>,
    pub num_games: Option<u32>,
    pub arena_path: Option<PathBuf>,
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SearchFile {
    #[serde(default)]
    pub search: SearchSection,
    pub build: Option<BuildSettings>,
}

impl SearchFile {
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("failed to read config: {}", path.display()))?;
        Self::parse(&content).with_context(|| format!("failed to parse config: {}", path.display()))
    }

    pub fn parse(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }
}
