use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

pub type UserId = String;

#[derive(Clone, Debug, Default, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
pub struct GameId(pub String);

impl GameId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for GameId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Maximum records retained per game; the lowest-ranked tail is evicted
    /// beyond this bound.
    pub retain_bound: usize,
    /// Leaderboard result size when the caller does not pass a limit.
    pub default_limit: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            retain_bound: 100,
            default_limit: 10,
        }
    }
}

impl StoreConfig {
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();
        let retain_bound = parse_env_bound("SCORE_RETAIN_BOUND", defaults.retain_bound)?;
        let default_limit = parse_env_bound("SCORE_DEFAULT_LIMIT", defaults.default_limit)?;

        Ok(Self {
            retain_bound,
            default_limit,
        })
    }
}

fn parse_env_bound(name: &str, fallback: usize) -> Result<usize> {
    let raw = match std::env::var(name) {
        Ok(raw) => raw,
        Err(_) => return Ok(fallback),
    };
    let value = raw
        .trim()
        .parse::<usize>()
        .with_context(|| format!("{name} must be a positive integer, got {raw:?}"))?;
    if value == 0 {
        anyhow::bail!("{name} must be a positive integer, got 0");
    }
    Ok(value)
}
