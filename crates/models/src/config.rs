use chrono::Duration;
use serde::Deserialize;

use crate::db::Config as DbConfig;

#[derive(Clone, Debug, Deserialize)]
pub struct Config {
    pub database: Option<DbConfig>,
    #[serde(default)]
    pub chapters: ChapterConfig,
}

/// Chapter publishing configuration.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ChapterConfig {
    /// For how long after going live a chapter is still listed among its
    /// author's drafts.
    #[serde(default = "default_draft_grace")]
    pub draft_grace_minutes: i64,
}

impl ChapterConfig {
    pub fn draft_grace(&self) -> Duration {
        Duration::minutes(self.draft_grace_minutes)
    }
}

fn default_draft_grace() -> i64 {
    60
}

impl Default for ChapterConfig {
    fn default() -> Self {
        ChapterConfig {
            draft_grace_minutes: default_draft_grace(),
        }
    }
}
