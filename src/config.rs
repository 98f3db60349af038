use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::warn;

use crate::rules::{RuleSet, BANNED_WORD, DEFAULT_YEAR_TOKEN};
use crate::trainer::{HintPolicy, TrainerConfig, DEFAULT_TIME_BUDGET};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub time_budget_secs: u32,
    pub hint_policy: HintPolicy,
    pub year_token: String,
    pub user_id: Option<String>,
    /// Questions put to the safety helper so far.
    pub questions_asked: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            time_budget_secs: DEFAULT_TIME_BUDGET,
            hint_policy: HintPolicy::default(),
            year_token: DEFAULT_YEAR_TOKEN.to_string(),
            user_id: None,
            questions_asked: 0,
        }
    }
}

impl Config {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.time_budget_secs == 0 {
            return Err(ConfigError::Invalid(
                "time_budget_secs must be at least 1".into(),
            ));
        }
        if self.year_token.trim().is_empty() {
            return Err(ConfigError::Invalid("year_token must not be empty".into()));
        }
        // rule 8 would demand what rule 7 forbids
        if self.year_token.to_lowercase().contains(BANNED_WORD) {
            return Err(ConfigError::Invalid(format!(
                "year_token must not contain '{BANNED_WORD}'"
            )));
        }
        Ok(())
    }

    /// Assigns a fresh `user_<uuid>` id if none is set. Returns true if one
    /// was generated.
    pub fn ensure_user_id(&mut self) -> bool {
        if self.user_id.is_some() {
            return false;
        }
        self.user_id = Some(format!("user_{}", uuid::Uuid::new_v4()));
        true
    }

    /// Counts one more question to the helper and returns the total.
    pub fn record_question(&mut self) -> u32 {
        self.questions_asked = self.questions_asked.saturating_add(1);
        self.questions_asked
    }

    pub fn user_id(&self) -> &str {
        self.user_id.as_deref().unwrap_or("anonymous")
    }

    pub fn trainer_config(&self) -> TrainerConfig {
        TrainerConfig {
            time_budget: self.time_budget_secs,
            hint_policy: self.hint_policy,
        }
    }

    pub fn rule_set(&self) -> RuleSet {
        RuleSet::standard(&self.year_token)
    }
}

pub trait ConfigStore {
    fn load(&self) -> Config;
    fn save(&self, cfg: &Config) -> Result<(), ConfigError>;
}

#[derive(Debug, Clone)]
pub struct FileConfigStore {
    path: PathBuf,
}

impl FileConfigStore {
    #[allow(clippy::new_without_default)]
    pub fn new() -> Self {
        let path = if let Some(pd) = ProjectDirs::from("", "", "passfort") {
            pd.config_dir().join("config.json")
        } else {
            PathBuf::from("passfort_config.json")
        };
        Self { path }
    }

    pub fn with_path<P: AsRef<Path>>(p: P) -> Self {
        Self {
            path: p.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Default for FileConfigStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigStore for FileConfigStore {
    /// Missing, unreadable or invalid files yield the defaults.
    fn load(&self) -> Config {
        let Ok(bytes) = fs::read(&self.path) else {
            return Config::default();
        };
        let parsed = serde_json::from_slice::<Config>(&bytes)
            .map_err(ConfigError::from)
            .and_then(|cfg| cfg.validate().map(|()| cfg));
        match parsed {
            Ok(cfg) => cfg,
            Err(e) => {
                warn!(error = %e, path = %self.path.display(), "ignoring config file");
                Config::default()
            }
        }
    }

    fn save(&self, cfg: &Config) -> Result<(), ConfigError> {
        cfg.validate()?;
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let data = serde_json::to_vec_pretty(cfg)?;
        fs::write(&self.path, data)?;
        Ok(())
    }
}
