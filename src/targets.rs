//! The registry of monitored services.

use serde::{Deserialize, Serialize};

/// A remote service whose health endpoint is probed on every cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Target {
    pub name: String,
    pub url: String,
    #[serde(default)]
    pub description: String,
    /// Environment variable that, when set, replaces `url` at startup.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url_env: Option<String>,
}

impl Target {
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
            description: String::new(),
            url_env: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    fn with_url_env(mut self, var: &str) -> Self {
        self.url_env = Some(var.to_string());
        self
    }
}

/// Return the out-of-box target registry.
pub fn defaults() -> Vec<Target> {
    vec![
        Target::new("Dream Sense Bot", "https://dream-sense-bot.railway.app/health")
            .with_description("Dream Sense Bot on Railway")
            .with_url_env("DREAM_SENSE_BOT_URL"),
        Target::new(
            "Dream Sense Test Bot",
            "https://dream-sense-test-bot.railway.app/health",
        )
        .with_description("Dream Sense Test Bot on Railway")
        .with_url_env("DREAM_SENSE_TEST_BOT_URL"),
        Target::new("Valiant Grace Bot", "https://valiant-grace.railway.app/health")
            .with_description("Valiant Grace Bot on Railway")
            .with_url_env("VALIANT_GRACE_BOT_URL"),
    ]
}
