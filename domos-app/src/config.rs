//! Domos configuration loader.
//!
//! TOML file first, then environment overrides. The resulting value is handed to the
//! constructors that need it; nothing below `main` reads the environment.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DomosConfig {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub keys: KeysConfig,
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub mailbox: MailboxConfig,
    #[serde(default)]
    pub sender: SenderConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub tenants: TenantsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    #[serde(default = "default_model")]
    pub model: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            model: default_model(),
        }
    }
}

fn default_model() -> String {
    domos_llm::DEFAULT_MODEL.to_string()
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct KeysConfig {
    pub together_api_key: Option<String>,
    pub openai_api_key: Option<String>,
    pub anthropic_api_key: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Chat endpoint override. Unset means the provider default for the model.
    #[serde(default)]
    pub endpoint: Option<String>,
    #[serde(default = "default_max_tokens")]
    pub reply_max_tokens: u32,
    #[serde(default = "default_reply_temperature")]
    pub reply_temperature: f32,
    #[serde(default = "default_max_tokens")]
    pub classify_max_tokens: u32,
    #[serde(default = "default_classify_temperature")]
    pub classify_temperature: f32,
}

fn default_max_tokens() -> u32 {
    256
}

fn default_reply_temperature() -> f32 {
    0.7
}

fn default_classify_temperature() -> f32 {
    0.4
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            reply_max_tokens: default_max_tokens(),
            reply_temperature: default_reply_temperature(),
            classify_max_tokens: default_max_tokens(),
            classify_temperature: default_classify_temperature(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MailboxConfig {
    #[serde(default)]
    pub gmail_access_token: String,
    #[serde(default = "default_query")]
    pub query: String,
    /// Cap on messages handled per run. Unset means all unread.
    #[serde(default)]
    pub max_messages: Option<usize>,
    #[serde(default = "default_true")]
    pub mark_processed_as_read: bool,
}

fn default_query() -> String {
    "in:inbox is:unread".to_string()
}

fn default_true() -> bool {
    true
}

impl Default for MailboxConfig {
    fn default() -> Self {
        Self {
            gmail_access_token: String::new(),
            query: default_query(),
            max_messages: None,
            mark_processed_as_read: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SenderConfig {
    /// `From` address on replies; empty lets the provider fill in the account address.
    #[serde(default)]
    pub from_address: String,
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,
    #[serde(default = "default_failure_log_path")]
    pub failure_log_path: PathBuf,
}

fn default_max_attempts() -> u32 {
    3
}

fn default_retry_delay_ms() -> u64 {
    2000
}

fn default_failure_log_path() -> PathBuf {
    PathBuf::from("output").join("send_failures.log")
}

impl Default for SenderConfig {
    fn default() -> Self {
        Self {
            from_address: String::new(),
            max_attempts: default_max_attempts(),
            retry_delay_ms: default_retry_delay_ms(),
            failure_log_path: default_failure_log_path(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_action_items_path")]
    pub action_items_path: PathBuf,
}

fn default_action_items_path() -> PathBuf {
    PathBuf::from("output").join("action_items.json")
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            action_items_path: default_action_items_path(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TenantsConfig {
    /// JSON object of address -> tenant record. Unset uses the built-in sample tenants.
    #[serde(default)]
    pub path: Option<PathBuf>,
}

impl DomosConfig {
    /// An explicit `path` must exist; the default location may be absent.
    pub async fn load(path: Option<PathBuf>) -> anyhow::Result<Self> {
        let explicit = path.is_some();
        let path = path.unwrap_or_else(default_config_path);

        let mut cfg = match tokio::fs::read_to_string(&path).await {
            Ok(contents) => Self::parse(&contents)
                .map_err(|e| anyhow::anyhow!("parse config {}: {e}", path.display()))?,
            Err(e) if !explicit && e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!(path = %path.display(), "no config file; using defaults");
                Self::default()
            }
            Err(e) => return Err(anyhow::anyhow!("read config {}: {e}", path.display())),
        };

        cfg.apply_env_overrides(|key| std::env::var(key).ok());
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn parse(contents: &str) -> anyhow::Result<Self> {
        Ok(toml::from_str(contents)?)
    }

    fn apply_env_overrides(&mut self, var: impl Fn(&str) -> Option<String>) {
        let get = |key: &str| var(key).filter(|v| !v.trim().is_empty());

        if let Some(v) = get("DOMOS_MODEL") {
            self.general.model = v;
        }
        if let Some(v) = get("TOGETHER_API_KEY") {
            self.keys.together_api_key = Some(v);
        }
        if let Some(v) = get("OPENAI_API_KEY") {
            self.keys.openai_api_key = Some(v);
        }
        if let Some(v) = get("ANTHROPIC_API_KEY") {
            self.keys.anthropic_api_key = Some(v);
        }
        if let Some(v) = get("DOMOS_LLM_ENDPOINT") {
            self.llm.endpoint = Some(v);
        }
        if let Some(v) = get("GMAIL_ACCESS_TOKEN") {
            self.mailbox.gmail_access_token = v;
        }
        if let Some(v) = get("EMAIL_ADDRESS") {
            self.sender.from_address = v;
        }
        if let Some(v) = get("DOMOS_ACTION_ITEMS_PATH") {
            self.storage.action_items_path = PathBuf::from(v);
        }
        if let Some(v) = get("DOMOS_SEND_FAILURES_PATH") {
            self.sender.failure_log_path = PathBuf::from(v);
        }
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.general.model.trim().is_empty() {
            return Err(anyhow::anyhow!("general.model is required"));
        }
        if self.sender.max_attempts == 0 {
            return Err(anyhow::anyhow!("sender.max_attempts must be > 0"));
        }
        for (name, value) in [
            ("llm.reply_temperature", self.llm.reply_temperature),
            ("llm.classify_temperature", self.llm.classify_temperature),
        ] {
            if !(0.0..=2.0).contains(&value) {
                return Err(anyhow::anyhow!("{name} must be within 0.0..=2.0"));
            }
        }
        if self.mailbox.max_messages == Some(0) {
            return Err(anyhow::anyhow!("mailbox.max_messages must be > 0 when set"));
        }
        Ok(())
    }

    /// Only needed by commands that touch the mailbox.
    pub fn require_mailbox(&self) -> anyhow::Result<&str> {
        let token = self.mailbox.gmail_access_token.trim();
        if token.is_empty() {
            return Err(anyhow::anyhow!(
                "mailbox.gmail_access_token (or GMAIL_ACCESS_TOKEN) is required"
            ));
        }
        Ok(token)
    }

    pub fn api_key_for_model(&self) -> Option<String> {
        let model = self.general.model.to_ascii_lowercase();
        let non_empty = |key: &Option<String>| key.clone().filter(|s| !s.trim().is_empty());
        if model.starts_with("claude-") {
            return non_empty(&self.keys.anthropic_api_key);
        }
        let targets_openai = self
            .llm
            .endpoint
            .as_deref()
            .is_some_and(|e| e.contains("api.openai.com"));
        if targets_openai {
            return non_empty(&self.keys.openai_api_key);
        }
        non_empty(&self.keys.together_api_key).or_else(|| non_empty(&self.keys.openai_api_key))
    }
}

pub fn default_config_path() -> PathBuf {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    Path::new(&home).join(".domos").join("config.toml")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn empty_file_yields_defaults() {
        let cfg = DomosConfig::parse("").expect("parse");
        assert_eq!(cfg.general.model, domos_llm::DEFAULT_MODEL);
        assert_eq!(cfg.sender.max_attempts, 3);
        assert_eq!(cfg.sender.retry_delay_ms, 2000);
        assert_eq!(
            cfg.sender.failure_log_path,
            PathBuf::from("output/send_failures.log")
        );
        assert_eq!(
            cfg.storage.action_items_path,
            PathBuf::from("output/action_items.json")
        );
        assert_eq!(cfg.mailbox.query, "in:inbox is:unread");
        assert!(cfg.mailbox.mark_processed_as_read);
        assert!((cfg.llm.classify_temperature - 0.4).abs() < f32::EPSILON);
        cfg.validate().expect("defaults are valid");
    }

    #[test]
    fn file_values_are_read() {
        let cfg = DomosConfig::parse(
            r#"
            [general]
            model = "claude-3-5-haiku-latest"

            [keys]
            anthropic_api_key = "sk-ant"

            [mailbox]
            gmail_access_token = "ya29"
            max_messages = 5
            mark_processed_as_read = false

            [sender]
            from_address = "pm@example.com"
            max_attempts = 5
            "#,
        )
        .expect("parse");

        assert_eq!(cfg.api_key_for_model().as_deref(), Some("sk-ant"));
        assert_eq!(cfg.require_mailbox().expect("token"), "ya29");
        assert_eq!(cfg.mailbox.max_messages, Some(5));
        assert!(!cfg.mailbox.mark_processed_as_read);
        assert_eq!(cfg.sender.max_attempts, 5);
        assert_eq!(cfg.sender.from_address, "pm@example.com");
    }

    #[test]
    fn env_overrides_win_and_blank_values_are_ignored() {
        let env: HashMap<&str, &str> = HashMap::from([
            ("TOGETHER_API_KEY", "tg-key"),
            ("GMAIL_ACCESS_TOKEN", "ya29-env"),
            ("DOMOS_MODEL", "   "),
            ("DOMOS_ACTION_ITEMS_PATH", "/tmp/items.json"),
        ]);
        let mut cfg = DomosConfig::default();
        cfg.apply_env_overrides(|key| env.get(key).map(|v| v.to_string()));

        assert_eq!(cfg.general.model, domos_llm::DEFAULT_MODEL);
        assert_eq!(cfg.api_key_for_model().as_deref(), Some("tg-key"));
        assert_eq!(cfg.mailbox.gmail_access_token, "ya29-env");
        assert_eq!(cfg.storage.action_items_path, PathBuf::from("/tmp/items.json"));
    }

    #[test]
    fn openai_endpoint_selects_openai_key() {
        let mut cfg = DomosConfig::default();
        cfg.keys.together_api_key = Some("tg".to_string());
        cfg.keys.openai_api_key = Some("oa".to_string());
        assert_eq!(cfg.api_key_for_model().as_deref(), Some("tg"));

        cfg.llm.endpoint = Some("https://api.openai.com/v1/chat/completions".to_string());
        assert_eq!(cfg.api_key_for_model().as_deref(), Some("oa"));
    }

    #[test]
    fn invalid_values_are_rejected() {
        let mut cfg = DomosConfig::default();
        cfg.sender.max_attempts = 0;
        assert!(cfg.validate().is_err());

        let mut cfg = DomosConfig::default();
        cfg.llm.reply_temperature = 3.5;
        assert!(cfg.validate().is_err());

        let cfg = DomosConfig::default();
        assert!(cfg.require_mailbox().is_err());
    }

    #[tokio::test]
    async fn explicit_missing_path_is_an_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let err = DomosConfig::load(Some(dir.path().join("nope.toml")))
            .await
            .expect_err("missing explicit config");
        assert!(err.to_string().contains("read config"));
    }
}
