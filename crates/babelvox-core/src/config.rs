//! Configuration loading and validation.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Port the webhook server listens on when nothing else is configured.
pub const DEFAULT_PORT: u16 = 5000;

/// Verify token accepted when none is configured.
///
/// Meta's dashboard has to be set to this literal in that case, so startup
/// logs a warning whenever it is in effect.
pub const LEGACY_VERIFY_TOKEN: &str = "your_verify_token_here";

/// Top-level Babelvox configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub openai: Option<OpenAiConfig>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub media: Option<MediaConfig>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub channels: Option<ChannelsConfig>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub gateway: Option<GatewayConfig>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub logging: Option<LoggingConfig>,
}

// --- AI services ---

/// OpenAI-compatible endpoint used for transcription, translation and speech.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OpenAiConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key_env: Option<String>,

    pub base_url: String,

    /// Speech-to-text model (e.g. "whisper-1").
    pub transcription_model: String,

    /// Chat model used for translation.
    pub chat_model: String,

    /// Text-to-speech model.
    pub tts_model: String,

    /// Default voice ID.
    pub voice: String,

    /// Audio format requested from the speech endpoint (default: "mp3").
    pub response_format: String,
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            api_key_env: Some("OPENAI_API_KEY".into()),
            base_url: "https://api.openai.com".into(),
            transcription_model: "whisper-1".into(),
            chat_model: "gpt-4o-mini".into(),
            tts_model: "gpt-4o-mini-tts".into(),
            voice: "alloy".into(),
            response_format: "mp3".into(),
        }
    }
}

impl OpenAiConfig {
    /// Resolve the API key: check `api_key` field first, then `api_key_env` environment variable.
    pub fn resolve_api_key(&self) -> Option<String> {
        resolve_secret_field(&self.api_key, &self.api_key_env)
    }
}

/// Local audio conversion settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MediaConfig {
    /// Path to the ffmpeg binary used to normalize inbound audio.
    pub ffmpeg_path: String,
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            ffmpeg_path: "ffmpeg".into(),
        }
    }
}

// --- Typed channel configs ---

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChannelsConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub whatsapp: Option<WhatsAppConfig>,
}

/// WhatsApp Business Cloud API configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WhatsAppConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone_number_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone_number_id_env: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub access_token_env: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verify_token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verify_token_env: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub app_secret: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub app_secret_env: Option<String>,
    /// Graph API version segment (default: "v17.0").
    pub api_version: String,
    pub graph_base_url: String,
}

impl Default for WhatsAppConfig {
    fn default() -> Self {
        Self {
            phone_number_id: None,
            phone_number_id_env: Some("WHATSAPP_PHONE_NUMBER_ID".into()),
            access_token: None,
            access_token_env: Some("WHATSAPP_TOKEN".into()),
            verify_token: None,
            verify_token_env: Some("WHATSAPP_VERIFY_TOKEN".into()),
            app_secret: None,
            app_secret_env: None,
            api_version: "v17.0".into(),
            graph_base_url: "https://graph.facebook.com".into(),
        }
    }
}

impl WhatsAppConfig {
    pub fn resolve_phone_number_id(&self) -> Option<String> {
        resolve_secret_field(&self.phone_number_id, &self.phone_number_id_env)
    }
    pub fn resolve_access_token(&self) -> Option<String> {
        resolve_secret_field(&self.access_token, &self.access_token_env)
    }
    pub fn resolve_app_secret(&self) -> Option<String> {
        resolve_secret_field(&self.app_secret, &self.app_secret_env)
    }

    /// The configured verify token, or [`LEGACY_VERIFY_TOKEN`].
    pub fn resolve_verify_token(&self) -> String {
        resolve_secret_field(&self.verify_token, &self.verify_token_env)
            .unwrap_or_else(|| LEGACY_VERIFY_TOKEN.to_string())
    }

    pub fn uses_legacy_verify_token(&self) -> bool {
        resolve_secret_field(&self.verify_token, &self.verify_token_env).is_none()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub bind: Option<String>,
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log format: "plain" (default) or "json".
    #[serde(default = "default_log_format")]
    pub format: String,

    /// Log level override (trace/debug/info/warn/error).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub level: Option<String>,

    /// Per-crate log level overrides (e.g. "babelvox_gateway=debug").
    #[serde(default)]
    pub filters: Vec<String>,

    /// Output target: "stderr" (default) or "stdout".
    #[serde(default = "default_log_output")]
    pub output: String,
}

fn default_log_format() -> String {
    "plain".into()
}

fn default_log_output() -> String {
    "stderr".into()
}

/// Resolve a secret: check the direct value first, then the env-var reference.
pub fn resolve_secret_field(direct: &Option<String>, env_var: &Option<String>) -> Option<String> {
    if let Some(val) = direct {
        if !val.is_empty() {
            return Some(val.clone());
        }
    }
    if let Some(env) = env_var {
        if let Ok(val) = std::env::var(env) {
            if !val.is_empty() {
                return Some(val);
            }
        }
    }
    None
}

/// Port from the `PORT` environment variable, if set and valid.
pub fn port_from_env() -> Option<u16> {
    std::env::var("PORT").ok().and_then(|p| p.trim().parse().ok())
}

/// Substitute `${ENV_VAR}` patterns in a string with their environment variable values.
fn substitute_env_vars(input: &str) -> String {
    let re = regex::Regex::new(r"\$\{([^}]+)\}").expect("static regex");
    re.replace_all(input, |caps: &regex::Captures| {
        let var_name = &caps[1];
        std::env::var(var_name).unwrap_or_default()
    })
    .into_owned()
}

impl Config {
    /// Load config from a JSON5 file, substituting `${ENV_VAR}` references.
    pub fn load(path: &Path) -> crate::error::Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let raw = std::fs::read_to_string(path).map_err(crate::error::BabelvoxError::Io)?;

        // Substitute ${ENV_VAR} references before parsing
        let substituted = substitute_env_vars(&raw);

        let config: Config = json5::from_str(&substituted)
            .map_err(|e| crate::error::BabelvoxError::Config(e.to_string()))?;

        Ok(config)
    }

    /// Resolve the default config file path.
    pub fn config_dir() -> PathBuf {
        data_dir().join("config.json")
    }

    pub fn openai(&self) -> OpenAiConfig {
        self.openai.clone().unwrap_or_default()
    }

    pub fn media(&self) -> MediaConfig {
        self.media.clone().unwrap_or_default()
    }

    pub fn whatsapp(&self) -> WhatsAppConfig {
        self.channels
            .as_ref()
            .and_then(|c| c.whatsapp.clone())
            .unwrap_or_default()
    }

    pub fn gateway_port(&self) -> u16 {
        self.gateway
            .as_ref()
            .map(|g| g.port)
            .unwrap_or(DEFAULT_PORT)
    }

    pub fn bind_addr(&self) -> String {
        self.gateway
            .as_ref()
            .and_then(|g| g.bind.clone())
            .unwrap_or_else(|| "0.0.0.0".to_string())
    }

    /// Validate config, returning (warnings, errors).
    pub fn validate(&self) -> (Vec<String>, Vec<String>) {
        let mut warnings = Vec::new();
        let mut errors = Vec::new();

        if self.openai().resolve_api_key().is_none() {
            warnings.push("OpenAI API key is not configured".to_string());
        }

        let whatsapp = self.whatsapp();
        if whatsapp.resolve_access_token().is_none() {
            warnings.push("WhatsApp access token is not configured".to_string());
        }
        if whatsapp.resolve_phone_number_id().is_none() {
            warnings.push("WhatsApp phone number id is not configured".to_string());
        }
        if whatsapp.uses_legacy_verify_token() {
            warnings.push(format!(
                "WhatsApp verify token is not configured, falling back to '{LEGACY_VERIFY_TOKEN}'"
            ));
        }

        if let Some(gw) = &self.gateway {
            if gw.port == 0 {
                errors.push("Gateway port cannot be 0".to_string());
            }
        }

        (warnings, errors)
    }
}

/// Base directory for Babelvox data: `~/.babelvox/`
pub fn data_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".babelvox")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_env_var_substitution() {
        // SAFETY: test-only, unique variable name
        unsafe { std::env::set_var("TEST_BV_KEY", "sk-test-123") };
        let input = r#"{"key": "${TEST_BV_KEY}", "other": "plain"}"#;
        let result = substitute_env_vars(input);
        assert!(result.contains("sk-test-123"));
        assert!(result.contains("plain"));
        unsafe { std::env::remove_var("TEST_BV_KEY") };
    }

    #[test]
    fn test_env_var_missing() {
        let input = r#"{"key": "${NONEXISTENT_VAR_BV_TEST}"}"#;
        let result = substitute_env_vars(input);
        assert!(result.contains(r#""""#));
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.gateway_port(), 5000);
        assert_eq!(config.bind_addr(), "0.0.0.0");

        let openai = config.openai();
        assert_eq!(openai.transcription_model, "whisper-1");
        assert_eq!(openai.chat_model, "gpt-4o-mini");
        assert_eq!(openai.tts_model, "gpt-4o-mini-tts");
        assert_eq!(openai.voice, "alloy");
        assert_eq!(openai.api_key_env.as_deref(), Some("OPENAI_API_KEY"));

        let whatsapp = config.whatsapp();
        assert_eq!(whatsapp.api_version, "v17.0");
        assert_eq!(whatsapp.access_token_env.as_deref(), Some("WHATSAPP_TOKEN"));
        assert_eq!(config.media().ffmpeg_path, "ffmpeg");
    }

    #[test]
    fn test_openai_resolve_api_key() {
        // SAFETY: test-only, unique variable name
        unsafe { std::env::set_var("TEST_BV_API_KEY", "from-env") };
        let openai = OpenAiConfig {
            api_key_env: Some("TEST_BV_API_KEY".into()),
            ..OpenAiConfig::default()
        };
        assert_eq!(openai.resolve_api_key(), Some("from-env".into()));

        let direct = OpenAiConfig {
            api_key: Some("direct-key".into()),
            api_key_env: Some("TEST_BV_API_KEY".into()),
            ..OpenAiConfig::default()
        };
        // Direct key takes priority
        assert_eq!(direct.resolve_api_key(), Some("direct-key".into()));
        unsafe { std::env::remove_var("TEST_BV_API_KEY") };
    }

    #[test]
    fn test_verify_token_falls_back_to_legacy() {
        let whatsapp = WhatsAppConfig {
            verify_token_env: Some("NONEXISTENT_BV_VERIFY".into()),
            ..WhatsAppConfig::default()
        };
        assert!(whatsapp.uses_legacy_verify_token());
        assert_eq!(whatsapp.resolve_verify_token(), LEGACY_VERIFY_TOKEN);

        let configured = WhatsAppConfig {
            verify_token: Some("s3cret".into()),
            ..WhatsAppConfig::default()
        };
        assert!(!configured.uses_legacy_verify_token());
        assert_eq!(configured.resolve_verify_token(), "s3cret");
    }

    #[test]
    fn test_partial_whatsapp_config_keeps_defaults() {
        let json_str = r#"{
            channels: { whatsapp: { phone_number_id: "123", verify_token: "vt" } },
        }"#;
        let config: Config = json5::from_str(json_str).unwrap();
        let whatsapp = config.whatsapp();
        assert_eq!(whatsapp.resolve_phone_number_id(), Some("123".into()));
        assert_eq!(whatsapp.api_version, "v17.0");
        assert_eq!(whatsapp.graph_base_url, "https://graph.facebook.com");
    }

    #[test]
    fn test_logging_config_defaults() {
        let json_str = r#"{ "logging": {} }"#;
        let config: Config = json5::from_str(json_str).unwrap();
        let logging = config.logging.expect("logging should be present");
        assert_eq!(logging.format, "plain");
        assert!(logging.level.is_none());
        assert_eq!(logging.output, "stderr");
        assert!(logging.filters.is_empty());
    }

    #[test]
    fn test_load_missing_file_is_default() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load(&dir.path().join("absent.json")).unwrap();
        assert!(config.gateway.is_none());
        assert_eq!(config.gateway_port(), DEFAULT_PORT);
    }

    #[test]
    fn test_load_file_with_substitution() {
        // SAFETY: test-only, unique variable name
        unsafe { std::env::set_var("TEST_BV_PORT_TOKEN", "tok-42") };
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(
            &path,
            r#"{
                // comments are fine in JSON5
                gateway: { port: 8080 },
                channels: { whatsapp: { access_token: "${TEST_BV_PORT_TOKEN}" } },
            }"#,
        )
        .unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.gateway_port(), 8080);
        assert_eq!(
            config.whatsapp().resolve_access_token(),
            Some("tok-42".into())
        );
        unsafe { std::env::remove_var("TEST_BV_PORT_TOKEN") };
    }

    #[test]
    fn test_load_invalid_file_is_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "{ gateway: ").unwrap();
        let err = Config::load(&path).unwrap_err();
        assert!(matches!(err, crate::error::BabelvoxError::Config(_)));
    }

    #[test]
    fn test_load_unreadable_path_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        // A directory exists but cannot be read as a file.
        let err = Config::load(dir.path()).unwrap_err();
        assert!(matches!(err, crate::error::BabelvoxError::Io(_)));
        assert!(err.to_string().starts_with("IO error"));
    }

    #[test]
    fn test_validate_port_zero_errors() {
        let config = Config {
            gateway: Some(GatewayConfig {
                port: 0,
                bind: None,
            }),
            ..Config::default()
        };
        let (_warnings, errors) = config.validate();
        assert!(
            errors.iter().any(|e| e.contains("port")),
            "Expected a port error, got: {errors:?}"
        );
    }

    #[test]
    fn test_validate_missing_secrets_warns() {
        let config = Config {
            openai: Some(OpenAiConfig {
                api_key_env: Some("NONEXISTENT_BV_OPENAI".into()),
                ..OpenAiConfig::default()
            }),
            channels: Some(ChannelsConfig {
                whatsapp: Some(WhatsAppConfig {
                    access_token_env: Some("NONEXISTENT_BV_TOKEN".into()),
                    phone_number_id_env: Some("NONEXISTENT_BV_PHONE".into()),
                    verify_token_env: Some("NONEXISTENT_BV_VERIFY".into()),
                    ..WhatsAppConfig::default()
                }),
            }),
            ..Config::default()
        };
        let (warnings, errors) = config.validate();
        assert!(errors.is_empty());
        assert!(warnings.iter().any(|w| w.contains("OpenAI")));
        assert!(warnings.iter().any(|w| w.contains("access token")));
        assert!(warnings.iter().any(|w| w.contains("phone number id")));
        assert!(warnings.iter().any(|w| w.contains("verify token")));
    }
}
