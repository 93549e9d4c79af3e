use serde::Deserialize;

/// Application configuration
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub generation: GenerationSettings,
    pub logging: LoggingConfig,
}

/// Settings for the generative backend connection.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GenerationSettings {
    pub url: String,
    pub api_key: String,
    pub model: String,
    /// Read timeout in milliseconds. Connect timeout is fixed.
    pub timeout_ms: u64,
    pub max_retries: u32,
    pub temperature: f32,
    pub max_tokens: u32,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self {
            url: "https://api.deepseek.com/v1/chat/completions".to_string(),
            api_key: String::new(),
            model: "deepseek-chat".to_string(),
            timeout_ms: 120_000,
            max_retries: 3,
            temperature: 0.7,
            max_tokens: 2000,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::default(),
        }
    }
}

impl AppConfig {
    pub fn load() -> Result<Self, config::ConfigError> {
        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name("config/local").required(false))
            .add_source(
                config::Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_generation_settings() {
        let settings = GenerationSettings::default();
        assert_eq!(settings.timeout_ms, 120_000);
        assert_eq!(settings.max_retries, 3);
        assert_eq!(settings.temperature, 0.7);
        assert_eq!(settings.max_tokens, 2000);
    }

    #[test]
    fn test_default_logging_config() {
        let config = LoggingConfig::default();
        assert_eq!(config.level, "info");
        assert!(matches!(config.format, LogFormat::Pretty));
    }
}
