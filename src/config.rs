use anyhow::Result;
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};

/// Application configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub discovery: DiscoveryConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DiscoveryConfig {
    pub functions_url: String,
    pub match_function: String,
    pub invite_function: String,
    pub request_timeout_secs: u64,
    pub auth_token: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub file_path: Option<String>,
    pub format: String, // "json" or "text"
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            functions_url: "http://localhost:5001/functions".to_string(),
            match_function: "matchContacts".to_string(),
            invite_function: "sendInvite".to_string(),
            request_timeout_secs: 30,
            auth_token: None,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file_path: None,
            format: "text".to_string(),
        }
    }
}

impl AppConfig {
    /// Load configuration from multiple sources with precedence
    pub fn load() -> Result<Self> {
        Self::load_from(&["config/default", "config/local"])
    }

    /// Load configuration layering the given files (extension optional) over
    /// the defaults, then `CONTACT_DISCOVERY__SECTION__KEY` variables on top
    pub fn load_from(files: &[&str]) -> Result<Self> {
        let mut builder = Config::builder();

        for (key, value) in Self::default().into_iter() {
            builder = builder
                .set_default(key.as_str(), value)
                .map_err(|e| anyhow::anyhow!("Failed to set default {}: {}", key, e))?;
        }

        for file in files {
            builder = builder.add_source(File::with_name(file).required(false));
        }

        let config = builder
            .add_source(
                Environment::with_prefix("CONTACT_DISCOVERY")
                    .prefix_separator("__")
                    .separator("__"),
            )
            .build()
            .map_err(|e| anyhow::anyhow!("Failed to load configuration: {}", e))?;

        let app_config: Self = config
            .try_deserialize()
            .map_err(|e| anyhow::anyhow!("Failed to deserialize configuration: {}", e))?;

        // Validate configuration
        app_config.validate()?;

        Ok(app_config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if self.discovery.functions_url.trim().is_empty() {
            return Err(anyhow::anyhow!("functions_url cannot be empty"));
        }
        if !self.discovery.functions_url.starts_with("http://")
            && !self.discovery.functions_url.starts_with("https://")
        {
            return Err(anyhow::anyhow!(
                "functions_url must be an http(s) URL: {}",
                self.discovery.functions_url
            ));
        }
        if self.discovery.match_function.trim().is_empty()
            || self.discovery.invite_function.trim().is_empty()
        {
            return Err(anyhow::anyhow!("function names cannot be empty"));
        }
        if self.discovery.request_timeout_secs == 0 {
            return Err(anyhow::anyhow!("request_timeout_secs must be greater than 0"));
        }

        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.as_str()) {
            return Err(anyhow::anyhow!(
                "Invalid log level: {}. Must be one of: {:?}",
                self.logging.level,
                valid_levels
            ));
        }

        let valid_formats = ["text", "json"];
        if !valid_formats.contains(&self.logging.format.as_str()) {
            return Err(anyhow::anyhow!(
                "Invalid log format: {}. Must be one of: {:?}",
                self.logging.format,
                valid_formats
            ));
        }

        Ok(())
    }

    /// Get log level from environment or config
    pub fn get_log_level(&self) -> String {
        std::env::var("RUST_LOG").unwrap_or_else(|_| self.logging.level.clone())
    }
}

impl IntoIterator for AppConfig {
    type Item = (String, config::Value);
    type IntoIter = std::collections::hash_map::IntoIter<String, config::Value>;

    fn into_iter(self) -> Self::IntoIter {
        let mut map = std::collections::HashMap::new();

        // Flatten the configuration into key-value pairs
        map.insert("discovery.functions_url".to_string(), config::Value::from(self.discovery.functions_url));
        map.insert("discovery.match_function".to_string(), config::Value::from(self.discovery.match_function));
        map.insert("discovery.invite_function".to_string(), config::Value::from(self.discovery.invite_function));
        map.insert("discovery.request_timeout_secs".to_string(), config::Value::from(self.discovery.request_timeout_secs));
        if let Some(token) = self.discovery.auth_token {
            map.insert("discovery.auth_token".to_string(), config::Value::from(token));
        }

        map.insert("logging.level".to_string(), config::Value::from(self.logging.level));
        if let Some(file_path) = self.logging.file_path {
            map.insert("logging.file_path".to_string(), config::Value::from(file_path));
        }
        map.insert("logging.format".to_string(), config::Value::from(self.logging.format));

        map.into_iter()
    }
}
