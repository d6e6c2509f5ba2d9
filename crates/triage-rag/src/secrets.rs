// Secret resolution: config names a secret, a SecretSource supplies its value

use std::collections::HashMap;

use crate::config::ConfigError;

pub trait SecretSource: Send + Sync {
    /// Value of the named secret; `None` when unset or blank
    fn get(&self, name: &str) -> Option<String>;

    fn require(&self, name: &str) -> Result<String, ConfigError> {
        self.get(name)
            .ok_or_else(|| ConfigError::MissingSecret(name.to_string()))
    }
}

/// Process environment, after loading a `.env` file if one is present
#[derive(Debug, Clone, Default)]
pub struct EnvSecrets;

impl EnvSecrets {
    pub fn load() -> Self {
        dotenvy::dotenv().ok();
        Self
    }
}

impl SecretSource for EnvSecrets {
    fn get(&self, name: &str) -> Option<String> {
        std::env::var(name).ok().filter(|v| !v.trim().is_empty())
    }
}

/// Fixed values, for tests and embedding callers
#[derive(Debug, Clone, Default)]
pub struct StaticSecrets(HashMap<String, String>);

impl StaticSecrets {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.0.insert(name.into(), value.into());
        self
    }
}

impl SecretSource for StaticSecrets {
    fn get(&self, name: &str) -> Option<String> {
        self.0.get(name).filter(|v| !v.trim().is_empty()).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_static_secrets() {
        let secrets = StaticSecrets::new()
            .with("AZURE_OPENAI_API_KEY", "k")
            .with("BLANK", "  ");
        assert_eq!(secrets.require("AZURE_OPENAI_API_KEY").unwrap(), "k");
        assert_eq!(secrets.get("BLANK"), None);
        let err = secrets.require("MISSING").unwrap_err();
        assert_eq!(err.to_string(), "secret MISSING is not set");
    }

    #[test]
    fn test_env_secrets_missing_variable() {
        let secrets = EnvSecrets;
        assert_eq!(secrets.get("TRIAGE_TEST_SECRET_THAT_IS_NEVER_SET"), None);
    }
}
