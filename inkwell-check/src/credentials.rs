//! Where the generative-service key comes from.

/// Supplies the generative-service API key.
pub trait CredentialProvider: Send + Sync {
    /// The key, or `None` when no credential is configured.
    fn api_key(&self) -> Option<String>;
}

/// Reads the key from an environment variable.
#[derive(Debug, Clone)]
pub struct EnvCredentials {
    var: String,
}

impl EnvCredentials {
    /// Read from `var` (e.g. `OPENAI_API_KEY`).
    #[must_use]
    pub fn new(var: impl Into<String>) -> Self {
        Self { var: var.into() }
    }

    /// Name of the variable consulted.
    #[must_use]
    pub fn var(&self) -> &str {
        &self.var
    }
}

impl CredentialProvider for EnvCredentials {
    fn api_key(&self) -> Option<String> {
        std::env::var(&self.var)
            .ok()
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty())
    }
}

/// A fixed key, or none.
#[derive(Clone, Default)]
pub struct StaticCredentials(Option<String>);

impl StaticCredentials {
    /// A provider that always returns `key`.
    #[must_use]
    pub fn new(key: impl Into<String>) -> Self {
        Self(Some(key.into()))
    }

    /// A provider with no credential.
    #[must_use]
    pub fn none() -> Self {
        Self(None)
    }
}

impl std::fmt::Debug for StaticCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let shown = self.0.as_ref().map(|_| "<redacted>");
        f.debug_tuple("StaticCredentials").field(&shown).finish()
    }
}

impl CredentialProvider for StaticCredentials {
    fn api_key(&self) -> Option<String> {
        self.0.clone().filter(|k| !k.trim().is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn static_credentials() {
        assert_eq!(StaticCredentials::new("sk-1").api_key().as_deref(), Some("sk-1"));
        assert!(StaticCredentials::none().api_key().is_none());
        assert!(StaticCredentials::new("   ").api_key().is_none());
        assert!(!format!("{:?}", StaticCredentials::new("sk-1")).contains("sk-1"));
    }

    #[test]
    fn env_credentials_missing_var() {
        let creds = EnvCredentials::new("INKWELL_TEST_SURELY_UNSET_KEY_VAR");
        assert!(creds.api_key().is_none());
    }
}
