//! Environment-supplied configuration for the external collaborators.
//!
//! Read once at process startup and injected into the services that need
//! them; missing credentials surface as capability gaps at call time
//! (unconfigured Aha! errors, summarization backends not offered) rather
//! than startup failures.

use secrecy::SecretString;

fn env_non_empty(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Credentials for the Aha! catalog API.
#[derive(Clone)]
pub struct AhaConfig {
    /// Base API URL, e.g. `https://company.aha.io/api/v1`
    pub api_url: String,
    pub api_key: SecretString,
    pub product_id: String,
}

impl AhaConfig {
    /// `None` when any of the three required variables is absent.
    pub fn from_env() -> Option<AhaConfig> {
        Some(AhaConfig {
            api_url: env_non_empty("AHA_API_URL")?,
            api_key: SecretString::from(env_non_empty("AHA_API_KEY")?),
            product_id: env_non_empty("AHA_PRODUCT_ID")?,
        })
    }
}

/// Per-backend credentials for the summarization clients. Each backend is
/// independently keyed; a backend with missing credentials is simply not
/// offered.
#[derive(Clone, Default)]
pub struct SummarizerConfig {
    pub oneadvanced_url: Option<String>,
    pub oneadvanced_key: Option<SecretString>,
    pub gemini_key: Option<SecretString>,
}

impl SummarizerConfig {
    pub fn from_env() -> SummarizerConfig {
        SummarizerConfig {
            oneadvanced_url: env_non_empty("ONEADVANCED_AI_URL"),
            oneadvanced_key: env_non_empty("ONEADVANCED_AI_KEY").map(SecretString::from),
            gemini_key: env_non_empty("GEMINI_API_KEY").map(SecretString::from),
        }
    }
}
