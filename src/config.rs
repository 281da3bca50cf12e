//! Configuration resolution for the model gateway
//!
//! Everything is read from environment variables. `.env` and `.env.local` in the
//! working directory are layered underneath the process environment, so a real
//! environment variable always wins.

use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use thiserror::Error;
use url::Url;

/// Default OpenAI-compatible endpoint (OpenRouter)
pub const DEFAULT_BASE_URL: &str = "https://openrouter.ai/api/v1";
/// Domain whose endpoints accept the legacy key and the referrer/title headers
const DEFAULT_PROVIDER_DOMAIN: &str = "openrouter.ai";
/// Shared default model; must be able to read and produce images
pub const DEFAULT_IMAGE_MODEL: &str = "google/gemini-2.5-flash-image";

const DEFAULT_SITE_URL: &str = "http://localhost:3000";
const DEFAULT_SITE_TITLE: &str = "Soft Furnish AI";

pub const ENV_API_KEY: &str = "LLM_API_KEY";
pub const ENV_LEGACY_API_KEY: &str = "OPENROUTER_API_KEY";
pub const ENV_BASE_URL: &str = "LLM_BASE_URL";
pub const ENV_SITE_URL: &str = "OPENROUTER_SITE_URL";
pub const ENV_SITE_TITLE: &str = "OPENROUTER_SITE_TITLE";
pub const ENV_IMAGE_MODEL: &str = "LLM_IMAGE_MODEL";
pub const ENV_GENERATE_MODEL: &str = "LLM_GENERATE_MODEL";
pub const ENV_EXTRACT_MODEL: &str = "LLM_EXTRACT_MODEL";
pub const ENV_TEXT_MODEL: &str = "LLM_TEXT_MODEL";

/// Dotenv files read at startup, lowest precedence first.
const DOTENV_FILES: [&str; 2] = [".env", ".env.local"];

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigurationError {
    #[error("missing LLM_API_KEY (or OPENROUTER_API_KEY); set it in the environment or .env.local")]
    MissingApiKey,
    #[error(
        "LLM_BASE_URL is set to {base_url} but LLM_API_KEY is missing; \
         OPENROUTER_API_KEY is only used for openrouter.ai"
    )]
    MissingApiKeyForCustomBase { base_url: String },
    #[error("invalid LLM_BASE_URL `{value}`: {reason}")]
    InvalidBaseUrl { value: String, reason: String },
}

/// Snapshot of configuration variables: dotenv files overlaid by the process environment.
#[derive(Debug, Clone, Default)]
pub struct EnvSource {
    vars: HashMap<String, String>,
}

impl EnvSource {
    /// Load `.env`, `.env.local` (from `dir`) and then the process environment.
    pub fn load(dir: &Path) -> Self {
        let mut vars = HashMap::new();
        for name in DOTENV_FILES {
            let path = dir.join(name);
            if path.is_file() {
                vars.extend(parse_dotenv(&path));
            }
        }
        vars.extend(std::env::vars());
        Self { vars }
    }

    /// Load relative to the current working directory.
    pub fn from_current_dir() -> Self {
        match std::env::current_dir() {
            Ok(dir) => Self::load(&dir),
            Err(err) => {
                tracing::warn!("could not resolve working directory for dotenv files: {}", err);
                Self {
                    vars: std::env::vars().collect(),
                }
            }
        }
    }

    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            vars: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// Trimmed, non-empty value for `key`. Blank values count as unset.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.vars
            .get(key)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    }
}

/// `KEY=value` lines; comments, blank lines and an `export ` prefix are skipped, matching quotes stripped.
fn parse_dotenv(path: &Path) -> HashMap<String, String> {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(err) => {
            tracing::warn!("failed to read {}: {}", path.display(), err);
            return HashMap::new();
        }
    };
    let mut vars = HashMap::new();
    for raw_line in content.lines() {
        let mut line = raw_line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        if let Some(stripped) = line.strip_prefix("export ") {
            line = stripped.trim();
        }
        let Some((key, value)) = line.split_once('=') else {
            continue;
        };
        let key = key.trim();
        if key.is_empty() {
            continue;
        }
        let mut value = value.trim().to_string();
        if value.len() >= 2 {
            let bytes = value.as_bytes();
            if (bytes[0] == b'"' && bytes[bytes.len() - 1] == b'"')
                || (bytes[0] == b'\'' && bytes[bytes.len() - 1] == b'\'')
            {
                value = value[1..value.len() - 1].to_string();
            }
        }
        vars.insert(key.to_string(), value);
    }
    vars
}

/// Resolved, immutable connection settings for the chat-completions endpoint.
#[derive(Clone, PartialEq, Eq)]
pub struct GatewayConfig {
    pub api_key: String,
    /// Base endpoint without a trailing slash
    pub base_url: String,
    /// Extra headers sent with every request (OpenRouter attribution only)
    pub default_headers: Vec<(String, String)>,
}

impl fmt::Debug for GatewayConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GatewayConfig")
            .field("api_key", &"<redacted>")
            .field("base_url", &self.base_url)
            .field("default_headers", &self.default_headers)
            .finish()
    }
}

impl GatewayConfig {
    pub fn resolve(env: &EnvSource) -> Result<Self, ConfigurationError> {
        let base_override = env.get(ENV_BASE_URL);
        let base_url = match base_override {
            Some(raw) => normalize_base_url(raw)?,
            None => DEFAULT_BASE_URL.to_string(),
        };
        let default_provider = is_default_provider(&base_url);

        let api_key = match env.get(ENV_API_KEY) {
            Some(key) => key.to_string(),
            None => {
                // Never hand an OpenRouter key to an endpoint that did not ask for it.
                if base_override.is_some() && !default_provider {
                    return Err(ConfigurationError::MissingApiKeyForCustomBase { base_url });
                }
                env.get(ENV_LEGACY_API_KEY)
                    .ok_or(ConfigurationError::MissingApiKey)?
                    .to_string()
            }
        };

        let default_headers = if default_provider {
            vec![
                (
                    "HTTP-Referer".to_string(),
                    env.get(ENV_SITE_URL).unwrap_or(DEFAULT_SITE_URL).to_string(),
                ),
                (
                    "X-Title".to_string(),
                    env.get(ENV_SITE_TITLE)
                        .unwrap_or(DEFAULT_SITE_TITLE)
                        .to_string(),
                ),
            ]
        } else {
            Vec::new()
        };

        Ok(Self {
            api_key,
            base_url,
            default_headers,
        })
    }

    pub fn chat_completions_url(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }
}

fn normalize_base_url(raw: &str) -> Result<String, ConfigurationError> {
    let parsed = Url::parse(raw).map_err(|e| ConfigurationError::InvalidBaseUrl {
        value: raw.to_string(),
        reason: e.to_string(),
    })?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(ConfigurationError::InvalidBaseUrl {
            value: raw.to_string(),
            reason: format!("unsupported scheme `{}`", parsed.scheme()),
        });
    }
    Ok(raw.trim_end_matches('/').to_string())
}

fn is_default_provider(base_url: &str) -> bool {
    Url::parse(base_url)
        .ok()
        .and_then(|u| u.host_str().map(|h| h.to_ascii_lowercase()))
        .map(|host| {
            host == DEFAULT_PROVIDER_DOMAIN || host.ends_with(&format!(".{}", DEFAULT_PROVIDER_DOMAIN))
        })
        .unwrap_or(false)
}

/// Model identifiers per pipeline
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelSelection {
    pub generate: String,
    pub extract: String,
}

impl ModelSelection {
    pub fn resolve(env: &EnvSource) -> Self {
        let image = env.get(ENV_IMAGE_MODEL).unwrap_or(DEFAULT_IMAGE_MODEL);
        Self {
            generate: env.get(ENV_GENERATE_MODEL).unwrap_or(image).to_string(),
            // Extraction only reads the image, so a cheaper text model is allowed.
            extract: env
                .get(ENV_EXTRACT_MODEL)
                .or_else(|| env.get(ENV_TEXT_MODEL))
                .unwrap_or(image)
                .to_string(),
        }
    }
}

impl Default for ModelSelection {
    fn default() -> Self {
        Self {
            generate: DEFAULT_IMAGE_MODEL.to_string(),
            extract: DEFAULT_IMAGE_MODEL.to_string(),
        }
    }
}

/// Everything resolved once per process.
///
/// A gateway failure is kept rather than raised so the server can still start and
/// report the problem on each request.
#[derive(Debug, Clone)]
pub struct Settings {
    pub gateway: Result<GatewayConfig, ConfigurationError>,
    pub models: ModelSelection,
}

impl Settings {
    pub fn resolve(env: &EnvSource) -> Self {
        Self {
            gateway: GatewayConfig::resolve(env),
            models: ModelSelection::resolve(env),
        }
    }
}
