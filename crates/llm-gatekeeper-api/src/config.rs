//! Service configuration.
//!
//! Loaded once at startup from an optional TOML file plus `GATEKEEPER__*`
//! environment overrides, validated, and then treated as immutable.

use config::{builder::DefaultState, Config, ConfigBuilder, Environment, File, FileFormat};
use llm_gatekeeper_core::scanners::{
    Anonymize, Deanonymize, NoRefusal, PiiKind, PromptInjection, Relevance, Sensitive, TokenLimit,
    Toxicity,
};
use llm_gatekeeper_core::{PolicyKind, ScanError, Scanner};
use serde::Deserialize;
use std::fmt;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

/// Config file used when `GATEKEEPER_CONFIG` is not set.
pub const DEFAULT_CONFIG_PATH: &str = "gatekeeper.toml";

const ENV_PREFIX: &str = "GATEKEEPER";

/// Configuration errors. All of them are fatal at startup.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Failed to build scanner: {0}")]
    Scanner(#[from] ScanError),
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub server: ServerSettings,
    pub model: ModelSettings,
    pub decision: DecisionSettings,
    pub scanners: ScannerSettings,
    pub metrics: MetricsSettings,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub bind_addr: String,
    pub request_body_limit: usize,
    pub request_timeout_secs: u64,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:8080".to_string(),
            request_body_limit: 1024 * 1024,
            request_timeout_secs: 60,
        }
    }
}

impl ServerSettings {
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        self.bind_addr.parse().map_err(|e| {
            ConfigError::Invalid(format!("server.bind_addr '{}': {e}", self.bind_addr))
        })
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    fn override_port(&mut self, port: &str) -> Result<(), ConfigError> {
        let port: u16 = port
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid(format!("PORT '{port}' is not a valid port")))?;
        let mut addr = self.socket_addr()?;
        addr.set_port(port);
        self.bind_addr = addr.to_string();
        Ok(())
    }
}

/// Upstream model endpoint.
#[derive(Clone, Deserialize)]
#[serde(default)]
pub struct ModelSettings {
    pub api_url: String,
    pub api_token: Option<String>,
    pub model: String,
    pub timeout_secs: u64,
    pub accept_invalid_certs: bool,
}

impl Default for ModelSettings {
    fn default() -> Self {
        Self {
            api_url: String::new(),
            api_token: None,
            model: String::new(),
            timeout_secs: 30,
            accept_invalid_certs: false,
        }
    }
}

impl ModelSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl fmt::Debug for ModelSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelSettings")
            .field("api_url", &self.api_url)
            .field("api_token", &self.api_token.as_ref().map(|_| "<redacted>"))
            .field("model", &self.model)
            .field("timeout_secs", &self.timeout_secs)
            .field("accept_invalid_certs", &self.accept_invalid_certs)
            .finish()
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct DecisionSettings {
    pub policy: PolicyKind,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MetricsSettings {
    pub enabled: bool,
}

impl Default for MetricsSettings {
    fn default() -> Self {
        Self { enabled: true }
    }
}

/// Scanner lists per direction. `None` selects the built-in defaults.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ScannerSettings {
    pub input: Option<Vec<ScannerConfig>>,
    pub output: Option<Vec<ScannerConfig>>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct WeightedTerm {
    pub term: String,
    pub weight: f64,
}

/// One configured scanner, tagged by `type`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ScannerConfig {
    Anonymize {
        #[serde(default)]
        entity_types: Vec<PiiKind>,
    },
    Toxicity {
        threshold: Option<f64>,
        #[serde(default)]
        terms: Vec<WeightedTerm>,
    },
    TokenLimit {
        limit: Option<usize>,
    },
    PromptInjection {
        threshold: Option<f64>,
        #[serde(default)]
        patterns: Vec<WeightedTerm>,
    },
    NoRefusal {
        threshold: Option<f64>,
    },
    Relevance {
        min_similarity: Option<f64>,
    },
    Sensitive {
        #[serde(default)]
        entity_types: Vec<PiiKind>,
        #[serde(default)]
        redact: bool,
    },
    Deanonymize,
}

impl ScannerConfig {
    pub fn build(&self) -> Result<Arc<dyn Scanner>, ScanError> {
        let scanner: Arc<dyn Scanner> = match self {
            ScannerConfig::Anonymize { entity_types } if entity_types.is_empty() => {
                Arc::new(Anonymize::new())
            }
            ScannerConfig::Anonymize { entity_types } => {
                Arc::new(Anonymize::with_entity_types(entity_types.iter().copied()))
            }
            ScannerConfig::Toxicity { threshold, terms } => Arc::new(Toxicity::with_terms(
                threshold.unwrap_or(Toxicity::DEFAULT_THRESHOLD),
                terms.iter().map(|t| (t.term.as_str(), t.weight)),
            )?),
            ScannerConfig::TokenLimit { limit: Some(limit) } => {
                Arc::new(TokenLimit::with_limit(*limit)?)
            }
            ScannerConfig::TokenLimit { limit: None } => Arc::new(TokenLimit::new()?),
            ScannerConfig::PromptInjection { threshold, patterns } => {
                Arc::new(PromptInjection::with_patterns(
                    threshold.unwrap_or(PromptInjection::DEFAULT_THRESHOLD),
                    patterns.iter().map(|p| (p.term.as_str(), p.weight)),
                )?)
            }
            ScannerConfig::NoRefusal { threshold } => {
                let scanner = NoRefusal::new()?;
                Arc::new(match threshold {
                    Some(threshold) => scanner.with_threshold(*threshold),
                    None => scanner,
                })
            }
            ScannerConfig::Relevance {
                min_similarity: Some(min),
            } => Arc::new(Relevance::with_min_similarity(*min)),
            ScannerConfig::Relevance { min_similarity: None } => Arc::new(Relevance::new()),
            ScannerConfig::Sensitive { entity_types, redact } => {
                let scanner = if entity_types.is_empty() {
                    Sensitive::new()
                } else {
                    Sensitive::with_entity_types(entity_types.iter().copied())
                };
                Arc::new(scanner.with_redaction(*redact))
            }
            ScannerConfig::Deanonymize => Arc::new(Deanonymize::new()),
        };
        Ok(scanner)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let unit = |name: &str, value: Option<f64>| match value {
            Some(v) if !(0.0..=1.0).contains(&v) => {
                Err(ConfigError::Invalid(format!("{name} must be within [0, 1], got {v}")))
            }
            _ => Ok(()),
        };
        let weights = |terms: &[WeightedTerm]| {
            terms.iter().try_for_each(|t| {
                if t.term.trim().is_empty() {
                    return Err(ConfigError::Invalid("lexicon terms must not be empty".to_string()));
                }
                unit("term weight", Some(t.weight))
            })
        };

        match self {
            ScannerConfig::Toxicity { threshold, terms } => {
                unit("toxicity.threshold", *threshold)?;
                weights(terms.as_slice())
            }
            ScannerConfig::PromptInjection { threshold, patterns } => {
                unit("prompt_injection.threshold", *threshold)?;
                weights(patterns.as_slice())
            }
            ScannerConfig::NoRefusal { threshold } => unit("no_refusal.threshold", *threshold),
            ScannerConfig::Relevance { min_similarity } => {
                unit("relevance.min_similarity", *min_similarity)
            }
            ScannerConfig::TokenLimit { limit: Some(0) } => {
                Err(ConfigError::Invalid("token_limit.limit must be greater than zero".to_string()))
            }
            _ => Ok(()),
        }
    }
}

/// Build the configured scanners, in order.
pub fn build_scanners(configs: &[ScannerConfig]) -> Result<Vec<Arc<dyn Scanner>>, ConfigError> {
    configs
        .iter()
        .map(|c| c.build().map_err(ConfigError::from))
        .collect()
}

impl Settings {
    /// Load from `GATEKEEPER_CONFIG` (or [`DEFAULT_CONFIG_PATH`]), environment
    /// overrides and `PORT`.
    pub fn load() -> Result<Self, ConfigError> {
        let path = std::env::var("GATEKEEPER_CONFIG")
            .unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
        let builder = Config::builder()
            .add_source(File::with_name(&path).required(false))
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            );

        let mut settings = Self::from_builder(builder)?;
        if let Ok(port) = std::env::var("PORT") {
            settings.server.override_port(&port)?;
        }
        settings.validate()?;
        Ok(settings)
    }

    /// Parse and validate a TOML document, without environment overrides.
    pub fn from_toml(source: &str) -> Result<Self, ConfigError> {
        let builder = Config::builder().add_source(File::from_str(source, FileFormat::Toml));
        let settings = Self::from_builder(builder)?;
        settings.validate()?;
        Ok(settings)
    }

    fn from_builder(builder: ConfigBuilder<DefaultState>) -> Result<Self, ConfigError> {
        Ok(builder.build()?.try_deserialize()?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.server.socket_addr()?;
        if self.server.request_timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "server.request_timeout_secs must be greater than zero".to_string(),
            ));
        }
        if self.server.request_body_limit == 0 {
            return Err(ConfigError::Invalid(
                "server.request_body_limit must be greater than zero".to_string(),
            ));
        }
        if self.model.api_url.trim().is_empty() {
            return Err(ConfigError::Invalid("model.api_url is required".to_string()));
        }
        let url = &self.model.api_url;
        if !url.starts_with("http://") && !url.starts_with("https://") {
            return Err(ConfigError::Invalid(format!(
                "model.api_url '{}' must be an http(s) URL",
                self.model.api_url
            )));
        }
        if self.model.model.trim().is_empty() {
            return Err(ConfigError::Invalid("model.model is required".to_string()));
        }
        if self.model.timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "model.timeout_secs must be greater than zero".to_string(),
            ));
        }

        for scanner in self.scanners.input.iter().chain(self.scanners.output.iter()).flatten() {
            scanner.validate()?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
        [model]
        api_url = "http://127.0.0.1:9000/v1/chat/completions"
        model = "test-model"
    "#;

    #[test]
    fn test_defaults_applied() {
        let settings = Settings::from_toml(MINIMAL).unwrap();

        assert_eq!(settings.server.bind_addr, "0.0.0.0:8080");
        assert_eq!(settings.server.request_body_limit, 1024 * 1024);
        assert_eq!(settings.model.timeout(), Duration::from_secs(30));
        assert!(settings.model.api_token.is_none());
        assert_eq!(settings.decision.policy, PolicyKind::RejectOnAny);
        assert!(settings.scanners.input.is_none());
        assert!(settings.metrics.enabled);
    }

    #[test]
    fn test_full_document() {
        let settings = Settings::from_toml(
            r#"
            [server]
            bind_addr = "127.0.0.1:3000"

            [model]
            api_url = "https://llm.internal/v1/chat/completions"
            api_token = "secret-token"
            model = "gpt-4o-mini"
            timeout_secs = 5

            [decision]
            policy = "reject_on_all"

            [[scanners.input]]
            type = "anonymize"
            entity_types = ["SSN", "EMAIL"]

            [[scanners.input]]
            type = "toxicity"
            threshold = 0.7
            terms = [{ term = "nincompoop", weight = 0.8 }]

            [[scanners.input]]
            type = "token_limit"
            limit = 512

            [[scanners.output]]
            type = "sensitive"
            redact = true

            [[scanners.output]]
            type = "deanonymize"
            "#,
        )
        .unwrap();

        assert_eq!(settings.server.socket_addr().unwrap().port(), 3000);
        assert_eq!(settings.decision.policy, PolicyKind::RejectOnAll);

        let input = settings.scanners.input.as_ref().unwrap();
        assert_eq!(
            input[0],
            ScannerConfig::Anonymize {
                entity_types: vec![PiiKind::Ssn, PiiKind::Email]
            }
        );
        assert_eq!(input[2], ScannerConfig::TokenLimit { limit: Some(512) });

        let built = build_scanners(input).unwrap();
        let ids: Vec<&str> = built.iter().map(|s| s.id()).collect();
        assert_eq!(ids, ["anonymize", "toxicity", "token_limit"]);

        let output = build_scanners(settings.scanners.output.as_ref().unwrap()).unwrap();
        let ids: Vec<&str> = output.iter().map(|s| s.id()).collect();
        assert_eq!(ids, ["sensitive", "deanonymize"]);
    }

    #[test]
    fn test_token_is_redacted_in_debug() {
        let mut settings = Settings::from_toml(MINIMAL).unwrap();
        settings.model.api_token = Some("super-secret".to_string());

        let debug = format!("{settings:?}");
        assert!(!debug.contains("super-secret"));
        assert!(debug.contains("<redacted>"));
    }

    #[test]
    fn test_validation_failures() {
        let missing_url = Settings::from_toml("[model]\nmodel = \"m\"");
        assert!(matches!(missing_url, Err(ConfigError::Invalid(msg)) if msg.contains("api_url")));

        let bad_scheme = Settings::from_toml("[model]\napi_url = \"ftp://x\"\nmodel = \"m\"");
        assert!(bad_scheme.is_err());

        let zero_timeout = format!("{MINIMAL}\ntimeout_secs = 0");
        assert!(Settings::from_toml(&zero_timeout).is_err());

        let bad_policy = format!("{MINIMAL}\n[decision]\npolicy = \"reject_sometimes\"");
        assert!(matches!(Settings::from_toml(&bad_policy), Err(ConfigError::Load(_))));

        let bad_threshold =
            format!("{MINIMAL}\n[[scanners.input]]\ntype = \"toxicity\"\nthreshold = 1.5");
        assert!(matches!(Settings::from_toml(&bad_threshold), Err(ConfigError::Invalid(_))));

        let zero_limit =
            format!("{MINIMAL}\n[[scanners.input]]\ntype = \"token_limit\"\nlimit = 0");
        assert!(Settings::from_toml(&zero_limit).is_err());

        let unknown_scanner = format!("{MINIMAL}\n[[scanners.input]]\ntype = \"sentiment\"");
        assert!(matches!(Settings::from_toml(&unknown_scanner), Err(ConfigError::Load(_))));

        let mut settings = Settings::from_toml(MINIMAL).unwrap();
        settings.server.bind_addr = "not an address".to_string();
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_port_override() {
        let mut server = ServerSettings::default();
        server.override_port("9090").unwrap();
        assert_eq!(server.bind_addr, "0.0.0.0:9090");

        assert!(server.override_port("http").is_err());
    }
}
