//! Loader for pricefinder configuration with YAML + environment overlays.
//!
//! Sources are merged in the order they are attached; environment variables
//! with the `PRICEFINDER__` prefix are applied on top (`__` separates
//! sections, e.g. `PRICEFINDER__SERVER__PORT=8080`). After merging, every
//! string value goes through `${VAR}` expansion so secrets can live in the
//! environment while the YAML only names them.
//!
//! Every section has serde defaults, so an empty document is a valid
//! configuration:
//!
//! ```yaml
//! server:
//!   host: 0.0.0.0
//!   port: 5000
//! provider:
//!   api_key: "${SERPAPI_KEY}"
//! vision:
//!   model: gemini-1.5-flash-latest
//! search:
//!   cache_ttl_secs: 180
//! logging:
//!   level: info
//! ```
use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::{Path, PathBuf};

const MAXIMUM_ENV_EXPANSION_DEPTH: usize = 8;
const REDACTED: &str = "<redacted>";

/// Environment variables consulted, in order, when no SerpAPI key is configured.
pub const SERPAPI_KEY_VARS: &[&str] = &[
    "SERPAPI_KEY",
    "SERPAPI_API_KEY",
    "SERP_API_KEY",
    "serpapi_key",
    "SERPAPI",
];

/// Environment variable consulted when no Gemini key is configured.
pub const GEMINI_KEY_VAR: &str = "GEMINI_API_KEY";

/// Environment variable that overrides the listen port (hosting platforms set it).
pub const PORT_VAR: &str = "PORT";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PriceFinderConfig {
    pub server: ServerSection,
    pub provider: ProviderSection,
    pub vision: VisionSection,
    pub search: SearchSection,
    pub logging: LoggingSection,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSection {
    pub host: String,
    pub port: u16,
    /// Wall-clock budget for one `/api/search` request.
    pub request_timeout_secs: u64,
    pub max_body_bytes: usize,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".into(),
            port: 5000,
            request_timeout_secs: 20,
            max_body_bytes: 16 * 1024 * 1024,
        }
    }
}

impl ServerSection {
    /// Port from `PORT` when it parses, otherwise the configured one.
    pub fn resolved_port(&self) -> u16 {
        std::env::var(PORT_VAR)
            .ok()
            .and_then(|raw| raw.trim().parse().ok())
            .unwrap_or(self.port)
    }
}

/// Shopping-search provider (SerpAPI) settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderSection {
    pub api_key: Option<String>,
    pub base_url: String,
    pub engine: String,
    pub num: u32,
    pub location: String,
    pub gl: String,
    pub pacing_ms: u64,
    pub connect_timeout_secs: u64,
    pub read_timeout_secs: u64,
}

impl Default for ProviderSection {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: "https://serpapi.com".into(),
            engine: "google_shopping".into(),
            num: 5,
            location: "United States".into(),
            gl: "us".into(),
            pacing_ms: 300,
            connect_timeout_secs: 3,
            read_timeout_secs: 8,
        }
    }
}

impl ProviderSection {
    /// Configured key, else the first non-empty variable from [`SERPAPI_KEY_VARS`].
    pub fn resolved_api_key(&self) -> Option<String> {
        usable_secret(self.api_key.as_deref()).or_else(|| {
            SERPAPI_KEY_VARS
                .iter()
                .find_map(|var| usable_secret(std::env::var(var).ok().as_deref()))
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VisionSection {
    pub enabled: bool,
    pub api_key: Option<String>,
    pub base_url: String,
    pub model: String,
    pub timeout_secs: u64,
    pub max_dimension: u32,
    pub min_dimension: u32,
}

impl Default for VisionSection {
    fn default() -> Self {
        Self {
            enabled: true,
            api_key: None,
            base_url: "https://generativelanguage.googleapis.com".into(),
            model: "gemini-1.5-flash-latest".into(),
            timeout_secs: 15,
            max_dimension: 1024,
            min_dimension: 10,
        }
    }
}

impl VisionSection {
    /// Configured key, else `GEMINI_API_KEY`. Always `None` when disabled.
    pub fn resolved_api_key(&self) -> Option<String> {
        if !self.enabled {
            return None;
        }
        usable_secret(self.api_key.as_deref())
            .or_else(|| usable_secret(std::env::var(GEMINI_KEY_VAR).ok().as_deref()))
    }
}

/// Tuning constants for the aggregation pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchSection {
    pub cache_ttl_secs: u64,
    pub cache_max_entries: usize,
    pub max_results: usize,
    pub max_items_per_response: usize,
    pub min_price: f64,
    pub max_price: f64,
    pub fallback_step: f64,
    pub electronics_base: f64,
    pub apparel_base: f64,
    pub default_base: f64,
    /// Replaces the built-in denylist when present.
    pub blocked_stores: Option<Vec<String>>,
    pub max_query_chars: usize,
    pub max_image_bytes: usize,
}

impl Default for SearchSection {
    fn default() -> Self {
        Self {
            cache_ttl_secs: 180,
            cache_max_entries: 10,
            max_results: 6,
            max_items_per_response: 3,
            min_price: 0.01,
            max_price: 50_000.0,
            fallback_step: 0.15,
            electronics_base: 400.0,
            apparel_base: 35.0,
            default_base: 25.0,
            blocked_stores: None,
            max_query_chars: 80,
            max_image_bytes: 10 * 1024 * 1024,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    pub level: String,
    pub format: String,
    pub dir: Option<PathBuf>,
    pub stderr: bool,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: "info".into(),
            format: "text".into(),
            dir: None,
            stderr: true,
        }
    }
}

impl PriceFinderConfig {
    /// YAML rendering with every credential replaced by `<redacted>`.
    pub fn to_redacted_yaml(&self) -> Result<String, serde_yaml::Error> {
        let mut copy = self.clone();
        for key in [&mut copy.provider.api_key, &mut copy.vision.api_key] {
            if key.is_some() {
                *key = Some(REDACTED.into());
            }
        }
        serde_yaml::to_string(&copy)
    }
}

// Unexpanded placeholders count as missing so `${SERPAPI_KEY}` with the
// variable unset falls through to discovery.
fn usable_secret(raw: Option<&str>) -> Option<String> {
    let s = raw?.trim();
    if s.is_empty() || s.contains("${") {
        None
    } else {
        Some(s.to_string())
    }
}

/// `~/.config/pricefinder/pricefinder.yaml` (platform equivalent), if a config dir exists.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("pricefinder").join("pricefinder.yaml"))
}

fn expand_env_in_value(v: &mut Value) {
    match v {
        Value::String(s) => {
            if s.contains('$') {
                let mut cur = std::mem::take(s);
                for _ in 0..MAXIMUM_ENV_EXPANSION_DEPTH {
                    let expanded = match shellexpand::env(&cur) {
                        Ok(cow) => cow.into_owned(),
                        Err(_) => cur.clone(),
                    };
                    if expanded == cur {
                        break;
                    }
                    cur = expanded;
                }
                *s = cur;
            }
        }
        Value::Array(arr) => arr.iter_mut().for_each(expand_env_in_value),
        Value::Object(obj) => obj.values_mut().for_each(expand_env_in_value),
        _ => {}
    }
}

/// Builder hides the `config` crate wiring (YAML + env overrides).
pub struct PriceFinderConfigLoader {
    builder: config::ConfigBuilder<config::builder::DefaultState>,
}

impl Default for PriceFinderConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl PriceFinderConfigLoader {
    /// Start with `PRICEFINDER__` env overrides and no files.
    ///
    /// ```
    /// use pricefinder_config::PriceFinderConfigLoader;
    ///
    /// let config = PriceFinderConfigLoader::new()
    ///     .with_yaml_str("server:\n  port: 8080")
    ///     .load()
    ///     .expect("valid config");
    ///
    /// assert_eq!(config.server.port, 8080);
    /// assert_eq!(config.search.cache_ttl_secs, 180);
    /// ```
    pub fn new() -> Self {
        Self {
            builder: Config::builder(),
        }
    }

    /// Attach a YAML/TOML/JSON file that must exist; the format is inferred by suffix.
    pub fn with_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.builder = self
            .builder
            .add_source(File::from(path.as_ref()).required(true));
        self
    }

    /// Attach a file that is silently skipped when absent.
    pub fn with_optional_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.builder = self
            .builder
            .add_source(File::from(path.as_ref()).required(false));
        self
    }

    /// Merge inline YAML; used by tests and the CLI.
    ///
    /// ```
    /// use pricefinder_config::PriceFinderConfigLoader;
    ///
    /// let cfg = PriceFinderConfigLoader::new()
    ///     .with_yaml_str(
    ///         r#"
    /// search:
    ///   blocked_stores: ["examplemart"]
    ///   max_results: 4
    /// "#,
    ///     )
    ///     .load()
    ///     .unwrap();
    ///
    /// assert_eq!(cfg.search.max_results, 4);
    /// assert_eq!(cfg.search.blocked_stores.as_deref(), Some(&["examplemart".to_string()][..]));
    /// ```
    pub fn with_yaml_str(mut self, yaml: &str) -> Self {
        self.builder = self
            .builder
            .add_source(File::from_str(yaml, config::FileFormat::Yaml));
        self
    }

    /// Consume the builder and deserialize the merged sources into typed config.
    ///
    /// `PRICEFINDER__`-prefixed environment variables are layered last, then
    /// `${VAR}` placeholders are expanded.
    ///
    /// ```
    /// use pricefinder_config::PriceFinderConfigLoader;
    ///
    /// unsafe { std::env::set_var("DOC_SERP_TOKEN", "injected-from-env"); }
    ///
    /// let config = PriceFinderConfigLoader::new()
    ///     .with_yaml_str("provider:\n  api_key: \"${DOC_SERP_TOKEN}\"")
    ///     .load()
    ///     .expect("valid configuration");
    ///
    /// assert_eq!(config.provider.api_key.as_deref(), Some("injected-from-env"));
    ///
    /// unsafe { std::env::remove_var("DOC_SERP_TOKEN"); }
    /// ```
    pub fn load(self) -> Result<PriceFinderConfig, ConfigError> {
        let cfg = self
            .builder
            .add_source(
                Environment::with_prefix("PRICEFINDER")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let mut v: Value = cfg.try_deserialize()?;
        expand_env_in_value(&mut v);

        serde_json::from_value(v).map_err(|e| ConfigError::Message(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn expands_in_array_and_object() {
        temp_env::with_vars([("CITY", Some("Winston")), ("STATE", Some("NC"))], || {
            let mut v = json!([
                "hello-$CITY",
                { "loc": "${CITY}-${STATE}" },
                42,
                true,
                null
            ]);
            expand_env_in_value(&mut v);
            assert_eq!(
                v,
                json!(["hello-Winston", { "loc": "Winston-NC" }, 42, true, null])
            );
        });
    }

    #[test]
    fn expands_recursively_across_env_values() {
        temp_env::with_vars(
            [
                ("BAZ", Some("qux")),
                ("BAR", Some("mid-${BAZ}")),
                ("FOO", Some("start-${BAR}-end")),
            ],
            || {
                let mut v = json!("X=${FOO}");
                expand_env_in_value(&mut v);
                assert_eq!(v, json!("X=start-mid-qux-end"));
            },
        );
    }

    #[test]
    fn stops_on_cycles() {
        temp_env::with_vars([("A", Some("${B}")), ("B", Some("${A}"))], || {
            let mut v = json!("x=${A}-y");
            expand_env_in_value(&mut v);
            let s = v.as_str().unwrap();
            assert!(s.starts_with("x=") && s.ends_with("-y"));
            assert!(s.contains("${"));
        });
    }

    #[test]
    fn unknown_vars_are_left_as_is() {
        let mut v = json!("hi-${PRICEFINDER_DOES_NOT_EXIST}");
        expand_env_in_value(&mut v);
        assert_eq!(v, json!("hi-${PRICEFINDER_DOES_NOT_EXIST}"));
    }

    #[test]
    fn serpapi_key_discovery_walks_known_names() {
        let unset: Vec<(&str, Option<&str>)> =
            SERPAPI_KEY_VARS.iter().map(|v| (*v, None)).collect();
        temp_env::with_vars(unset, || {
            let section = ProviderSection::default();
            assert_eq!(section.resolved_api_key(), None);

            temp_env::with_var("SERP_API_KEY", Some("third-choice"), || {
                assert_eq!(section.resolved_api_key().as_deref(), Some("third-choice"));
            });
            temp_env::with_vars(
                [("SERPAPI_KEY", Some("first")), ("SERPAPI", Some("last"))],
                || assert_eq!(section.resolved_api_key().as_deref(), Some("first")),
            );
        });
    }

    #[test]
    fn configured_key_wins_over_environment() {
        temp_env::with_var("SERPAPI_KEY", Some("from-env"), || {
            let section = ProviderSection {
                api_key: Some(" configured ".into()),
                ..Default::default()
            };
            assert_eq!(section.resolved_api_key().as_deref(), Some("configured"));
        });
    }

    #[test]
    fn unexpanded_placeholder_counts_as_missing() {
        assert_eq!(usable_secret(Some("${SERPAPI_KEY}")), None);
        assert_eq!(usable_secret(Some("   ")), None);
        assert_eq!(usable_secret(Some("abc")).as_deref(), Some("abc"));
    }

    #[test]
    fn disabled_vision_never_reports_a_key() {
        temp_env::with_var(GEMINI_KEY_VAR, Some("g-key"), || {
            let on = VisionSection::default();
            assert_eq!(on.resolved_api_key().as_deref(), Some("g-key"));
            let off = VisionSection {
                enabled: false,
                ..Default::default()
            };
            assert_eq!(off.resolved_api_key(), None);
        });
    }

    #[test]
    fn port_env_overrides_when_numeric() {
        let server = ServerSection::default();
        temp_env::with_var(PORT_VAR, Some("8081"), || {
            assert_eq!(server.resolved_port(), 8081);
        });
        temp_env::with_var(PORT_VAR, Some("not-a-port"), || {
            assert_eq!(server.resolved_port(), 5000);
        });
    }

    #[test]
    fn redacted_yaml_hides_credentials() {
        let mut cfg = PriceFinderConfig::default();
        cfg.provider.api_key = Some("serp-secret".into());
        let yaml = cfg.to_redacted_yaml().unwrap();
        assert!(!yaml.contains("serp-secret"));
        assert!(yaml.contains(REDACTED));
    }
}
