use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::Config;

/// On-disk TOML configuration structure.
/// All fields are optional so partial configs work (merge with defaults).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConfigFile {
    pub api_keys: Option<ApiKeysConfig>,
    pub enrichment: Option<EnrichmentConfig>,
    pub parsing: Option<ParsingSection>,
    pub graph: Option<GraphSection>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ApiKeysConfig {
    pub s2_api_key: Option<String>,
    pub crossref_mailto: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EnrichmentConfig {
    pub disabled_sources: Option<Vec<String>>,
    pub lookup_timeout_secs: Option<u64>,
    pub max_concurrency: Option<usize>,
    pub batch_size: Option<usize>,
    pub batch_pause_ms: Option<u64>,
    pub max_lookups: Option<usize>,
    pub cache_positive_ttl_secs: Option<u64>,
    pub cache_negative_ttl_secs: Option<u64>,
}

/// `[parsing]` section, consumed by the reference extractor.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParsingSection {
    pub section_headers: Option<Vec<String>>,
    pub end_markers: Option<Vec<String>>,
    pub min_reference_chars: Option<usize>,
    pub max_reference_chars: Option<usize>,
}

/// `[graph]` section, consumed by the graph builder.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphSection {
    pub high_impact_venues: Option<Vec<String>>,
    pub layout: Option<String>,
    pub reference_year: Option<i32>,
}

/// Platform config directory path: `<config_dir>/citegraph/config.toml`.
pub fn config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("citegraph").join("config.toml"))
}

/// Load config by cascading CWD `.citegraph.toml` over platform config.
/// CWD values override platform values.
pub fn load_config() -> ConfigFile {
    let platform = config_path().and_then(|p| load_from_path(&p));
    let cwd = load_from_path(Path::new(".citegraph.toml"));

    match (platform, cwd) {
        (None, None) => ConfigFile::default(),
        (Some(p), None) => p,
        (None, Some(c)) => c,
        (Some(p), Some(c)) => merge(p, c),
    }
}

/// Load a config from a specific path. Returns `None` if the file doesn't
/// exist or can't be parsed.
pub fn load_from_path(path: &Path) -> Option<ConfigFile> {
    let content = std::fs::read_to_string(path).ok()?;
    match toml::from_str(&content) {
        Ok(config) => Some(config),
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "ignoring unparseable config file");
            None
        }
    }
}

/// Take a field from `overlay` if set, else from `base`.
fn pick<S, T>(overlay: &Option<S>, base: &Option<S>, field: impl Fn(&S) -> Option<T>) -> Option<T> {
    overlay
        .as_ref()
        .and_then(&field)
        .or_else(|| base.as_ref().and_then(&field))
}

/// Merge two configs: `overlay` values take precedence over `base`.
pub fn merge(base: ConfigFile, overlay: ConfigFile) -> ConfigFile {
    let (ob, bb) = (&overlay.api_keys, &base.api_keys);
    let api_keys = ApiKeysConfig {
        s2_api_key: pick(ob, bb, |a| a.s2_api_key.clone()),
        crossref_mailto: pick(ob, bb, |a| a.crossref_mailto.clone()),
    };

    let (oe, be) = (&overlay.enrichment, &base.enrichment);
    let enrichment = EnrichmentConfig {
        disabled_sources: pick(oe, be, |e| e.disabled_sources.clone()),
        lookup_timeout_secs: pick(oe, be, |e| e.lookup_timeout_secs),
        max_concurrency: pick(oe, be, |e| e.max_concurrency),
        batch_size: pick(oe, be, |e| e.batch_size),
        batch_pause_ms: pick(oe, be, |e| e.batch_pause_ms),
        max_lookups: pick(oe, be, |e| e.max_lookups),
        cache_positive_ttl_secs: pick(oe, be, |e| e.cache_positive_ttl_secs),
        cache_negative_ttl_secs: pick(oe, be, |e| e.cache_negative_ttl_secs),
    };

    let (op, bp) = (&overlay.parsing, &base.parsing);
    let parsing = ParsingSection {
        section_headers: pick(op, bp, |p| p.section_headers.clone()),
        end_markers: pick(op, bp, |p| p.end_markers.clone()),
        min_reference_chars: pick(op, bp, |p| p.min_reference_chars),
        max_reference_chars: pick(op, bp, |p| p.max_reference_chars),
    };

    let (og, bg) = (&overlay.graph, &base.graph);
    let graph = GraphSection {
        high_impact_venues: pick(og, bg, |g| g.high_impact_venues.clone()),
        layout: pick(og, bg, |g| g.layout.clone()),
        reference_year: pick(og, bg, |g| g.reference_year),
    };

    ConfigFile {
        api_keys: Some(api_keys),
        enrichment: Some(enrichment),
        parsing: Some(parsing),
        graph: Some(graph),
    }
}

impl ConfigFile {
    /// Apply the `[api_keys]` and `[enrichment]` values onto `config`,
    /// leaving fields the file doesn't set untouched.
    pub fn apply_to(&self, config: &mut Config) {
        if let Some(keys) = &self.api_keys {
            if keys.s2_api_key.is_some() {
                config.s2_api_key = keys.s2_api_key.clone();
            }
            if keys.crossref_mailto.is_some() {
                config.crossref_mailto = keys.crossref_mailto.clone();
            }
        }

        if let Some(e) = &self.enrichment {
            if let Some(disabled) = &e.disabled_sources {
                config.disabled_sources = disabled.clone();
            }
            if let Some(secs) = e.lookup_timeout_secs {
                config.lookup_timeout = Duration::from_secs(secs);
            }
            if let Some(n) = e.max_concurrency {
                config.max_concurrency = n;
            }
            if let Some(n) = e.batch_size {
                config.batch_size = n;
            }
            if let Some(ms) = e.batch_pause_ms {
                config.batch_pause = Duration::from_millis(ms);
            }
            if e.max_lookups.is_some() {
                config.max_lookups = e.max_lookups;
            }
            if let Some(secs) = e.cache_positive_ttl_secs {
                config.cache_positive_ttl_secs = secs;
            }
            if let Some(secs) = e.cache_negative_ttl_secs {
                config.cache_negative_ttl_secs = secs;
            }
        }
    }
}

/// Save the config to the platform config directory.
pub fn save_config(config: &ConfigFile) -> Result<PathBuf, String> {
    let path = config_path().ok_or_else(|| "Could not determine config directory".to_string())?;
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .map_err(|e| format!("Failed to create config directory: {}", e))?;
    }
    let content =
        toml::to_string_pretty(config).map_err(|e| format!("Failed to serialize config: {}", e))?;
    std::fs::write(&path, content).map_err(|e| format!("Failed to write config: {}", e))?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_all_sections() {
        let toml_str = r#"
[api_keys]
s2_api_key = "secret"

[enrichment]
batch_size = 10
batch_pause_ms = 250
disabled_sources = ["CrossRef"]

[parsing]
section_headers = ["References", "Literature Cited"]

[graph]
high_impact_venues = ["Nature"]
layout = "circular"
reference_year = 2024
"#;
        let parsed: ConfigFile = toml::from_str(toml_str).unwrap();
        assert_eq!(parsed.api_keys.unwrap().s2_api_key.as_deref(), Some("secret"));
        assert_eq!(parsed.enrichment.as_ref().unwrap().batch_size, Some(10));
        assert_eq!(
            parsed.parsing.unwrap().section_headers.unwrap(),
            vec!["References", "Literature Cited"]
        );
        let graph = parsed.graph.unwrap();
        assert_eq!(graph.layout.as_deref(), Some("circular"));
        assert_eq!(graph.reference_year, Some(2024));
    }

    #[test]
    fn missing_sections_deserialize_as_none() {
        let parsed: ConfigFile = toml::from_str("[graph]\nlayout = \"force\"\n").unwrap();
        assert!(parsed.api_keys.is_none());
        assert!(parsed.enrichment.is_none());
    }

    #[test]
    fn merge_overlay_wins() {
        let base = ConfigFile {
            enrichment: Some(EnrichmentConfig {
                batch_size: Some(5),
                max_concurrency: Some(2),
                ..Default::default()
            }),
            ..Default::default()
        };
        let overlay = ConfigFile {
            enrichment: Some(EnrichmentConfig {
                batch_size: Some(20),
                ..Default::default()
            }),
            ..Default::default()
        };
        let merged = merge(base, overlay).enrichment.unwrap();
        assert_eq!(merged.batch_size, Some(20));
        assert_eq!(merged.max_concurrency, Some(2));
    }

    #[test]
    fn merge_base_preserved_when_overlay_absent() {
        let base = ConfigFile {
            graph: Some(GraphSection {
                reference_year: Some(2020),
                ..Default::default()
            }),
            ..Default::default()
        };
        let merged = merge(base, ConfigFile::default());
        assert_eq!(merged.graph.unwrap().reference_year, Some(2020));
    }

    #[test]
    fn apply_to_overrides_only_set_fields() {
        let file = ConfigFile {
            enrichment: Some(EnrichmentConfig {
                lookup_timeout_secs: Some(3),
                batch_pause_ms: Some(0),
                ..Default::default()
            }),
            ..Default::default()
        };
        let mut config = Config::default();
        let default_batch = config.batch_size;
        file.apply_to(&mut config);
        assert_eq!(config.lookup_timeout, Duration::from_secs(3));
        assert!(config.batch_pause.is_zero());
        assert_eq!(config.batch_size, default_batch);
    }

    #[test]
    fn load_from_path_ignores_garbage() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "this is = = not toml").unwrap();
        assert!(load_from_path(&path).is_none());
        assert!(load_from_path(&dir.path().join("missing.toml")).is_none());
    }
}
