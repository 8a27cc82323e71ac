//! Configuration management for Docserve

use std::env;
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub cache: CacheConfig,
    pub lookup: LookupConfig,
    pub tools: ToolsConfig,
    pub render: RenderConfig,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Root of the on-disk caches
    pub dir: PathBuf,
    /// Entries kept in the in-memory metadata memo
    pub metadata_entries: usize,
}

impl CacheConfig {
    /// Directory holding original document bytes
    pub fn documents_dir(&self) -> PathBuf {
        self.dir.join("documents")
    }

    /// Directory holding encoded page renders
    pub fn renders_dir(&self) -> PathBuf {
        self.dir.join("renders")
    }
}

/// Where identifiers are resolved to origin URLs
#[derive(Debug, Clone)]
pub enum LookupConfig {
    /// HTTP catalog: `GET <base>/<id>` returns `{"url": ...}`
    Http { base_url: String },
    /// JSON file mapping identifier to URL (or null)
    Manifest { path: Option<PathBuf> },
}

#[derive(Debug, Clone)]
pub struct ToolsConfig {
    pub pdfinfo: String,
    pub pdftoppm: String,
    pub pdftotext: String,
}

#[derive(Debug, Clone)]
pub struct RenderConfig {
    /// Resolution at scale 1.0
    pub base_dpi: f32,
    /// Extra density multiplier so zoomed pages stay sharp
    pub oversample: f32,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        ToolsConfig {
            pdfinfo: "pdfinfo".to_string(),
            pdftoppm: "pdftoppm".to_string(),
            pdftotext: "pdftotext".to_string(),
        }
    }
}

impl Default for RenderConfig {
    fn default() -> Self {
        RenderConfig {
            base_dpi: 72.0,
            oversample: 2.0,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 3000,
            },
            cache: CacheConfig {
                dir: PathBuf::from("./cache"),
                metadata_entries: 256,
            },
            lookup: LookupConfig::Manifest { path: None },
            tools: ToolsConfig::default(),
            render: RenderConfig::default(),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, env::VarError> {
        let defaults = Config::default();

        let lookup = match (env::var("LOOKUP_URL"), env::var("LOOKUP_MANIFEST")) {
            (Ok(base_url), _) => LookupConfig::Http { base_url },
            (Err(_), Ok(path)) => LookupConfig::Manifest {
                path: Some(PathBuf::from(path)),
            },
            (Err(_), Err(_)) => LookupConfig::Manifest { path: None },
        };

        Ok(Config {
            server: ServerConfig {
                host: env::var("SERVER_HOST").unwrap_or(defaults.server.host),
                port: parse_or("SERVER_PORT", defaults.server.port),
            },
            cache: CacheConfig {
                dir: env::var("CACHE_DIR")
                    .map(PathBuf::from)
                    .unwrap_or(defaults.cache.dir),
                metadata_entries: parse_or("METADATA_CACHE_SIZE", defaults.cache.metadata_entries),
            },
            lookup,
            tools: ToolsConfig {
                pdfinfo: env::var("PDFINFO_PATH").unwrap_or(defaults.tools.pdfinfo),
                pdftoppm: env::var("PDFTOPPM_PATH").unwrap_or(defaults.tools.pdftoppm),
                pdftotext: env::var("PDFTOTEXT_PATH").unwrap_or(defaults.tools.pdftotext),
            },
            render: RenderConfig {
                base_dpi: parse_or("RENDER_BASE_DPI", defaults.render.base_dpi),
                oversample: parse_or("RENDER_OVERSAMPLE", defaults.render.oversample),
            },
        })
    }
}

/// Parse an optional variable, falling back to `default` when unset or invalid
fn parse_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|value| value.parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_cache_layout() {
        let config = Config::default();
        assert_eq!(config.cache.documents_dir(), PathBuf::from("./cache/documents"));
        assert_eq!(config.cache.renders_dir(), PathBuf::from("./cache/renders"));
    }

    #[test]
    fn test_parse_or_falls_back_on_garbage() {
        env::set_var("DOCSERVE_TEST_PORT", "not-a-number");
        assert_eq!(parse_or("DOCSERVE_TEST_PORT", 3000u16), 3000);
        env::set_var("DOCSERVE_TEST_PORT", "8080");
        assert_eq!(parse_or("DOCSERVE_TEST_PORT", 3000u16), 8080);
        env::remove_var("DOCSERVE_TEST_PORT");
        assert_eq!(parse_or("DOCSERVE_TEST_PORT", 3000u16), 3000);
    }
}
