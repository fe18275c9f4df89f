//! Agent configuration
//!
//! # Sources
//!
//! Layered, later wins:
//! 1. Built-in defaults
//! 2. Environment variables (`.env` is loaded by `main` beforehand)
//! 3. Optional JSON file, camelCase keys (`PRINT_AGENT_CONFIG`, default `./config.json`)
//!
//! | Environment variable | Default | Description |
//! |----------------------|---------|-------------|
//! | VPS_URL | https://lasreinascolusa.com | Main application base URL |
//! | TENANT_SLUG | lasreinas | Tenant whose orders are printed |
//! | AGENT_NAME | print-agent | Sent as `User-Agent: PrintAgent/{name}` |
//! | POLL_INTERVAL | 5000 | Auto feed poll interval (ms) |
//! | PRINTER_HOST | auto | `auto` scans the local /24, anything else is used as is |
//! | PRINTER_PORT | 9100 | Raw printing port |
//! | PRINT_AGENT_SECRET | - | Shared relay secret (header auth by default) |
//! | PRINT_RELAY_API_KEY | - | Same secret, older name (query auth by default) |
//! | AUTH_MODE | see above | `header` or `query` |
//! | TIMEZONE | America/Los_Angeles | Zone used for printed dates |
//! | PAPER_WIDTH | 32 | Characters per line (58mm: 32, 80mm: 48) |
//! | SHOP_NAME | tenant slug, upper-cased | Receipt header |
//! | SHOP_TAGLINE | - | Line under the header |
//! | SHOP_LOCATION | - | Line under the tagline |
//! | LOG_LEVEL | info | Overridden by `RUST_LOG` |
//! | LOG_DIR | - | Daily rolling log files when the directory exists |

use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono_tz::Tz;
use serde::Deserialize;
use thiserror::Error;

pub const DEFAULT_VPS_URL: &str = "https://lasreinascolusa.com";
pub const DEFAULT_TENANT_SLUG: &str = "lasreinas";
pub const DEFAULT_AGENT_NAME: &str = "print-agent";
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 5000;
pub const DEFAULT_TIMEZONE: &str = "America/Los_Angeles";
pub const DEFAULT_PAPER_WIDTH: usize = 32;
pub const DEFAULT_CONFIG_FILE: &str = "config.json";

/// Narrowest paper the receipt layout still fits on
const MIN_PAPER_WIDTH: usize = 24;

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("PRINT_AGENT_SECRET (or PRINT_RELAY_API_KEY) is not set")]
    MissingSecret,

    #[error("Unknown timezone: {0}")]
    InvalidTimezone(String),

    #[error("Poll interval must be greater than zero")]
    InvalidPollInterval,

    #[error("Paper width {0} is too narrow (minimum 24)")]
    InvalidPaperWidth(usize),

    #[error("Failed to read {path}: {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse {path}: {source}")]
    ParseFile {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// Where the printer is
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PrinterHost {
    /// Scan the local subnet at startup
    Auto,
    /// Fixed host name or IP
    Static(String),
}

impl PrinterHost {
    /// `auto` (any case) or an empty value means discovery
    pub fn parse(value: &str) -> Self {
        let value = value.trim();
        if value.is_empty() || value.eq_ignore_ascii_case("auto") {
            Self::Auto
        } else {
            Self::Static(value.to_string())
        }
    }
}

/// How the relay secret travels
///
/// The secret and tenant are always in the query string; `Header` additionally
/// sends `X-Print-Relay-Key` and `X-Tenant-Slug`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthStrategy {
    QueryParam,
    Header,
}

impl AuthStrategy {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "query" | "query_param" | "queryparam" => Some(Self::QueryParam),
            "header" | "headers" => Some(Self::Header),
            _ => None,
        }
    }
}

/// Agent configuration, immutable once loaded
#[derive(Debug, Clone)]
pub struct AgentConfig {
    pub vps_url: String,
    pub tenant_slug: String,
    pub agent_name: String,
    /// Auto feed poll interval (the manual queue is fixed at 2s)
    pub poll_interval_ms: u64,
    pub printer_host: PrinterHost,
    pub printer_port: u16,
    pub secret: String,
    pub auth: AuthStrategy,
    /// IANA zone name for printed dates
    pub timezone: String,
    /// Characters per line
    pub paper_width: usize,
    /// Receipt header; the tenant slug upper-cased when unset
    pub shop_name: Option<String>,
    pub shop_tagline: Option<String>,
    pub shop_location: Option<String>,
    pub log_level: String,
    pub log_dir: Option<String>,
}

/// Keys accepted in `config.json`
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileConfig {
    pub vps_url: Option<String>,
    pub tenant_slug: Option<String>,
    pub agent_name: Option<String>,
    pub poll_interval: Option<u64>,
    pub printer_host: Option<String>,
    pub printer_port: Option<u16>,
    pub secret: Option<String>,
    pub auth_mode: Option<String>,
    pub timezone: Option<String>,
    pub paper_width: Option<usize>,
    pub shop_name: Option<String>,
    pub shop_tagline: Option<String>,
    pub shop_location: Option<String>,
    pub log_level: Option<String>,
    pub log_dir: Option<String>,
}

impl AgentConfig {
    /// Load from environment variables
    ///
    /// Unset or unparseable values fall back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load from an arbitrary variable source
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let agent_secret = var("PRINT_AGENT_SECRET");
        let relay_key = var("PRINT_RELAY_API_KEY");
        // The agent variant authenticated with headers, the older relay with the query
        let default_auth = match (&agent_secret, &relay_key) {
            (None, Some(_)) => AuthStrategy::QueryParam,
            _ => AuthStrategy::Header,
        };

        Self {
            vps_url: var("VPS_URL").unwrap_or_else(|| DEFAULT_VPS_URL.into()),
            tenant_slug: var("TENANT_SLUG").unwrap_or_else(|| DEFAULT_TENANT_SLUG.into()),
            agent_name: var("AGENT_NAME").unwrap_or_else(|| DEFAULT_AGENT_NAME.into()),
            poll_interval_ms: var("POLL_INTERVAL")
                .and_then(|v| v.trim().parse().ok())
                .unwrap_or(DEFAULT_POLL_INTERVAL_MS),
            printer_host: var("PRINTER_HOST")
                .map(|v| PrinterHost::parse(&v))
                .unwrap_or(PrinterHost::Auto),
            printer_port: var("PRINTER_PORT")
                .and_then(|v| v.trim().parse().ok())
                .unwrap_or(relay_printer::DEFAULT_PRINTER_PORT),
            secret: agent_secret.or(relay_key).unwrap_or_default(),
            auth: var("AUTH_MODE")
                .and_then(|v| AuthStrategy::parse(&v))
                .unwrap_or(default_auth),
            timezone: var("TIMEZONE").unwrap_or_else(|| DEFAULT_TIMEZONE.into()),
            paper_width: var("PAPER_WIDTH")
                .and_then(|v| v.trim().parse().ok())
                .unwrap_or(DEFAULT_PAPER_WIDTH),
            shop_name: var("SHOP_NAME"),
            shop_tagline: var("SHOP_TAGLINE"),
            shop_location: var("SHOP_LOCATION"),
            log_level: var("LOG_LEVEL").unwrap_or_else(|| "info".into()),
            log_dir: var("LOG_DIR"),
        }
    }

    /// Environment, then the config file on top
    ///
    /// A missing file is normal. A file that cannot be read or parsed is
    /// skipped; the error is handed back so it can be reported once logging
    /// is up.
    pub fn load() -> (Self, Option<ConfigError>) {
        let mut config = Self::from_env();
        let path = std::env::var("PRINT_AGENT_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_FILE));

        match read_config_file(&path) {
            Ok(Some(file)) => {
                config.apply_file(file);
                (config, None)
            }
            Ok(None) => (config, None),
            Err(e) => (config, Some(e)),
        }
    }

    /// Overlay values present in the config file
    pub fn apply_file(&mut self, file: FileConfig) {
        fn set<T>(slot: &mut T, value: Option<T>) {
            if let Some(value) = value {
                *slot = value;
            }
        }

        set(&mut self.vps_url, file.vps_url);
        set(&mut self.tenant_slug, file.tenant_slug);
        set(&mut self.agent_name, file.agent_name);
        set(&mut self.poll_interval_ms, file.poll_interval);
        set(
            &mut self.printer_host,
            file.printer_host.map(|h| PrinterHost::parse(&h)),
        );
        set(&mut self.printer_port, file.printer_port);
        set(&mut self.secret, file.secret.filter(|s| !s.is_empty()));
        set(
            &mut self.auth,
            file.auth_mode.as_deref().and_then(AuthStrategy::parse),
        );
        set(&mut self.timezone, file.timezone);
        set(&mut self.paper_width, file.paper_width);
        set(&mut self.shop_name, file.shop_name.map(Some));
        set(&mut self.shop_tagline, file.shop_tagline.map(Some));
        set(&mut self.shop_location, file.shop_location.map(Some));
        set(&mut self.log_level, file.log_level);
        set(&mut self.log_dir, file.log_dir.map(Some));
    }

    /// Reject configurations the agent cannot run with
    pub fn validate(&self) -> ConfigResult<()> {
        if self.secret.trim().is_empty() {
            return Err(ConfigError::MissingSecret);
        }
        self.tz()?;
        if self.poll_interval_ms == 0 {
            return Err(ConfigError::InvalidPollInterval);
        }
        if self.paper_width < MIN_PAPER_WIDTH {
            return Err(ConfigError::InvalidPaperWidth(self.paper_width));
        }
        Ok(())
    }

    /// Parsed timezone
    pub fn tz(&self) -> ConfigResult<Tz> {
        self.timezone
            .parse()
            .map_err(|_| ConfigError::InvalidTimezone(self.timezone.clone()))
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn shop_name(&self) -> String {
        self.shop_name
            .clone()
            .unwrap_or_else(|| self.tenant_slug.to_uppercase())
    }

    /// Base URL without trailing slash
    pub fn base_url(&self) -> &str {
        self.vps_url.trim_end_matches('/')
    }
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self::from_lookup(|_| None)
    }
}

/// Read a config file; `Ok(None)` when it does not exist
pub fn read_config_file(path: &Path) -> ConfigResult<Option<FileConfig>> {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(source) => {
            return Err(ConfigError::ReadFile {
                path: path.to_path_buf(),
                source,
            });
        }
    };

    serde_json::from_str(&content)
        .map(Some)
        .map_err(|source| ConfigError::ParseFile {
            path: path.to_path_buf(),
            source,
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    fn from_vars(vars: &[(&str, &str)]) -> AgentConfig {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AgentConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = AgentConfig::default();
        assert_eq!(config.vps_url, DEFAULT_VPS_URL);
        assert_eq!(config.tenant_slug, "lasreinas");
        assert_eq!(config.agent_name, "print-agent");
        assert_eq!(config.poll_interval_ms, 5000);
        assert_eq!(config.printer_host, PrinterHost::Auto);
        assert_eq!(config.printer_port, 9100);
        assert_eq!(config.shop_name(), "LASREINAS");
        assert!(matches!(config.validate(), Err(ConfigError::MissingSecret)));
    }

    #[test]
    fn test_env_values_and_bad_numbers() {
        let config = from_vars(&[
            ("VPS_URL", "https://example.test/"),
            ("POLL_INTERVAL", "abc"),
            ("PRINTER_HOST", "192.168.1.44"),
            ("PRINTER_PORT", "9101"),
            ("PRINT_AGENT_SECRET", "s3cret"),
        ]);

        assert_eq!(config.base_url(), "https://example.test");
        assert_eq!(config.poll_interval_ms, DEFAULT_POLL_INTERVAL_MS);
        assert_eq!(
            config.printer_host,
            PrinterHost::Static("192.168.1.44".into())
        );
        assert_eq!(config.printer_port, 9101);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_auth_follows_secret_source() {
        let agent = from_vars(&[("PRINT_AGENT_SECRET", "a")]);
        assert_eq!(agent.auth, AuthStrategy::Header);

        let relay = from_vars(&[("PRINT_RELAY_API_KEY", "b")]);
        assert_eq!(relay.auth, AuthStrategy::QueryParam);
        assert_eq!(relay.secret, "b");

        let both = from_vars(&[("PRINT_AGENT_SECRET", "a"), ("PRINT_RELAY_API_KEY", "b")]);
        assert_eq!(both.secret, "a");

        let forced = from_vars(&[("PRINT_RELAY_API_KEY", "b"), ("AUTH_MODE", "HEADER")]);
        assert_eq!(forced.auth, AuthStrategy::Header);
    }

    #[test]
    fn test_printer_host_parse() {
        assert_eq!(PrinterHost::parse("auto"), PrinterHost::Auto);
        assert_eq!(PrinterHost::parse(" AUTO "), PrinterHost::Auto);
        assert_eq!(PrinterHost::parse(""), PrinterHost::Auto);
        assert_eq!(
            PrinterHost::parse("printer.local"),
            PrinterHost::Static("printer.local".into())
        );
    }

    #[test]
    fn test_file_overrides_env() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"tenantSlug": "tacos", "pollInterval": 3000, "printerHost": "10.0.0.9", "secret": "from-file", "shopName": "TACOS"}}"#
        )
        .unwrap();

        let mut config = from_vars(&[("TENANT_SLUG", "lasreinas"), ("PRINT_AGENT_SECRET", "env")]);
        let parsed = read_config_file(file.path()).unwrap().unwrap();
        config.apply_file(parsed);

        assert_eq!(config.tenant_slug, "tacos");
        assert_eq!(config.poll_interval_ms, 3000);
        assert_eq!(config.printer_host, PrinterHost::Static("10.0.0.9".into()));
        assert_eq!(config.secret, "from-file");
        assert_eq!(config.shop_name(), "TACOS");
        // Untouched keys keep their env/default values
        assert_eq!(config.agent_name, DEFAULT_AGENT_NAME);
    }

    #[test]
    fn test_missing_and_malformed_files() {
        let dir = tempfile::tempdir().unwrap();
        assert!(
            read_config_file(&dir.path().join("nope.json"))
                .unwrap()
                .is_none()
        );

        let bad = dir.path().join("config.json");
        std::fs::write(&bad, "{ not json").unwrap();
        assert!(matches!(
            read_config_file(&bad),
            Err(ConfigError::ParseFile { .. })
        ));
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = from_vars(&[("PRINT_AGENT_SECRET", "x")]);
        assert!(config.validate().is_ok());

        config.timezone = "Mars/Olympus".into();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidTimezone(_))
        ));

        config.timezone = DEFAULT_TIMEZONE.into();
        config.poll_interval_ms = 0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidPollInterval)
        ));

        config.poll_interval_ms = 5000;
        config.paper_width = 10;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidPaperWidth(10))
        ));
    }
}
