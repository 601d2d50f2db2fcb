use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

use crate::constants::{
    DEFAULT_LISTING_PATH, DEFAULT_MEDIA_HOST_PREFIX, DEFAULT_SITE_ORIGIN, DEFAULT_USER_AGENT,
};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {name}: {message}")]
    InvalidValue { name: String, message: String },
    #[error("failed to parse {name} as integer: {source}")]
    ParseInt {
        name: String,
        #[source]
        source: std::num::ParseIntError,
    },
    #[error("failed to parse {name} as boolean: {value}")]
    ParseBool { name: String, value: String },
    #[error("failed to read header file {path}: {source}")]
    ReadHeaders {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse header file {path}: {source}")]
    ParseHeaders {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    // Remote listing
    pub site_origin: String,
    pub listing_path: String,
    pub media_host_prefix: String,
    pub fetch_timeout: Duration,
    /// Header/cookie bundle sent verbatim with every listing request.
    pub request_headers: BTreeMap<String, String>,

    // Output
    pub output_dir: PathBuf,
    pub document_title: String,

    // Web Server
    pub web_host: String,
    pub web_port: u16,
    pub static_dir: PathBuf,
    pub open_browser: bool,
    pub session_idle: Duration,
}

/// On-disk shape of `REQUEST_HEADERS_PATH`.
#[derive(Debug, Default, Deserialize)]
struct HeaderFile {
    #[serde(default)]
    headers: BTreeMap<String, String>,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if a variable is malformed or the header file cannot be read.
    pub fn from_env() -> Result<Self, ConfigError> {
        let site_origin = env_or_default("SITE_ORIGIN", DEFAULT_SITE_ORIGIN);

        let mut request_headers = default_headers(&site_origin);
        if let Some(path) = optional_env("REQUEST_HEADERS_PATH") {
            request_headers.extend(load_header_file(Path::new(&path))?);
        }
        if let Some(cookie) = optional_env("REMOTE_COOKIE") {
            request_headers.insert("Cookie".to_string(), cookie);
        }

        Ok(Self {
            // Remote listing
            site_origin,
            listing_path: env_or_default("LISTING_PATH", DEFAULT_LISTING_PATH),
            media_host_prefix: env_or_default("MEDIA_HOST_PREFIX", DEFAULT_MEDIA_HOST_PREFIX),
            fetch_timeout: Duration::from_secs(parse_env_u64("FETCH_TIMEOUT_SECS", 30)?),
            request_headers,

            // Output
            output_dir: optional_env("OUTPUT_DIR").map_or_else(std::env::temp_dir, PathBuf::from),
            document_title: env_or_default("DOCUMENT_TITLE", "favorites archive"),

            // Web Server
            web_host: env_or_default("WEB_HOST", "127.0.0.1"),
            web_port: parse_env_u16("WEB_PORT", 4455)?,
            static_dir: PathBuf::from(env_or_default("STATIC_DIR", "./static")),
            open_browser: parse_env_bool("OPEN_BROWSER", true)?,
            session_idle: Duration::from_secs(parse_env_u64("SESSION_IDLE_SECS", 3600)?),
        })
    }

    /// A complete configuration for tests, pointing at nothing in particular.
    #[must_use]
    pub fn for_testing() -> Self {
        Self {
            site_origin: "https://forum.example.com".to_string(),
            listing_path: DEFAULT_LISTING_PATH.to_string(),
            media_host_prefix: "https://media.example.com/i/".to_string(),
            fetch_timeout: Duration::from_secs(5),
            request_headers: default_headers("https://forum.example.com"),
            output_dir: std::env::temp_dir(),
            document_title: "favorites archive".to_string(),
            web_host: "127.0.0.1".to_string(),
            web_port: 0,
            static_dir: PathBuf::from("./static"),
            open_browser: false,
            session_idle: Duration::from_secs(3600),
        }
    }

    /// Validate that the configuration is usable.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if url::Url::parse(&self.site_origin).is_err() {
            return Err(ConfigError::InvalidValue {
                name: "SITE_ORIGIN".to_string(),
                message: format!("'{}' is not an absolute URL", self.site_origin),
            });
        }
        if !self.listing_path.starts_with('/') {
            return Err(ConfigError::InvalidValue {
                name: "LISTING_PATH".to_string(),
                message: "must start with '/'".to_string(),
            });
        }
        if self.media_host_prefix.is_empty() {
            return Err(ConfigError::InvalidValue {
                name: "MEDIA_HOST_PREFIX".to_string(),
                message: "cannot be empty".to_string(),
            });
        }
        if self.fetch_timeout.is_zero() {
            return Err(ConfigError::InvalidValue {
                name: "FETCH_TIMEOUT_SECS".to_string(),
                message: "must be at least 1".to_string(),
            });
        }
        Ok(())
    }

    /// URL the local UI is reachable at.
    #[must_use]
    pub fn local_url(&self) -> String {
        format!("http://{}:{}", self.web_host, self.web_port)
    }
}

/// Headers a browser would send for the listing's XHR request.
///
/// `Accept-Encoding` is left to reqwest so responses are decompressed.
fn default_headers(site_origin: &str) -> BTreeMap<String, String> {
    [
        ("User-Agent", DEFAULT_USER_AGENT.to_string()),
        ("Accept", "*/*".to_string()),
        ("Accept-Language", "tr-TR,tr;q=0.8,en-US;q=0.5,en;q=0.3".to_string()),
        ("X-Requested-With", "XMLHttpRequest".to_string()),
        ("Referer", format!("{}/", site_origin.trim_end_matches('/'))),
        ("Cache-Control", "no-cache".to_string()),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v))
    .collect()
}

fn load_header_file(path: &Path) -> Result<BTreeMap<String, String>, ConfigError> {
    let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::ReadHeaders {
        path: path.to_path_buf(),
        source,
    })?;
    parse_header_file(&raw).map_err(|source| ConfigError::ParseHeaders {
        path: path.to_path_buf(),
        source,
    })
}

fn parse_header_file(raw: &str) -> Result<BTreeMap<String, String>, toml::de::Error> {
    toml::from_str::<HeaderFile>(raw).map(|file| file.headers)
}

fn optional_env(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|s| !s.is_empty())
}

fn env_or_default(name: &str, default: &str) -> String {
    std::env::var(name)
        .ok()
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| default.to_string())
}

fn parse_env_u64(name: &str, default: u64) -> Result<u64, ConfigError> {
    match std::env::var(name) {
        Ok(val) if !val.is_empty() => val.parse().map_err(|e| ConfigError::ParseInt {
            name: name.to_string(),
            source: e,
        }),
        _ => Ok(default),
    }
}

fn parse_env_u16(name: &str, default: u16) -> Result<u16, ConfigError> {
    match std::env::var(name) {
        Ok(val) if !val.is_empty() => val.parse().map_err(|e| ConfigError::ParseInt {
            name: name.to_string(),
            source: e,
        }),
        _ => Ok(default),
    }
}

fn parse_env_bool(name: &str, default: bool) -> Result<bool, ConfigError> {
    match std::env::var(name) {
        Ok(val) if !val.is_empty() => match val.to_lowercase().as_str() {
            "true" | "1" | "yes" | "on" => Ok(true),
            "false" | "0" | "no" | "off" => Ok(false),
            _ => Err(ConfigError::ParseBool {
                name: name.to_string(),
                value: val,
            }),
        },
        _ => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_bool() {
        assert!(parse_env_bool("FAVORITE_ARCHIVER_NONEXISTENT_VAR", true).unwrap());
        assert!(!parse_env_bool("FAVORITE_ARCHIVER_NONEXISTENT_VAR", false).unwrap());
    }

    #[test]
    fn test_parse_header_file() {
        let headers = parse_header_file(
            r#"
[headers]
Cookie = "iq=abc; ASP.NET_SessionId=xyz"
"User-Agent" = "custom-agent"
"#,
        )
        .unwrap();

        assert_eq!(headers.len(), 2);
        assert_eq!(headers["Cookie"], "iq=abc; ASP.NET_SessionId=xyz");
        assert_eq!(headers["User-Agent"], "custom-agent");
    }

    #[test]
    fn test_parse_header_file_without_table() {
        assert!(parse_header_file("").unwrap().is_empty());
        assert!(parse_header_file("headers = 3").is_err());
    }

    #[test]
    fn test_default_headers_referer() {
        let headers = default_headers("https://forum.example.com/");
        assert_eq!(headers["Referer"], "https://forum.example.com/");
        assert!(!headers.contains_key("Accept-Encoding"));
    }

    #[test]
    fn test_validate() {
        assert!(Config::for_testing().validate().is_ok());

        let bad_origin = Config {
            site_origin: "not a url".to_string(),
            ..Config::for_testing()
        };
        assert!(bad_origin.validate().is_err());

        let bad_path = Config {
            listing_path: "favori-entryleri".to_string(),
            ..Config::for_testing()
        };
        assert!(bad_path.validate().is_err());

        let zero_timeout = Config {
            fetch_timeout: Duration::ZERO,
            ..Config::for_testing()
        };
        assert!(zero_timeout.validate().is_err());
    }
}
