use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use url::Url;

use crate::error::{JrnlError, JrnlResult};

/// Top-level client configuration (loaded from jrnl.toml)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct JrnlConfig {
    pub server: ServerConfig,
    pub account: AccountConfig,
    pub crypto: CryptoConfig,
    pub log: LogConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Server root; API paths are resolved relative to it
    pub url: String,
    /// Refuse plaintext HTTP server URLs
    pub enforce_tls: bool,
    /// Whole-request timeout in seconds (0 = no timeout)
    pub timeout_secs: u64,
    /// User-Agent header sent with every request
    pub user_agent: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AccountConfig {
    /// Account username (also the scrypt salt of the root key)
    pub username: Option<String>,
    /// File holding the API auth token between invocations
    pub token_file: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CryptoConfig {
    /// Protocol version used for newly created journals (default: 2)
    pub protocol_version: u8,
    /// RSA modulus for newly generated account key pairs (default: 3072)
    pub rsa_key_bits: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Log level (default: info)
    pub level: String,
    /// Log format: "json" or "text"
    pub format: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:8000/".into(),
            enforce_tls: false,
            timeout_secs: 30,
            user_agent: concat!("jrnl/", env!("CARGO_PKG_VERSION")).into(),
        }
    }
}

impl Default for AccountConfig {
    fn default() -> Self {
        Self {
            username: None,
            token_file: PathBuf::from("~/.config/jrnl/token"),
        }
    }
}

impl Default for CryptoConfig {
    fn default() -> Self {
        Self {
            protocol_version: 2,
            rsa_key_bits: 3072,
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
            format: "text".into(),
        }
    }
}

impl JrnlConfig {
    /// Load from a TOML file; a missing file yields the defaults.
    pub fn load(path: &Path) -> JrnlResult<Self> {
        if !path.exists() {
            tracing::warn!("config file not found: {}  (using defaults)", path.display());
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }
}

impl ServerConfig {
    /// Parse the server URL, normalized to end with `/` so relative API
    /// paths join beneath it.
    ///
    /// With `enforce_tls`, an `http://` URL is rejected; otherwise it is
    /// accepted with a warning because auth tokens would travel in the clear.
    pub fn base_url(&self) -> JrnlResult<Url> {
        let mut raw = self.url.trim().to_string();
        if !raw.ends_with('/') {
            raw.push('/');
        }
        let url = Url::parse(&raw)
            .map_err(|e| JrnlError::Config(format!("invalid server url {raw:?}: {e}")))?;

        match url.scheme() {
            "https" => {}
            "http" if self.enforce_tls => {
                return Err(JrnlError::Config(format!(
                    "server url uses plaintext HTTP ({url}), but enforce_tls is enabled. \
                     Use an HTTPS url or set server.enforce_tls = false for local development."
                )));
            }
            "http" => {
                tracing::warn!(
                    url = %url,
                    "server url uses plaintext HTTP; auth tokens are transmitted unencrypted"
                );
            }
            other => {
                return Err(JrnlError::Config(format!(
                    "unsupported url scheme {other:?} in {url}"
                )));
            }
        }
        Ok(url)
    }
}

/// Expand a leading `~/` to `$HOME`.
pub fn expand_tilde(path: &Path) -> PathBuf {
    let s = path.to_string_lossy();
    if let Some(rest) = s.strip_prefix("~/") {
        let home = std::env::var("HOME").unwrap_or_default();
        PathBuf::from(home).join(rest)
    } else {
        path.to_path_buf()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_config() {
        let toml_str = r#"
[server]
url = "https://journal.example.com/"
enforce_tls = true
timeout_secs = 10
user_agent = "test-agent"

[account]
username = "alice@example.com"
token_file = "/tmp/jrnl-token"

[crypto]
protocol_version = 1
rsa_key_bits = 4096

[log]
level = "debug"
format = "json"
"#;
        let config: JrnlConfig = toml::from_str(toml_str).unwrap();

        assert_eq!(config.server.url, "https://journal.example.com/");
        assert!(config.server.enforce_tls);
        assert_eq!(config.server.timeout_secs, 10);
        assert_eq!(config.account.username.as_deref(), Some("alice@example.com"));
        assert_eq!(config.account.token_file, PathBuf::from("/tmp/jrnl-token"));
        assert_eq!(config.crypto.protocol_version, 1);
        assert_eq!(config.crypto.rsa_key_bits, 4096);
        assert_eq!(config.log.level, "debug");
        assert_eq!(config.log.format, "json");
    }

    #[test]
    fn test_parse_defaults() {
        let config: JrnlConfig = toml::from_str("").unwrap();

        assert_eq!(config.server.url, "http://localhost:8000/");
        assert!(!config.server.enforce_tls);
        assert_eq!(config.server.timeout_secs, 30);
        assert!(config.account.username.is_none());
        assert_eq!(config.crypto.protocol_version, 2);
        assert_eq!(config.crypto.rsa_key_bits, 3072);
        assert_eq!(config.log.level, "info");
    }

    #[test]
    fn test_parse_partial_config() {
        let toml_str = r#"
[server]
url = "http://192.168.1.100:8000"
"#;
        let config: JrnlConfig = toml::from_str(toml_str).unwrap();

        assert_eq!(config.server.url, "http://192.168.1.100:8000");
        assert_eq!(config.server.timeout_secs, 30);
        assert_eq!(config.crypto.protocol_version, 2);
    }

    #[test]
    fn test_serialize_roundtrip() {
        let config = JrnlConfig::default();
        let toml_str = toml::to_string(&config).unwrap();
        let parsed: JrnlConfig = toml::from_str(&toml_str).unwrap();

        assert_eq!(config.server.url, parsed.server.url);
        assert_eq!(config.account.token_file, parsed.account.token_file);
        assert_eq!(config.log.format, parsed.log.format);
    }

    #[test]
    fn test_base_url_gets_trailing_slash() {
        let server = ServerConfig {
            url: "https://journal.example.com/sync".into(),
            ..Default::default()
        };
        let url = server.base_url().unwrap();
        assert_eq!(url.as_str(), "https://journal.example.com/sync/");
        assert_eq!(
            url.join("api/v1/journals/").unwrap().as_str(),
            "https://journal.example.com/sync/api/v1/journals/"
        );
    }

    #[test]
    fn test_base_url_enforce_tls() {
        let server = ServerConfig {
            url: "http://insecure:8000/".into(),
            enforce_tls: true,
            ..Default::default()
        };
        let err = server.base_url().unwrap_err();
        assert!(err.to_string().contains("enforce_tls"));
    }

    #[test]
    fn test_base_url_http_allowed_without_enforcement() {
        let server = ServerConfig::default();
        assert!(server.base_url().is_ok());
    }

    #[test]
    fn test_base_url_rejects_other_schemes() {
        let server = ServerConfig {
            url: "ftp://journal.example.com/".into(),
            ..Default::default()
        };
        assert!(server.base_url().is_err());
    }

    #[test]
    fn test_load_missing_file_uses_defaults() {
        let tmp = tempfile::TempDir::new().unwrap();
        let config = JrnlConfig::load(&tmp.path().join("absent.toml")).unwrap();
        assert_eq!(config.server.url, "http://localhost:8000/");
    }

    #[test]
    fn test_load_invalid_file() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("jrnl.toml");
        std::fs::write(&path, "[server\nurl = 1").unwrap();
        let err = JrnlConfig::load(&path).unwrap_err();
        assert!(matches!(err, JrnlError::Toml(_)), "got {err:?}");
        assert!(err.to_string().starts_with("TOML error"));
    }

    #[test]
    fn test_load_wrong_field_type() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("jrnl.toml");
        std::fs::write(&path, "[crypto]\nprotocol_version = \"two\"\n").unwrap();
        assert!(matches!(JrnlConfig::load(&path), Err(JrnlError::Toml(_))));
    }

    #[test]
    fn test_expand_tilde() {
        let expanded = expand_tilde(Path::new("~/.config/jrnl/token"));
        assert!(!expanded.to_string_lossy().starts_with("~/"));
        assert_eq!(expand_tilde(Path::new("/abs/path")), PathBuf::from("/abs/path"));
    }
}
