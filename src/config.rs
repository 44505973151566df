use anyhow::{Context, Result};
use config::{Environment, File, Source};
use serde::{Deserialize, Serialize};

const CONFIG_FILE: &str = "nfce_scraper";
const ENV_PREFIX: &str = "NFCE";

/// Placeholder replaced by the percent-encoded QR payload.
pub const PAYLOAD_PLACEHOLDER: &str = "{payload}";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    pub portal: PortalConfig,
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub log: LogConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortalConfig {
    pub url_template: String,
    pub user_agent: String,
    pub timeout_seconds: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub path: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LogConfig {
    pub json: bool,
}

impl Default for PortalConfig {
    fn default() -> Self {
        Self {
            url_template: "https://portalsped.fazenda.mg.gov.br/portalnfce/sistema/qrcode.xhtml?p={payload}".to_string(),
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/108.0.0.0 Safari/537.36".to_string(),
            timeout_seconds: 30,
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: "invoices.db".to_string(),
        }
    }
}

impl Config {
    /// Defaults, then `nfce_scraper.{toml,yaml,json}` if present, then
    /// `NFCE_*` environment variables (`NFCE_SERVER__PORT=9000`).
    pub fn load() -> Result<Self> {
        Self::layered(File::with_name(CONFIG_FILE).required(false))
    }

    fn layered<S>(file: S) -> Result<Self>
    where
        S: Source + Send + Sync + 'static,
    {
        let defaults = ::config::Config::try_from(&Config::default())
            .context("Failed to serialize default configuration")?;

        let config: Config = ::config::Config::builder()
            .add_source(defaults)
            .add_source(file)
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .context("Failed to load configuration")?
            .try_deserialize()
            .context("Invalid configuration")?;

        if !config.portal.url_template.contains(PAYLOAD_PLACEHOLDER) {
            anyhow::bail!(
                "portal.url_template must contain {} placeholder",
                PAYLOAD_PLACEHOLDER
            );
        }

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use config::FileFormat;

    #[test]
    fn defaults_point_at_the_minas_gerais_portal() {
        let config = Config::layered(File::from_str("", FileFormat::Toml)).unwrap();

        assert!(config.portal.url_template.starts_with("https://portalsped.fazenda.mg.gov.br/"));
        assert_eq!(config.portal.timeout_seconds, 30);
        assert_eq!(config.database.path, "invoices.db");
        assert!(!config.log.json);
    }

    #[test]
    fn file_overrides_defaults() {
        let file = File::from_str(
            "[server]\nhost = \"0.0.0.0\"\nport = 9000\n\n[log]\njson = true\n",
            FileFormat::Toml,
        );

        let config = Config::layered(file).unwrap();

        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 9000);
        assert!(config.log.json);
        assert_eq!(config.portal.timeout_seconds, 30);
    }

    #[test]
    fn template_without_placeholder_is_rejected() {
        let file = File::from_str("[portal]\nurl_template = \"https://example.com/\"\n", FileFormat::Toml);
        assert!(Config::layered(file).is_err());
    }
}
