//! Site configuration.
//!
//! Loaded from a TOML file (`~/.webbook/conf.toml` by default, overridable
//! via `WEBBOOK_CONF`), with individual environment variables winning over
//! file values for the handful of settings that differ per deployment.
//! Every field has a default so the site also runs with no config at all.

use {
    anyhow::{anyhow, Result as AnyResult},
    serde::{Deserialize, Serialize},
    std::path::PathBuf,
    webbook_sdk::{access::ACCESS_API_BASE, verify::VERIFY_API_BASE},
};

// Where to find the config file.
pub(crate) const SITE_CONF_PATH: &str = "~/.webbook/conf.toml";
pub(crate) const SITE_CONF_ENV: &str = "WEBBOOK_CONF";

/// Struct holding the config structure.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub(crate) struct SiteConf {
    #[serde(default)]
    pub(crate) listen: ListenConf,
    #[serde(default)]
    pub(crate) book: BookConf,
    #[serde(default)]
    pub(crate) backend: BackendConf,
}

impl SiteConf {
    pub(crate) async fn load() -> AnyResult<Self> {
        let conf_path = match std::env::var(SITE_CONF_ENV) {
            Ok(path) => expand_tilde(&path)?,
            Err(_) => expand_tilde(SITE_CONF_PATH)?,
        };

        Self::load_from_path(&conf_path).await
    }

    pub(crate) async fn load_from_path(path: &PathBuf) -> AnyResult<Self> {
        let conf = tokio::fs::read_to_string(path).await?;

        Ok(toml::from_str(&conf)?)
    }

    /// Applies the per-deployment environment overrides on top of whatever
    /// the file provided.
    pub(crate) fn with_env_overrides(mut self) -> Self {
        if let Ok(url) = std::env::var("WEBBOOK_VERIFY_URL") {
            self.backend.verify_base_url = url;
        }
        if let Ok(url) = std::env::var("WEBBOOK_ACCESS_URL") {
            self.backend.access_base_url = url;
        }
        if let Ok(url) = std::env::var("WEBBOOK_PRICE_URL") {
            self.backend.price_base_url = Some(url);
        }
        if let Ok(passphrase) = std::env::var("WEBBOOK_PASSPHRASE") {
            self.backend.passphrase = passphrase;
        }

        self
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub(crate) struct ListenConf {
    #[serde(default = "default_listen_addr")]
    pub(crate) addr: String,
    #[serde(default = "default_listen_port")]
    pub(crate) port: u16,
}

impl Default for ListenConf {
    fn default() -> Self {
        Self {
            addr: default_listen_addr(),
            port: default_listen_port(),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub(crate) struct BookConf {
    #[serde(default = "default_book_title")]
    pub(crate) title: String,
    /// Fixed USD price of the book; the crypto amount is derived from it.
    #[serde(default = "default_price_usd")]
    pub(crate) price_usd: f64,
    /// Asset id on the price API, e.g. "ergo".
    #[serde(default = "default_asset_id")]
    pub(crate) asset_id: String,
    /// Ticker shown next to amounts, e.g. "ERG".
    #[serde(default = "default_ticker")]
    pub(crate) ticker: String,
    /// The deposit address shown in the payment instructions.
    #[serde(default = "default_payment_address")]
    pub(crate) payment_address: String,
    /// Filesystem path of the free-sample PDF served at `/sample`.
    #[serde(default = "default_sample_path")]
    pub(crate) sample_path: PathBuf,
}

impl Default for BookConf {
    fn default() -> Self {
        Self {
            title: default_book_title(),
            price_usd: default_price_usd(),
            asset_id: default_asset_id(),
            ticker: default_ticker(),
            payment_address: default_payment_address(),
            sample_path: default_sample_path(),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub(crate) struct BackendConf {
    /// Base URL of the payment-verification backend.
    #[serde(default = "default_verify_base_url")]
    pub(crate) verify_base_url: String,
    /// Base URL of the access-check backend.
    #[serde(default = "default_access_base_url")]
    pub(crate) access_base_url: String,
    /// Base URL of the price API; `None` uses the public default.
    #[serde(default)]
    pub(crate) price_base_url: Option<String>,
    /// Shared passphrase for the staging gate. Empty disables the gate.
    #[serde(default)]
    pub(crate) passphrase: String,
}

impl Default for BackendConf {
    fn default() -> Self {
        Self {
            verify_base_url: default_verify_base_url(),
            access_base_url: default_access_base_url(),
            price_base_url: None,
            passphrase: String::new(),
        }
    }
}

/// Expands `~/` to the user's home directory in path arguments.
pub(crate) fn expand_tilde(path: &str) -> AnyResult<PathBuf> {
    if let Some(path) = path.strip_prefix("~/") {
        match home::home_dir() {
            Some(home) => return Ok(home.join(path)),
            None => return Err(anyhow!("Could not find home directory")),
        }
    }

    Ok(path.into())
}

// == Used by serde ==

fn default_listen_addr() -> String {
    "127.0.0.1".to_string()
}

fn default_listen_port() -> u16 {
    8080
}

fn default_book_title() -> String {
    "The Ergo Webbook".to_string()
}

fn default_price_usd() -> f64 {
    15.00
}

fn default_asset_id() -> String {
    "ergo".to_string()
}

fn default_ticker() -> String {
    "ERG".to_string()
}

fn default_payment_address() -> String {
    // Placeholder address; every deployment must set its own.
    "9fRAWhdxEsTcdb8PhGNrZfwqa65zfkuYHAMmkQLcic1gdLSV5vA".to_string()
}

fn default_sample_path() -> PathBuf {
    PathBuf::from("site/static/sample.pdf")
}

fn default_verify_base_url() -> String {
    VERIFY_API_BASE.to_string()
}

fn default_access_base_url() -> String {
    ACCESS_API_BASE.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_file_yields_defaults() {
        let conf: SiteConf = toml::from_str("").expect("Expected defaults to apply");

        assert_eq!(conf.listen.addr, "127.0.0.1");
        assert_eq!(conf.listen.port, 8080);
        assert_eq!(conf.book.price_usd, 15.00);
        assert_eq!(conf.book.asset_id, "ergo");
        assert_eq!(conf.backend.verify_base_url, VERIFY_API_BASE);
        assert!(conf.backend.passphrase.is_empty());
    }

    #[tokio::test]
    async fn test_load_from_path_reads_partial_config() {
        let dir = tempfile::tempdir().expect("Expected a temp dir");
        let path = dir.path().join("conf.toml");

        tokio::fs::write(
            &path,
            r#"
            [book]
            title = "A Different Book"
            price_usd = 9.5

            [backend]
            passphrase = "open sesame"
            "#,
        )
        .await
        .expect("Expected the config to be written");

        let conf = SiteConf::load_from_path(&path)
            .await
            .expect("Expected the config to load");

        assert_eq!(conf.book.title, "A Different Book");
        assert_eq!(conf.book.price_usd, 9.5);
        assert_eq!(conf.backend.passphrase, "open sesame");
        // Untouched sections keep their defaults.
        assert_eq!(conf.listen.port, 8080);
    }

    #[tokio::test]
    async fn test_load_from_missing_path_errors() {
        let result = SiteConf::load_from_path(&PathBuf::from("/definitely/not/here.toml")).await;

        assert!(result.is_err());
    }

    #[test]
    fn test_expand_tilde() {
        let expanded = expand_tilde("~/x/conf.toml").expect("Expected expansion");
        assert!(expanded.ends_with("x/conf.toml"));
        assert!(!expanded.to_string_lossy().starts_with('~'));

        let untouched = expand_tilde("/etc/webbook.toml").expect("Expected passthrough");
        assert_eq!(untouched, PathBuf::from("/etc/webbook.toml"));
    }
}
