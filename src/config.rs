use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

/// Deployment environment, controls the URL scheme advertised in listings.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Environment {
    Local,
    Production,
}

impl Environment {
    /// `local` (any casing) selects the insecure scheme; every other value is
    /// treated as a deployed environment.
    pub fn parse(value: &str) -> Self {
        if value.eq_ignore_ascii_case("local") {
            Environment::Local
        } else {
            Environment::Production
        }
    }

    pub fn scheme(self) -> &'static str {
        match self {
            Environment::Local => "http://",
            Environment::Production => "https://",
        }
    }
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct ServerSection {
    pub port: Option<u16>,
    pub upload_dir: Option<String>,
    pub thumbnail_dir: Option<String>,
    pub index_file: Option<String>,
    pub environment: Option<String>,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct LimitsSection {
    pub max_upload_size: Option<u64>,
    pub cleanup_interval_seconds: Option<u64>,
    pub partial_max_age_seconds: Option<u64>,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct ConfigFile {
    #[serde(default)]
    pub server: ServerSection,
    #[serde(default)]
    pub limits: LimitsSection,
}

#[derive(Clone, Debug)]
pub struct Config {
    pub port: u16,
    pub upload_dir: PathBuf,
    pub thumbnail_dir: PathBuf,
    pub index_file: PathBuf,
    pub environment: Environment,
    pub max_upload_size: u64,
    pub cleanup_interval: Duration,
    pub partial_max_age: Duration,
}

impl Config {
    /// Load configuration from an optional `config.toml` in the working
    /// directory, with environment variables taking precedence over the file.
    pub fn load() -> anyhow::Result<Self> {
        let base_dir = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));

        let config_path = base_dir.join("config.toml");
        let file = if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            toml::from_str::<ConfigFile>(&content)?
        } else {
            ConfigFile::default()
        };

        let port = std::env::var("PORT")
            .ok()
            .and_then(|v| v.parse().ok())
            .or(file.server.port)
            .unwrap_or(8080);

        let upload_dir_str = std::env::var("UPLOAD_DIR")
            .ok()
            .or(file.server.upload_dir)
            .unwrap_or_else(|| "resources/uploaded".to_string());

        let thumbnail_dir_str = std::env::var("THUMBNAIL_DIR")
            .ok()
            .or(file.server.thumbnail_dir)
            .unwrap_or_else(|| "resources/thumbnails".to_string());

        let index_file_str = std::env::var("INDEX_FILE")
            .ok()
            .or(file.server.index_file)
            .unwrap_or_else(|| "static/index.html".to_string());

        let environment = std::env::var("APP_ENV")
            .ok()
            .or(file.server.environment)
            .map(|v| Environment::parse(&v))
            .unwrap_or(Environment::Production);

        let max_upload_size = std::env::var("MAX_UPLOAD_SIZE")
            .ok()
            .and_then(|v| v.parse().ok())
            .or(file.limits.max_upload_size)
            .unwrap_or(1024 * 1024 * 1024);

        let cleanup_interval =
            Duration::from_secs(file.limits.cleanup_interval_seconds.unwrap_or(900));
        let partial_max_age =
            Duration::from_secs(file.limits.partial_max_age_seconds.unwrap_or(3600));

        Ok(Self {
            port,
            upload_dir: resolve_dir(&base_dir, &upload_dir_str),
            thumbnail_dir: resolve_dir(&base_dir, &thumbnail_dir_str),
            index_file: resolve_dir(&base_dir, &index_file_str),
            environment,
            max_upload_size,
            cleanup_interval,
            partial_max_age,
        })
    }
}

/// Absolute paths pass through untouched, relative paths resolve against the
/// working directory.
fn resolve_dir(base_dir: &Path, value: &str) -> PathBuf {
    let path = PathBuf::from(value);
    if path.is_absolute() {
        path
    } else {
        base_dir.join(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn local_environment_selects_insecure_scheme() {
        assert_eq!(Environment::parse("local"), Environment::Local);
        assert_eq!(Environment::parse("LOCAL"), Environment::Local);
        assert_eq!(Environment::Local.scheme(), "http://");
    }

    #[test]
    fn any_other_environment_selects_secure_scheme() {
        for value in ["production", "staging", "dev", ""] {
            assert_eq!(Environment::parse(value), Environment::Production);
        }
        assert_eq!(Environment::Production.scheme(), "https://");
    }

    #[test]
    fn config_file_sections_are_optional() {
        let file: ConfigFile = toml::from_str("").unwrap();
        assert!(file.server.port.is_none());
        assert!(file.limits.max_upload_size.is_none());

        let file: ConfigFile = toml::from_str(
            r#"
            [server]
            port = 9000
            environment = "local"

            [limits]
            max_upload_size = 1048576
            "#,
        )
        .unwrap();
        assert_eq!(file.server.port, Some(9000));
        assert_eq!(file.server.environment.as_deref(), Some("local"));
        assert_eq!(file.limits.max_upload_size, Some(1048576));
    }

    #[test]
    fn relative_paths_resolve_against_base() {
        let base = PathBuf::from("/srv/app");
        assert_eq!(
            resolve_dir(&base, "resources/uploaded"),
            PathBuf::from("/srv/app/resources/uploaded")
        );
        assert_eq!(resolve_dir(&base, "/var/media"), PathBuf::from("/var/media"));
    }
}
