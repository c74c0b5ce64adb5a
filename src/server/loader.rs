//! Configuration loading
//!
//! Layers, lowest priority first: the embedded `config/default.toml`, the
//! optional `config/default`, `config/$PIXELBOARD_ENV` and `config/local`
//! files, then `PIXELBOARD_*` environment variables.

use super::config::AppConfig;
use anyhow::{Context, Result};
use config::{Config, Environment, File, FileFormat};

/// Embedded default configuration (compiled into binary)
pub const DEFAULT_CONFIG: &str = include_str!("../../config/default.toml");

/// Environment variable prefix, e.g. `PIXELBOARD_CANVAS__WIDTH`
const ENV_PREFIX: &str = "PIXELBOARD";

/// Load configuration from files and environment
pub fn load_config() -> Result<AppConfig> {
    let profile = std::env::var("PIXELBOARD_ENV").unwrap_or_else(|_| "development".to_string());
    load_layers(&profile, environment())
}

/// `PIXELBOARD_SECTION__KEY` maps to `section.key`
fn environment() -> Environment {
    Environment::with_prefix(ENV_PREFIX)
        .prefix_separator("_")
        .separator("__")
        .try_parsing(true)
}

fn load_layers(profile: &str, env: Environment) -> Result<AppConfig> {
    let config = Config::builder()
        .add_source(File::from_str(DEFAULT_CONFIG, FileFormat::Toml))
        .add_source(File::with_name("config/default").required(false))
        .add_source(File::with_name(&format!("config/{profile}")).required(false))
        .add_source(File::with_name("config/local").required(false))
        .add_source(env)
        .build()
        .context("Failed to build configuration")?;

    config
        .try_deserialize()
        .context("Failed to deserialize configuration")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env_from(vars: &[(&str, &str)]) -> Environment {
        let map: config::Map<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        environment().source(Some(map))
    }

    #[test]
    fn test_embedded_defaults_parse() {
        let config: AppConfig = Config::builder()
            .add_source(File::from_str(DEFAULT_CONFIG, FileFormat::Toml))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();

        assert_eq!(config.server.port, 8080);
        assert_eq!(config.canvas.width, 100);
        assert_eq!(config.canvas.height, 100);
        assert_eq!(config.canvas.color_domain_size, 10);
        assert_eq!(config.canvas.flush_interval_secs, 1);
        assert!(config.database.url.starts_with("sqlite:"));
    }

    #[test]
    fn test_env_overrides_defaults() {
        let env = env_from(&[
            ("PIXELBOARD_CANVAS__WIDTH", "40"),
            ("PIXELBOARD_CANVAS__SUBSCRIBER_BUFFER", "32"),
            ("PIXELBOARD_SERVER__PORT", "9090"),
        ]);
        let config = load_layers("test-missing-profile", env).unwrap();

        assert_eq!(config.canvas.width, 40);
        assert_eq!(config.canvas.subscriber_buffer, 32);
        assert_eq!(config.server.port, 9090);
        // Untouched keys keep their defaults
        assert_eq!(config.canvas.height, 100);
        assert_eq!(config.canvas.color_domain_size, 10);
    }

    #[test]
    fn test_env_without_prefix_is_ignored() {
        let env = env_from(&[("CANVAS__WIDTH", "7"), ("OTHER_CANVAS__WIDTH", "7")]);
        let config = load_layers("test-missing-profile", env).unwrap();

        assert_eq!(config.canvas.width, 100);
    }

    #[test]
    fn test_env_rejects_unparseable_value() {
        let env = env_from(&[("PIXELBOARD_CANVAS__WIDTH", "wide")]);
        assert!(load_layers("test-missing-profile", env).is_err());
    }
}
