use crate::config::AppConfig;
use anyhow::Result;
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};

/// Default location of the keeper configuration file.
pub const DEFAULT_CONFIG_PATH: &str = "config/Keeper.toml";

pub struct ConfigLoader;

impl ConfigLoader {
    fn figment(path: &str) -> Figment {
        Figment::from(Serialized::defaults(AppConfig::default()))
            .merge(Toml::file(path))
    }

    /// Loads configuration from defaults, the TOML file at `path`, and
    /// `KEEPER_`-prefixed environment variables (`__` separates sections).
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be parsed or a value has the wrong type.
    pub fn load(path: &str) -> Result<AppConfig> {
        let config: AppConfig = Self::figment(path)
            .merge(Env::prefixed("KEEPER_").split("__"))
            .extract()?;

        tracing::debug!(path, "Configuration loaded");
        Ok(config)
    }

    /// Loads configuration with a profile overlay (`Keeper.{profile}.toml`
    /// next to `path`).
    ///
    /// # Errors
    ///
    /// Returns an error if configuration files cannot be read or parsed.
    pub fn load_with_profile(path: &str, profile: &str) -> Result<AppConfig> {
        let profile_path = match path.rsplit_once(".toml") {
            Some((stem, _)) => format!("{stem}.{profile}.toml"),
            None => format!("{path}.{profile}.toml"),
        };

        let config: AppConfig = Self::figment(path)
            .merge(Toml::file(&profile_path))
            .merge(Env::prefixed("KEEPER_").split("__"))
            .extract()?;

        tracing::debug!(path, profile_path = %profile_path, "Configuration loaded with profile");
        Ok(config)
    }
}
