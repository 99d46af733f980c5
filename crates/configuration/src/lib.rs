//! # Meridian Configuration
//!
//! Strongly-typed settings for the analytics core. Strategies and the
//! backtester are *given* their parameters from here (dependency injection);
//! no other crate reads the config file itself.

pub mod error;
pub mod settings;

// Re-export the core types to provide a clean public API.
pub use error::ConfigError;
pub use settings::{
    BacktestDefaults, Config, MarketMakingParams, MomentumParams, Simulation, Strategies,
};

/// Loads the application configuration from the `config.toml` file.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from("config.toml")
}

/// Loads configuration from an explicit path, mostly useful in tests.
pub fn load_config_from(path: &str) -> Result<Config, ConfigError> {
    let builder = config::Config::builder()
        .add_source(config::File::with_name(path))
        .build()?;

    let config = builder.try_deserialize::<Config>()?;
    validate(&config)?;
    Ok(config)
}

fn validate(config: &Config) -> Result<(), ConfigError> {
    if config.instruments.is_empty() {
        return Err(ConfigError::ValidationError(
            "at least one instrument must be configured".to_string(),
        ));
    }
    if config.simulation.periods_per_year == 0 {
        return Err(ConfigError::ValidationError(
            "simulation.periods_per_year must be positive".to_string(),
        ));
    }
    if config.strategies.momentum.ma_short_period >= config.strategies.momentum.ma_long_period {
        return Err(ConfigError::ValidationError(
            "momentum short MA period must be less than the long MA period".to_string(),
        ));
    }
    Ok(())
}
