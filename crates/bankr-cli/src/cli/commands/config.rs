//! Config command handlers.

use anyhow::{Context, Result};
use bankr_core::config;

pub fn path() {
    println!("{}", config::paths::config_path().display());
}

pub fn init() -> Result<()> {
    let config_path = config::paths::config_path();
    config::Config::init(&config_path)
        .with_context(|| format!("init config at {}", config_path.display()))?;
    println!("Created config at {}", config_path.display());
    Ok(())
}

pub fn set_base_url(url: &str) -> Result<()> {
    let config_path = config::paths::config_path();
    config::Config::save_base_url_to(&config_path, url)
        .with_context(|| format!("update config at {}", config_path.display()))?;
    let saved = config::Config::load_from(&config_path)?;
    println!("Base URL set to {}", saved.base_url);
    if std::env::var(config::BASE_URL_ENV).is_ok_and(|v| !v.trim().is_empty()) {
        println!(
            "  Note: {} is set and takes precedence.",
            config::BASE_URL_ENV
        );
    }
    Ok(())
}
