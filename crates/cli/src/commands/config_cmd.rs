//! `sessiondigest config`: Configuration management commands.

use std::path::Path;

use sessiondigest_config::AppConfig;

use super::run::load_config;

const REDACTED: &str = "[REDACTED]";

/// A copy of `config` safe to print.
pub fn redacted(config: &AppConfig) -> AppConfig {
    let mut config = config.clone();
    if config.api_key.is_some() {
        config.api_key = Some(REDACTED.into());
    }
    for provider in config.providers.values_mut() {
        if provider.api_key.is_some() {
            provider.api_key = Some(REDACTED.into());
        }
    }
    config
}

/// Non-fatal problems worth reporting for an otherwise valid config.
pub fn warnings(config: &AppConfig) -> Vec<String> {
    let mut warnings = Vec::new();

    let key_var = config.provider.api_key_env();
    if let (true, false, Some(var)) = (config.enrichment_enabled, config.has_api_key(), key_var) {
        warnings.push(format!(
            "Enrichment is enabled but no API key is set (set {var} or SESSIONDIGEST_API_KEY)"
        ));
    }

    if !config.input_dir.exists() {
        warnings.push(format!(
            "Input directory {} does not exist",
            config.input_dir.display()
        ));
    }

    warnings
}

pub async fn validate(path: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    println!("🔍 Validating configuration...");

    match load_config(path) {
        Ok(config) => {
            println!("   ✅ Config parsed successfully");

            let warnings = warnings(&config);
            if warnings.is_empty() {
                println!("   ✅ All checks passed");
            } else {
                println!();
                for w in &warnings {
                    println!("   ⚠️  {w}");
                }
            }

            println!();
            println!("   Provider:     {}", config.provider);
            println!("   Model:        {}", config.model_name);
            println!(
                "   Enrichment:   {} ({:?}{})",
                if config.enrichment_enabled { "on" } else { "off" },
                config.enrichment_mode,
                if config.enrichment_required { ", required" } else { "" }
            );
            println!("   Concurrency:  {}", config.max_concurrency);
            println!("   Input:        {}", config.input_dir.display());
            println!("   Output:       {}", config.output_dir.display());
        }
        Err(e) => {
            println!("   ❌ Config error: {e}");
            return Err(e);
        }
    }

    Ok(())
}

pub async fn show(path: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config(path).map_err(|e| format!("Failed to load config: {e}"))?;
    let toml_str = toml::to_string_pretty(&redacted(&config))?;
    println!("{toml_str}");
    Ok(())
}

pub async fn path() -> Result<(), Box<dyn std::error::Error>> {
    let config_path = AppConfig::config_dir().join("config.toml");
    println!("{}", config_path.display());
    Ok(())
}
