//! `sessiondigest doctor`: Diagnose configuration and provider health.

use std::path::Path;

use sessiondigest_config::AppConfig;
use sessiondigest_core::Provider;

use super::run::load_config;

pub async fn run(path: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    println!("🩺 sessiondigest doctor");
    println!("======================\n");

    let mut issues = 0;

    let config_path = path
        .map(Path::to_path_buf)
        .unwrap_or_else(|| AppConfig::config_dir().join("config.toml"));
    if config_path.exists() {
        println!("  ✅ Config file found at {}", config_path.display());
    } else {
        println!("  ⚠️  No config file at {}, using defaults", config_path.display());
    }

    let config = match load_config(path) {
        Ok(config) => {
            println!("  ✅ Configuration valid");
            config
        }
        Err(e) => {
            println!("  ❌ Configuration invalid: {e}");
            println!("\n  ⚠️  1 issue(s) found. See above for details.");
            return Ok(());
        }
    };

    if config.input_dir.exists() {
        println!("  ✅ Input directory {} exists", config.input_dir.display());
    } else {
        println!("  ⚠️  Input directory {} not found", config.input_dir.display());
        issues += 1;
    }

    if config.enrichment_enabled {
        match sessiondigest_providers::build_from_config(&config) {
            Ok(provider) => match provider.health_check().await {
                Ok(true) => println!("  ✅ Provider {} reachable", config.provider),
                Ok(false) => {
                    println!("  ⚠️  Provider {} answered with an error", config.provider);
                    issues += 1;
                }
                Err(e) => {
                    println!("  ❌ Provider {} unreachable: {e}", config.provider);
                    issues += 1;
                }
            },
            Err(e) => {
                println!("  ❌ {e}");
                issues += 1;
            }
        }
    } else {
        println!("  ✅ Enrichment disabled, no provider needed");
    }

    println!();
    if issues == 0 {
        println!("  🎉 All checks passed!");
    } else {
        println!("  ⚠️  {issues} issue(s) found. See above for details.");
    }

    Ok(())
}
