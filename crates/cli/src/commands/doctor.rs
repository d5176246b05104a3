//! `askfolio doctor`: Diagnose configuration and knowledge base.

use std::path::Path;

use askfolio_agent::RagPipeline;
use askfolio_config::{AppConfig, DEFAULT_CONFIG_FILE};

pub async fn run(config_path: Option<&Path>, ping: bool) -> Result<(), Box<dyn std::error::Error>> {
    println!("askfolio doctor");
    println!("===============\n");

    let mut issues = 0;

    let path = config_path.unwrap_or(Path::new(DEFAULT_CONFIG_FILE));
    if path.exists() {
        println!("  ok   Config file found: {}", path.display());
    } else {
        println!("  --   No config file at {}, using defaults", path.display());
    }

    let config = match AppConfig::load_with_env(path) {
        Ok(config) => {
            println!("  ok   Config valid");
            config
        }
        Err(e) => {
            println!("  FAIL Config invalid: {e}");
            println!("\n  1 issue found. Fix the config before continuing.");
            return Ok(());
        }
    };

    if config.has_api_key() {
        println!("  ok   API key configured");
    } else {
        println!("  WARN No API key configured, set ASKFOLIO_API_KEY or OPENAI_API_KEY");
        issues += 1;
    }

    println!(
        "  --   Provider: {} / model {}",
        config.provider.name, config.provider.model
    );

    let pipeline = RagPipeline::from_config(&config);
    match pipeline.store().resolve() {
        Some(found) => {
            let chunks = pipeline.chunks();
            println!("  ok   Knowledge base: {} ({} chunks)", found.display(), chunks.len());
            if chunks.is_empty() {
                println!("  WARN Knowledge base yields no chunks, answers will have no context");
                issues += 1;
            }
        }
        None => {
            println!("  WARN No knowledge base found. Tried:");
            for candidate in pipeline.store().candidates() {
                println!("         {}", candidate.display());
            }
            issues += 1;
        }
    }

    if ping {
        match pipeline.orchestrator() {
            Some(orchestrator) => match orchestrator.provider().health_check().await {
                Ok(true) => println!("  ok   Provider reachable"),
                Ok(false) => {
                    println!("  FAIL Provider answered but rejected the health check");
                    issues += 1;
                }
                Err(e) => {
                    println!("  FAIL Provider unreachable: {e}");
                    issues += 1;
                }
            },
            None => {
                println!("  --   Skipping provider ping, no provider configured");
            }
        }
    }

    // Summary
    println!();
    if issues == 0 {
        println!("  All checks passed!");
    } else {
        println!("  {issues} issue(s) found. See above for details.");
    }

    Ok(())
}
