//! Status command handler

use anyhow::Result;

use modshelf_core::{Config, ModuleEngine};

use crate::output::{Output, OutputFormat};

/// Show which backend is serving the module set
pub async fn show(engine: &ModuleEngine, config: &Config, output: &Output) -> Result<()> {
    let status = engine.storage_status();
    let primary_path = config.primary_path();
    let fallback_path = config.fallback_path();

    // An unreadable store still gets a status report
    let count = match engine.load_blocks().await {
        Ok(modules) => Some(modules.len()),
        Err(e) => {
            tracing::warn!(error = %e, "could not read modules for status");
            None
        }
    };

    match output.format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::json!({
                    "active_backend": status.active_backend,
                    "primary": {
                        "enabled": config.primary_enabled,
                        "configured": status.primary_configured,
                        "available": status.primary_available,
                        "stale": status.primary_stale,
                        "path": primary_path,
                        "exists": primary_path.exists()
                    },
                    "fallback": {
                        "path": fallback_path,
                        "exists": fallback_path.exists()
                    },
                    "default_category": engine.default_category(),
                    "modules": count
                })
            );
        }
        OutputFormat::Quiet => {
            println!("{}", status.active_backend);
        }
        OutputFormat::Human => {
            println!("modshelf Status");
            println!("===============");
            println!();
            println!("Storage:");
            println!("  Active:   {}", status.active_backend);
            println!(
                "  Primary:  {}",
                if !config.primary_enabled {
                    "disabled"
                } else if !status.primary_configured {
                    "failed to open"
                } else if !status.primary_available {
                    "unavailable"
                } else if status.primary_stale {
                    "behind fallback"
                } else {
                    "ok"
                }
            );
            println!("  Database: {}", describe_path(&primary_path));
            println!("  Fallback: {}", describe_path(&fallback_path));
            println!();
            println!("Contents:");
            match count {
                Some(n) => println!("  Modules:  {}", n),
                None => println!("  Modules:  (unreadable)"),
            }
            println!("  Default category: {}", engine.default_category());
        }
    }

    Ok(())
}

fn describe_path(path: &std::path::Path) -> String {
    if path.exists() {
        path.display().to_string()
    } else {
        format!("{} (not created)", path.display())
    }
}
