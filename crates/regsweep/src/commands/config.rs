//! Configuration commands

use crate::cli::{ConfigCommands, ConfigInitArgs, ConfigShowArgs};
use crate::output;
use anyhow::{anyhow, Context, Result};
use camino::{Utf8Path, Utf8PathBuf};
use regsweep_core::ConfigLoader;
use std::fs;

pub fn run(cmd: ConfigCommands, config_path: Option<&Utf8Path>) -> Result<()> {
    match cmd {
        ConfigCommands::Show(args) => show(args, config_path),
        ConfigCommands::Init(args) => init(args),
    }
}

/// Print the settings after defaults, files and environment are merged
fn show(args: ConfigShowArgs, config_path: Option<&Utf8Path>) -> Result<()> {
    let loader = ConfigLoader::new();
    let settings = loader.load(config_path)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&settings)?);
        return Ok(());
    }

    output::header("Resolved configuration");
    if let Some(global) = loader.global_config_path() {
        let state = if global.exists() { "" } else { " (not present)" };
        output::kv("Global config", &format!("{}{}", global, state));
    }
    if let Some(path) = config_path {
        output::kv("Config file", path.as_str());
    }
    println!();
    print!("{}", serde_yaml_ng::to_string(&settings)?);

    if let Err(e) = settings.policy_config() {
        output::warning(&e.to_string());
    }

    Ok(())
}

/// Write the embedded defaults as a starter config
fn init(args: ConfigInitArgs) -> Result<()> {
    let output_path = match args.output {
        Some(path) => path,
        None => default_config_path()?,
    };

    if output_path.exists() && !args.force {
        return Err(anyhow!(
            "{} already exists. Use --force to overwrite.",
            output_path
        ));
    }

    if let Some(parent) = output_path.parent() {
        if !parent.as_str().is_empty() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent))?;
        }
    }

    fs::write(&output_path, ConfigLoader::default_config_yaml()?)
        .with_context(|| format!("Failed to write {}", output_path))?;

    output::success(&format!("Created {}", output_path));
    Ok(())
}

fn default_config_path() -> Result<Utf8PathBuf> {
    ConfigLoader::new()
        .global_config_path()
        .ok_or_else(|| anyhow!("Could not determine home directory; pass --output"))
}
