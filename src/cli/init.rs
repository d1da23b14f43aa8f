//! Project initialization.
//!
//! Writes a commented `h5p-relay.toml`, the storage layout and a default
//! engine settings file into the current directory.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result, bail};
use serde::Serialize;

use crate::config::RelayConfig;
use crate::engine::fs::EngineSettings;
use crate::log;

/// Generate the config file content with comments
pub fn generate_config_template() -> Result<String> {
    let defaults = RelayConfig::default();
    let mut upload = section(&defaults.upload)?;
    upload.push_str("# temp_dir = \"tmp/uploads\"\n");

    let sections = [
        ("serve", "HTTP server and static assets", section(&defaults.serve)?),
        (
            "storage",
            "Engine settings file and storage roots, relative to this file",
            section(&defaults.storage)?,
        ),
        ("upload", "Body and upload limits in bytes", upload),
        ("engine", "Engine defaults", section(&defaults.engine)?),
        (
            "user",
            "Identity handed to the engine for every request",
            section(&defaults.user)?,
        ),
    ];

    let mut out = format!(
        "# h5p-relay configuration file (v{})\n\n",
        env!("CARGO_PKG_VERSION")
    );
    for (name, comment, body) in sections {
        out.push_str(&format!("# {comment}\n[{name}]\n{body}\n"));
    }
    Ok(out)
}

fn section<T: Serialize>(value: &T) -> Result<String> {
    toml::to_string(value).context("Failed to render config template")
}

/// Create the config file, storage roots and engine settings.
///
/// Refuses to overwrite an existing config file. With `dry_run` the
/// template is printed instead.
pub fn new_project(config: &RelayConfig, dry_run: bool) -> Result<()> {
    let template = generate_config_template()?;
    if dry_run {
        print!("{template}");
        return Ok(());
    }

    let config_path = &config.config_path;
    if config_path.exists() {
        bail!(
            "{} already exists, remove it first to re-initialize",
            config_path.display()
        );
    }

    for dir in [
        &config.serve.public_dir,
        &config.storage.libraries,
        &config.storage.temporary,
        &config.storage.content,
    ] {
        fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create directory '{}'", dir.display()))?;
    }
    write_engine_settings(&config.storage.engine_config)?;

    fs::write(config_path, template)
        .with_context(|| format!("Failed to write config file '{}'", config_path.display()))?;

    log!("init"; "wrote {}", config_path.display());
    log!("init"; "storage ready under {}", config.get_root().display());
    Ok(())
}

/// Default engine settings, unless the file already exists.
fn write_engine_settings(path: &Path) -> Result<()> {
    if path.exists() {
        log!("init"; "keeping existing {}", path.display());
        return Ok(());
    }
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory '{}'", parent.display()))?;
    }
    crate::engine::fs::write_json(path, &EngineSettings::default())?;
    Ok(())
}
