//! Configuration management commands.

use std::fs;

use anyhow::{bail, Context as _, Result};
use pwp_worker::prelude::RequestClassifier;
use url::Url;

use super::{ConfigArgs, ConfigCommand};
use crate::config::generate_default_config;
use crate::context::Context;

/// Run the config command.
pub async fn run(args: ConfigArgs, ctx: &Context) -> Result<()> {
    match args.command {
        ConfigCommand::Show => show_config(ctx).await,
        ConfigCommand::Init { force, origin } => init_config(force, &origin, ctx).await,
        ConfigCommand::Validate => validate_config(ctx).await,
    }
}

async fn show_config(ctx: &Context) -> Result<()> {
    if ctx.output.is_json() {
        ctx.output.json(&ctx.config);
        return Ok(());
    }

    ctx.output.header("Current Configuration");
    let worker = &ctx.config.worker;

    ctx.output.info("[worker]");
    ctx.output.kv("origin", worker.origin.as_str());
    ctx.output.kv("cache_name", &worker.cache_name);
    ctx.output.kv(
        "fragment",
        &format!("?{}={}", worker.fragment_param, worker.fragment_value),
    );
    ctx.output.kv("header_fragment", &worker.header_fragment);
    ctx.output.kv("footer_fragment", &worker.footer_fragment);
    ctx.output.kv("asset_pattern", &worker.asset_pattern);
    ctx.output.kv("admin_prefix", &worker.admin_prefix);
    ctx.output
        .kv("public_content_prefix", &worker.public_content_prefix);
    ctx.output.kv("preview_param", &worker.preview_param);
    ctx.output.kv("submission_path", &worker.submission_path);
    ctx.output.kv("sync_tag", &worker.sync_tag);
    if !worker.extra_sync_tags.is_empty() {
        ctx.output
            .kv("extra_sync_tags", &worker.extra_sync_tags.join(", "));
    }
    ctx.output.kv("precache", &worker.precache.len().to_string());
    for locator in &worker.precache {
        ctx.output.list_item(locator);
    }

    ctx.output.info("[storage]");
    ctx.output
        .kv("data_dir", &ctx.data_dir().display().to_string());

    ctx.output.info("[network]");
    ctx.output
        .kv("timeout_secs", &ctx.config.network.timeout_secs.to_string());
    ctx.output.kv(
        "cookie",
        if ctx.config.network.cookie.is_some() {
            "(set)"
        } else {
            "(none)"
        },
    );

    ctx.output.info("[sync]");
    ctx.output
        .kv("max_attempts", &ctx.config.sync.max_attempts.to_string());
    ctx.output
        .kv("base_delay_ms", &ctx.config.sync.base_delay_ms.to_string());
    ctx.output
        .kv("max_delay_ms", &ctx.config.sync.max_delay_ms.to_string());

    Ok(())
}

async fn init_config(force: bool, origin: &str, ctx: &Context) -> Result<()> {
    let config_path = ctx.cwd.join("pwp.toml");

    if config_path.exists() && !force {
        bail!(
            "Config file already exists: {}. Use --force to overwrite.",
            config_path.display()
        );
    }

    let origin = Url::parse(origin).with_context(|| format!("Invalid origin: {}", origin))?;
    fs::write(&config_path, generate_default_config(origin.as_str()))
        .with_context(|| format!("Failed to write {}", config_path.display()))?;

    ctx.output
        .success(&format!("Created: {}", config_path.display()));

    Ok(())
}

async fn validate_config(ctx: &Context) -> Result<()> {
    ctx.output.header("Validating configuration");

    let mut errors: Vec<String> = Vec::new();
    let mut warnings: Vec<String> = Vec::new();
    let worker = &ctx.config.worker;

    if let Err(e) = worker.validate() {
        errors.push(e.to_string());
    }

    if let Err(e) = RequestClassifier::new(worker) {
        errors.push(e.to_string());
    }

    if let Err(e) = worker.precache_urls() {
        errors.push(e.to_string());
    }

    if ctx.config.sync.max_attempts == 0 {
        errors.push("sync.max_attempts must be at least 1".to_string());
    }

    if ctx.config.sync.base_delay_ms > ctx.config.sync.max_delay_ms {
        warnings.push("sync.base_delay_ms exceeds sync.max_delay_ms".to_string());
    }

    let home = format!("./?{}={}", worker.fragment_param, worker.fragment_value);
    if !worker.precache.iter().any(|p| *p == home) {
        warnings.push(format!(
            "precache does not include {}; offline pages will have no content",
            home
        ));
    }

    if worker.origin.scheme() == "http" && worker.origin.host_str() != Some("localhost") {
        warnings.push(format!(
            "origin {} is not https; session cookies will be sent in clear text",
            worker.origin
        ));
    }

    if ctx.config_path.is_none() {
        warnings.push("no config file found; using defaults".to_string());
    }

    if errors.is_empty() && warnings.is_empty() {
        ctx.output.success("Configuration is valid");
        return Ok(());
    }

    for error in &errors {
        ctx.output.error(&format!("Error: {}", error));
    }

    for warning in &warnings {
        ctx.output.warn(&format!("Warning: {}", warning));
    }

    if !errors.is_empty() {
        bail!("Configuration has {} error(s)", errors.len());
    }

    ctx.output.success("Configuration is valid (with warnings)");

    Ok(())
}
