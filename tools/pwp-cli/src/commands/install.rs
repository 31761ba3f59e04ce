//! Seed the cache and activate the worker.

use std::time::Instant;

use anyhow::{Context as _, Result};
use pwp_worker::prelude::WorkerPhase;
use serde::Serialize;

use super::InstallArgs;
use crate::context::Context;
use crate::output::format_duration;

#[derive(Serialize)]
struct InstallSummary {
    cache: String,
    entries: usize,
    phase: String,
    restored: bool,
}

/// Run the install command.
pub async fn run(args: InstallArgs, ctx: &Context) -> Result<()> {
    let host = ctx.host().await?;
    let worker = &host.worker;

    if worker.phase() == WorkerPhase::Activated && !args.force {
        let entries = worker.config().precache.len();
        if ctx.output.is_json() {
            ctx.output.json(&InstallSummary {
                cache: worker.config().cache_name.clone(),
                entries,
                phase: worker.phase().to_string(),
                restored: true,
            });
        } else {
            ctx.output
                .success("Already installed. Use --force to fetch the precache list again.");
        }
        return Ok(());
    }

    ctx.output.header("Installing worker");
    ctx.output.kv("origin", worker.config().origin.as_str());
    ctx.output.kv("cache", &worker.config().cache_name);
    ctx.output.kv("data", &ctx.data_dir().display().to_string());

    ctx.output.step(1, 2, "Precaching resources");
    let started = Instant::now();
    let spinner = ctx
        .output
        .spinner(&format!("Fetching {} resources...", worker.config().precache.len()));
    let result = worker.install().await;
    spinner.finish_and_clear();
    let entries = result.context("Install failed; the worker is redundant")?;

    for locator in &worker.config().precache {
        ctx.output.list_item(locator);
    }

    ctx.output.step(2, 2, "Activating");
    worker.activate()?;

    if ctx.output.is_json() {
        ctx.output.json(&InstallSummary {
            cache: worker.config().cache_name.clone(),
            entries,
            phase: worker.phase().to_string(),
            restored: false,
        });
    } else {
        ctx.output.success(&format!(
            "Installed {} entries in {}",
            entries,
            format_duration(started.elapsed())
        ));
    }

    Ok(())
}
