//! Inspect the submission queue.

use anyhow::Result;
use dialoguer::Confirm;
use pwp_worker::prelude::SubmissionQueue;

use super::{QueueArgs, QueueCommand};
use crate::context::Context;
use crate::output::format_bytes;

/// Run the queue command.
pub async fn run(args: QueueArgs, ctx: &Context) -> Result<()> {
    match args.command {
        QueueCommand::List => list_queue(ctx).await,
        QueueCommand::Clear { yes } => clear_queue(yes, ctx).await,
    }
}

async fn list_queue(ctx: &Context) -> Result<()> {
    let queue = ctx.open_queue().await?;
    let entries = queue.list().await?;

    if ctx.output.is_json() {
        ctx.output.json(&entries);
        return Ok(());
    }

    if entries.is_empty() {
        ctx.output.info("Queue is empty");
        return Ok(());
    }

    ctx.output
        .header(&format!("Queued submissions ({})", entries.len()));
    let widths = [8, 19, 6, 10, 0];
    ctx.output
        .table_row(&["ID", "QUEUED", "METHOD", "BODY", "URL"], &widths);
    for entry in &entries {
        let id = entry.id.simple().to_string();
        let queued = entry.enqueued_at.format("%Y-%m-%d %H:%M:%S").to_string();
        // Bodies are stored base64-encoded.
        let body = format_bytes((entry.request.body.len() * 3 / 4) as u64);
        ctx.output.table_row(
            &[
                &id[..8],
                &queued,
                &entry.request.method,
                &body,
                entry.request.url.as_str(),
            ],
            &widths,
        );
    }

    Ok(())
}

async fn clear_queue(yes: bool, ctx: &Context) -> Result<()> {
    let queue = ctx.open_queue().await?;
    let pending = queue.count_pending().await?;

    if pending == 0 {
        ctx.output.info("Queue is empty");
        return Ok(());
    }

    if !yes {
        let confirmed = Confirm::new()
            .with_prompt(format!(
                "Drop {} queued submission(s)? They will never be sent.",
                pending
            ))
            .default(false)
            .interact()?;

        if !confirmed {
            ctx.output.info("Cancelled");
            return Ok(());
        }
    }

    let removed = queue.clear().await?;
    ctx.output
        .success(&format!("Removed {} submission(s)", removed));

    Ok(())
}
