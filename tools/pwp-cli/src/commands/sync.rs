//! Replay deferred submissions.

use std::time::Duration;

use anyhow::{bail, Result};
use pwp_worker::prelude::{BackoffStrategy, DrainReport, RetryPolicy};

use super::SyncArgs;
use crate::config::SyncConfig;
use crate::context::Context;
use crate::output::format_duration;

/// Run the sync command.
pub async fn run(args: SyncArgs, ctx: &Context) -> Result<()> {
    let host = ctx.host().await?;
    let tag = args
        .tag
        .unwrap_or_else(|| ctx.config.worker.sync_tag.clone());
    let policy = if args.watch {
        retry_policy(&ctx.config.sync)
    } else {
        RetryPolicy::none()
    };

    let mut reports = Vec::new();
    let mut attempt = 0;
    loop {
        let report = host.worker.handle_sync(&tag).await?;
        print_report(ctx, attempt, &report);
        reports.push(report);

        if report.is_complete() || !policy.should_retry(attempt) {
            break;
        }

        let delay = policy.delay_after(attempt);
        let spinner = ctx.output.spinner(&format!(
            "{} still queued, retrying in {}...",
            report.remaining,
            format_duration(delay)
        ));
        tokio::time::sleep(delay).await;
        spinner.finish_and_clear();
        attempt += 1;
    }

    if ctx.output.is_json() {
        ctx.output.json(&reports);
    }

    match reports.last() {
        Some(report) if !report.is_complete() => bail!(
            "{} submission(s) still queued for '{}'",
            report.remaining,
            tag
        ),
        _ => {
            ctx.output.success("Queue drained");
            Ok(())
        }
    }
}

fn retry_policy(config: &SyncConfig) -> RetryPolicy {
    RetryPolicy::new(config.max_attempts).with_backoff(BackoffStrategy::Exponential {
        base: Duration::from_millis(config.base_delay_ms),
        max: Duration::from_millis(config.max_delay_ms),
    })
}

fn print_report(ctx: &Context, attempt: u32, report: &DrainReport) {
    if report.attempted == 0 && report.remaining == 0 {
        ctx.output.info("Nothing queued");
        return;
    }
    ctx.output.debug(&format!("attempt {}", attempt + 1));
    if report.succeeded > 0 {
        ctx.output
            .success(&format!("Replayed {} submission(s)", report.succeeded));
    }
    if report.failed > 0 {
        ctx.output
            .warn(&format!("{} submission(s) failed to replay", report.failed));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retry_policy_from_config() {
        let policy = retry_policy(&SyncConfig {
            max_attempts: 3,
            base_delay_ms: 100,
            max_delay_ms: 250,
        });
        assert!(policy.should_retry(1));
        assert!(!policy.should_retry(2));
        assert_eq!(policy.delay_after(0), Duration::from_millis(100));
        assert_eq!(policy.delay_after(2), Duration::from_millis(250));
    }
}
