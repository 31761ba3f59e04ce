//! Run one request through the worker.

use std::io::Write;

use anyhow::{anyhow, bail, Context as _, Result};
use futures::StreamExt;
use http::{HeaderMap, HeaderName, HeaderValue, StatusCode};
use pwp_worker::prelude::{ChangeNotification, Dispatch, EventContext, MetricsSnapshot, Request};
use serde::Serialize;

use super::{parse_method, resolve_url, FetchArgs};
use crate::context::Context;
use crate::output::format_bytes;

#[derive(Serialize)]
struct FetchSummary {
    class: &'static str,
    status: u16,
    headers: Vec<(String, String)>,
    body: String,
    notifications: Vec<ChangeNotification>,
    pending_sync: Vec<String>,
    metrics: MetricsSnapshot,
}

/// Run the fetch command.
pub async fn run(args: FetchArgs, ctx: &Context) -> Result<()> {
    let host = ctx.host().await?;
    let worker = &host.worker;
    let request = build_request(&args, ctx)?;
    let class = worker.classify(&request);
    ctx.output.debug(&format!(
        "{} {} -> {} ({})",
        request.method(),
        request.url(),
        class,
        worker.phase()
    ));

    let mut updates = worker.subscribe();
    let event = EventContext::new();
    let streaming = !ctx.output.is_json();

    let result = match worker.handle_fetch(request, &event).await {
        Ok(Dispatch::Respond(response)) => {
            let body = response.body().clone();
            print_head(ctx, &args, response.status(), response.headers());
            if streaming {
                write_body(&body)?;
            }
            Ok((response.status(), response.headers().clone(), body.to_vec()))
        }
        Ok(Dispatch::Network(request)) => match worker.forward(&request).await {
            Ok(response) => {
                print_head(ctx, &args, response.status(), response.headers());
                if streaming {
                    write_body(response.body())?;
                }
                Ok((response.status(), response.headers().clone(), response.body().to_vec()))
            }
            Err(e) => Err(anyhow!(e)),
        },
        Ok(Dispatch::Stream(page)) => {
            let (status, headers, mut stream) = page.into_parts();
            print_head(ctx, &args, status, &headers);
            let mut body = Vec::new();
            let mut failure = None;
            while let Some(chunk) = stream.next().await {
                match chunk {
                    Ok(chunk) => {
                        if streaming {
                            write_body(&chunk)?;
                        }
                        body.extend_from_slice(&chunk);
                    }
                    Err(e) => {
                        failure = Some(e);
                        break;
                    }
                }
            }
            match failure {
                Some(e) => Err(anyhow!(e).context(format!(
                    "Page stream ended after {}",
                    format_bytes(body.len() as u64)
                ))),
                None => Ok((status, headers, body)),
            }
        }
        Err(e) => Err(anyhow!(e)),
    };

    let spinner = ctx.output.spinner("Waiting for background work...");
    let settled = event.keep_alive.settle().await;
    spinner.finish_and_clear();
    ctx.output
        .debug(&format!("{} background task(s) finished", settled));

    let (status, headers, body) = result?;

    let mut notifications = Vec::new();
    while let Ok(message) = updates.try_recv() {
        notifications.push(message);
    }
    let pending_sync = host.registry.take_pending();
    let metrics = worker.metrics();

    if ctx.output.is_json() {
        ctx.output.json(&FetchSummary {
            class: class.as_str(),
            status: status.as_u16(),
            headers: headers
                .iter()
                .map(|(name, value)| {
                    (
                        name.to_string(),
                        String::from_utf8_lossy(value.as_bytes()).into_owned(),
                    )
                })
                .collect(),
            body: String::from_utf8_lossy(&body).into_owned(),
            notifications,
            pending_sync,
            metrics,
        });
        return Ok(());
    }

    if !body.ends_with(b"\n") && !body.is_empty() {
        println!();
    }
    for message in &notifications {
        ctx.output
            .info(&format!("Updated since last visit: {}", message.name()));
    }
    for tag in &pending_sync {
        ctx.output.warn(&format!(
            "Submission queued for sync '{}'. Run `pwp sync` when back online.",
            tag
        ));
    }
    if ctx.output.is_verbose() {
        print_metrics(ctx, &metrics);
    }

    Ok(())
}

fn build_request(args: &FetchArgs, ctx: &Context) -> Result<Request> {
    let mut request = Request::new(parse_method(&args.method)?, resolve_url(ctx, &args.url)?);

    if let Some(data) = &args.data {
        request = request.with_body(data.clone());
    }
    if let Some(referrer) = &args.referrer {
        request = request.with_referrer(resolve_url(ctx, referrer)?);
    }
    for header in &args.headers {
        let (name, value) = parse_header(header)?;
        request = request.with_header(name, value);
    }

    Ok(request)
}

fn parse_header(raw: &str) -> Result<(HeaderName, HeaderValue)> {
    let Some((name, value)) = raw.split_once(':') else {
        bail!("Header must be `name: value`, got {:?}", raw);
    };
    let name = HeaderName::from_bytes(name.trim().as_bytes())
        .with_context(|| format!("Invalid header name in {:?}", raw))?;
    let value = HeaderValue::from_str(value.trim())
        .with_context(|| format!("Invalid header value in {:?}", raw))?;
    Ok((name, value))
}

fn print_head(ctx: &Context, args: &FetchArgs, status: StatusCode, headers: &HeaderMap) {
    if !args.include || ctx.output.is_json() {
        return;
    }
    println!("{:?} {}", http::Version::HTTP_11, status);
    for (name, value) in headers {
        println!("{}: {}", name, String::from_utf8_lossy(value.as_bytes()));
    }
    println!();
}

fn write_body(chunk: &[u8]) -> Result<()> {
    let mut stdout = std::io::stdout().lock();
    stdout.write_all(chunk)?;
    stdout.flush()?;
    Ok(())
}

fn print_metrics(ctx: &Context, metrics: &MetricsSnapshot) {
    ctx.output.header("Worker metrics");
    ctx.output.kv("cache hits", &metrics.cache_hits.to_string());
    ctx.output.kv("cache misses", &metrics.cache_misses.to_string());
    if let Some(ratio) = metrics.hit_ratio() {
        ctx.output.kv("hit ratio", &format!("{:.0}%", ratio * 100.0));
    }
    ctx.output
        .kv("network failures", &metrics.network_failures.to_string());
    ctx.output.kv("cache writes", &metrics.cache_writes.to_string());
    ctx.output
        .kv("change notifications", &metrics.change_notifications.to_string());
    ctx.output.kv("composed pages", &metrics.composed_pages.to_string());
    ctx.output
        .kv("deferred submissions", &metrics.deferred_submissions.to_string());
}
