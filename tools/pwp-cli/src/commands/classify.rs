//! Show how requests would be handled.

use anyhow::Result;
use pwp_worker::prelude::{Request, RequestClassifier};
use serde::Serialize;

use super::{parse_method, resolve_url, ClassifyArgs};
use crate::context::Context;

#[derive(Serialize)]
struct Classified {
    method: String,
    url: String,
    class: &'static str,
    cached: bool,
}

/// Run the classify command.
pub async fn run(args: ClassifyArgs, ctx: &Context) -> Result<()> {
    let classifier = RequestClassifier::new(&ctx.config.worker)?;
    let method = parse_method(&args.method)?;

    let mut rows = Vec::with_capacity(args.urls.len());
    for url in &args.urls {
        let request = Request::new(method.clone(), resolve_url(ctx, url)?);
        let class = classifier.classify(&request);
        rows.push(Classified {
            method: method.to_string(),
            url: request.url().to_string(),
            class: class.as_str(),
            cached: class.is_cached(),
        });
    }

    if ctx.output.is_json() {
        ctx.output.json(&rows);
        return Ok(());
    }

    let width = rows.iter().map(|r| r.class.len()).max().unwrap_or(0);
    for row in &rows {
        ctx.output
            .table_row(&[row.class, &row.method, &row.url], &[width, 6, 0]);
    }

    Ok(())
}
