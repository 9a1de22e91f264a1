//! A single resolve-then-fetch probe over one path.

use std::error::Error;
use std::time::Instant;

use tracing::debug;

use crate::http::{Fetch, Page};
use crate::resolver::Resolve;
use crate::results::PathOutcome;

/// Resolve `name`, fetch `/` from the address with `name` as Host, and
/// optionally keep the body.
///
/// Never fails: the first error at any step is recorded in the outcome and
/// the remaining steps are skipped. Timings measured before the failure
/// are kept.
pub async fn probe<R, F>(name: &str, resolver: &R, fetcher: &F, capture_page: bool) -> PathOutcome
where
    R: Resolve,
    F: Fetch,
{
    let mut outcome = PathOutcome::default();

    let started = Instant::now();
    let lookup = resolver.lookup_ipv4(name).await;
    outcome.lookup_took = started.elapsed();

    let ip = match lookup {
        Ok(ip) => ip,
        Err(e) => {
            debug!(name, error = %e, "lookup failed");
            outcome.error = Some(describe(&e));
            return outcome;
        }
    };
    outcome.ip = Some(ip);

    let started = Instant::now();
    let response = fetcher.fetch(ip, name).await;
    outcome.http_connection_took = started.elapsed();

    let response = match response {
        Ok(response) => response,
        Err(e) => {
            debug!(name, %ip, error = %e, "fetch failed");
            outcome.error = Some(describe(&e));
            return outcome;
        }
    };

    if capture_page {
        match response.read_page().await {
            Ok(page) => outcome.page = Some(page),
            Err(e) => {
                debug!(name, %ip, error = %e, "reading page failed");
                outcome.error = Some(describe(&e));
            }
        }
    }

    debug!(
        name,
        %ip,
        lookup = ?outcome.lookup_took,
        fetch = ?outcome.http_connection_took,
        "probe finished"
    );
    outcome
}

/// Render an error with its chain of causes, `outer: inner: root`.
fn describe(err: &dyn Error) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        let cause_msg = cause.to_string();
        if !message.ends_with(&cause_msg) {
            message.push_str(": ");
            message.push_str(&cause_msg);
        }
        source = cause.source();
    }
    message
}
