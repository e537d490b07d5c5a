//! Webhook delivery.
//!
//! Fires are best-effort: every outcome is logged and nothing is
//! retried or escalated. The response body gets a best-effort structured
//! walk (a `jobs` mapping whose entries carry a `triggered` field),
//! purely so CI-style consumers show up usefully in the log.

use std::time::Duration;

use reqwest::StatusCode;
use reqwest::header::CONTENT_TYPE;
use tracing::{debug, error, info, warn};

use yanghook_core::Webhook;

/// POST the enriched payload to one webhook target.
pub async fn fire(
    http: &reqwest::Client,
    hook: &Webhook,
    stream_name: &str,
    body: Vec<u8>,
    timeout: Duration,
) {
    // Validation sets the target; a hook without one never gets here
    let Some(target) = &hook.target else {
        return;
    };

    info!(stream = %stream_name, url = %hook.url, "firing webhook");
    debug!(stream = %stream_name, body = %String::from_utf8_lossy(&body), "webhook payload");

    let mut request = http
        .post(target.clone())
        .header(CONTENT_TYPE, "application/json")
        .timeout(timeout)
        .body(body);
    if let Some(token) = &hook.token {
        request = request.header("token", token);
    }

    let response = match request.send().await {
        Ok(response) => response,
        Err(e) if e.is_timeout() => {
            warn!(stream = %stream_name, url = %hook.url, "webhook timeout");
            return;
        }
        Err(e) => {
            error!(stream = %stream_name, url = %hook.url, error = %e, "webhook delivery failed");
            return;
        }
    };

    let status = response.status();
    let text = response.text().await.unwrap_or_default();

    if status == StatusCode::NOT_FOUND {
        warn!(
            stream = %stream_name,
            url = %hook.url,
            response = %text,
            "webhook target not found (404)"
        );
        return;
    }

    debug!(
        stream = %stream_name,
        url = %hook.url,
        status = status.as_u16(),
        response = %text,
        "webhook response"
    );
    log_triggered_jobs(stream_name, &text);
}

/// Two-level walk of the webhook response for logging. Parse failures
/// at any level are logged and never escalate.
fn log_triggered_jobs(stream_name: &str, text: &str) {
    let value: serde_json::Value = match serde_json::from_str(text) {
        Ok(value) => value,
        Err(e) => {
            debug!(stream = %stream_name, error = %e, "webhook response is not JSON");
            return;
        }
    };

    let Some(jobs) = value.get("jobs").and_then(|jobs| jobs.as_object()) else {
        debug!(stream = %stream_name, "webhook response has no jobs mapping");
        return;
    };

    // Could be multiple pipeline job results
    for (name, job) in jobs {
        match job.get("triggered") {
            Some(triggered) => {
                info!(stream = %stream_name, job = %name, triggered = %triggered, "job triggered")
            }
            None => debug!(stream = %stream_name, job = %name, "job result has no triggered field"),
        }
    }
}
