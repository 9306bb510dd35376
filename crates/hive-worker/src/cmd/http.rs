//! Shared HTTP request helpers for CLI commands.
//!
//! Every request carries the worker's connection id in the
//! `x-connection-id` header; the master treats any contact as a liveness
//! signal.

use anyhow::{Context, Result};
use serde::Deserialize;

pub fn base_url(master: &str) -> String {
    format!("http://{master}")
}

pub async fn get_json<T: for<'de> Deserialize<'de>>(url: &str, connection_id: &str) -> Result<T> {
    reqwest::Client::new()
        .get(url)
        .header("x-connection-id", connection_id)
        .send()
        .await
        .with_context(|| format!("failed to connect to hived at {url} — is it running?"))?
        .error_for_status()
        .context("master rejected the request")?
        .json::<T>()
        .await
        .context("failed to parse response")
}

pub async fn get_bytes(url: &str, connection_id: &str) -> Result<Vec<u8>> {
    let response = reqwest::Client::new()
        .get(url)
        .header("x-connection-id", connection_id)
        .send()
        .await
        .with_context(|| format!("failed to connect to hived at {url} — is it running?"))?
        .error_for_status()
        .context("master rejected the request")?;
    Ok(response.bytes().await.context("failed to read body")?.to_vec())
}

pub async fn post_bytes(url: &str, connection_id: &str, body: Vec<u8>) -> Result<()> {
    reqwest::Client::new()
        .post(url)
        .header("x-connection-id", connection_id)
        .header("content-type", "application/octet-stream")
        .body(body)
        .send()
        .await
        .with_context(|| format!("failed to connect to hived at {url} — is it running?"))?
        .error_for_status()
        .context("master rejected the result")?;
    Ok(())
}
