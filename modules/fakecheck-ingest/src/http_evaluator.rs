//! Evaluators served by a remote scoring service.
//!
//! `POST {base_url}/evaluate/{dimension}` with `{"text", "title", "source_id"}`
//! and a `{"score": f64}` response. Scores are memoized per dimension in the
//! shared per-call cache.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};

use fakecheck_common::{Dimension, SourceId};
use fakecheck_core::{EvaluationInput, Evaluator, EvaluatorSet};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Serialize)]
struct EvaluateRequest<'a> {
    text: &'a str,
    title: Option<&'a str>,
    source_id: SourceId,
}

#[derive(Deserialize)]
struct EvaluateResponse {
    score: f64,
}

pub struct HttpEvaluator {
    client: reqwest::blocking::Client,
    dimension: Dimension,
    url: String,
}

impl HttpEvaluator {
    pub fn new(client: reqwest::blocking::Client, base_url: &str, dimension: Dimension) -> Self {
        Self {
            client,
            dimension,
            url: format!("{}/evaluate/{}", base_url.trim_end_matches('/'), dimension.key()),
        }
    }

    fn request(&self, input: &EvaluationInput) -> Result<f64> {
        let resp = self
            .client
            .post(&self.url)
            .json(&EvaluateRequest {
                text: &input.text,
                title: input.title.as_deref(),
                source_id: input.source_id,
            })
            .send()
            .with_context(|| format!("POST {}", self.url))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().unwrap_or_default();
            return Err(anyhow!("{} returned {}: {}", self.url, status.as_u16(), body));
        }
        let parsed: EvaluateResponse = resp.json()?;
        Ok(parsed.score)
    }
}

impl Evaluator for HttpEvaluator {
    fn evaluate(&self, input: &EvaluationInput) -> Result<f64> {
        input
            .caches
            .cached_score(self.dimension.key(), &input.text, |_| self.request(input))
    }

    fn name(&self) -> &str {
        self.dimension.key()
    }
}

/// One `HttpEvaluator` per dimension sharing a connection pool.
pub fn http_evaluator_set(base_url: &str) -> Result<EvaluatorSet> {
    let client = reqwest::blocking::Client::builder()
        .timeout(REQUEST_TIMEOUT)
        .build()?;
    Ok(EvaluatorSet::from_fn(|d| {
        Arc::new(HttpEvaluator::new(client.clone(), base_url, d)) as Arc<dyn Evaluator>
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn url_is_built_per_dimension() {
        let client = reqwest::blocking::Client::new();
        let e = HttpEvaluator::new(client, "http://scorer:8080/", Dimension::CallToAction);
        assert_eq!(e.url, "http://scorer:8080/evaluate/call_to_action");
        assert_eq!(e.name(), "call_to_action");
    }
}
