//! Blocking client for Hugging Face style hosted text-classification endpoints.

use std::thread;
use std::time::Duration;

use anyhow::{Context, Result};
use log::{debug, warn};
use reqwest::blocking::Client;
use reqwest::header::{HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};

use crate::classifier::{Classifier, ClassifyError};
use crate::config::Settings;
use crate::models::{Sentiment, SentimentLabel};

#[derive(Clone)]
pub struct InferenceClassifier {
    client: Client,
    endpoint: String,
    model: String,
    max_retries: usize,
}

#[derive(Serialize)]
struct InferenceRequest<'a> {
    inputs: &'a str,
}

#[derive(Debug, Deserialize)]
struct LabelScore {
    label: String,
    score: f64,
}

/// Single inputs come back either flat or nested one level deep.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum InferenceResponse {
    Nested(Vec<Vec<LabelScore>>),
    Flat(Vec<LabelScore>),
}

impl InferenceClassifier {
    pub fn new(
        base_url: &str,
        model: &str,
        api_token: Option<&str>,
        timeout: Duration,
        max_retries: usize,
    ) -> Result<Self> {
        anyhow::ensure!(!model.trim().is_empty(), "missing inference model name");
        let mut headers = reqwest::header::HeaderMap::new();
        if let Some(token) = api_token {
            let auth = format!("Bearer {}", token.trim());
            headers.insert(
                AUTHORIZATION,
                HeaderValue::from_str(&auth).context("invalid inference API token")?,
            );
        }
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        let client = Client::builder()
            .timeout(timeout)
            .default_headers(headers)
            .build()
            .context("failed to build inference HTTP client")?;
        let endpoint = format!("{}/models/{}", base_url.trim_end_matches('/'), model.trim());
        Ok(Self {
            client,
            endpoint,
            model: model.trim().to_string(),
            max_retries: max_retries.max(1),
        })
    }

    pub fn from_settings(settings: &Settings) -> Result<Self> {
        Self::new(
            &settings.inference_base_url,
            &settings.model_id,
            settings.api_token.as_deref(),
            Duration::from_secs(settings.timeout_secs),
            settings.max_retries,
        )
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn should_retry(&self, status: StatusCode) -> bool {
        // 503 is what the hosted API returns while a model is loading
        status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
    }

    fn is_retryable_error(&self, err: &reqwest::Error) -> bool {
        err.is_timeout() || err.is_connect() || err.is_request()
    }

    fn retry_backoff(&self, attempt: usize) -> Duration {
        let capped = attempt.min(5) as u32;
        Duration::from_millis(500 * (1 << capped))
    }
}

impl Classifier for InferenceClassifier {
    fn model_id(&self) -> &str {
        &self.model
    }

    fn classify(&self, text: &str) -> Result<Sentiment, ClassifyError> {
        let mut attempt = 0usize;
        loop {
            let response = self
                .client
                .post(&self.endpoint)
                .json(&InferenceRequest { inputs: text })
                .send();
            match response {
                Ok(resp) => {
                    let status = resp.status();
                    if status.is_success() {
                        let body = resp
                            .text()
                            .map_err(|e| ClassifyError::Transport(e.to_string()))?;
                        return parse_response(&body);
                    }
                    let body = resp
                        .text()
                        .unwrap_or_else(|_| "<body unavailable>".to_string());
                    if self.should_retry(status) && attempt + 1 < self.max_retries {
                        attempt += 1;
                        warn!(
                            "Inference request returned {} (attempt {}/{}), retrying.",
                            status, attempt, self.max_retries
                        );
                        thread::sleep(self.retry_backoff(attempt));
                        continue;
                    }
                    return Err(ClassifyError::Http {
                        status: status.as_u16(),
                        body,
                    });
                }
                Err(err) => {
                    if self.is_retryable_error(&err) && attempt + 1 < self.max_retries {
                        attempt += 1;
                        debug!("Transient inference error: {}", err);
                        thread::sleep(self.retry_backoff(attempt));
                        continue;
                    }
                    return Err(ClassifyError::Transport(err.to_string()));
                }
            }
        }
    }
}

/// Picks the highest-scoring label from an inference response body.
pub fn parse_response(body: &str) -> Result<Sentiment, ClassifyError> {
    let parsed: InferenceResponse = serde_json::from_str(body)
        .map_err(|e| ClassifyError::UnexpectedResponse(format!("{}: {}", e, body)))?;
    let candidates = match parsed {
        InferenceResponse::Nested(mut outer) => {
            if outer.is_empty() {
                Vec::new()
            } else {
                outer.swap_remove(0)
            }
        }
        InferenceResponse::Flat(flat) => flat,
    };
    let best = candidates
        .into_iter()
        .filter(|c| c.score.is_finite())
        .max_by(|a, b| a.score.total_cmp(&b.score))
        .ok_or_else(|| ClassifyError::UnexpectedResponse("no labels returned".to_string()))?;
    let label = map_label(&best.label)?;
    Ok(Sentiment::new(label, best.score))
}

fn map_label(raw: &str) -> Result<SentimentLabel, ClassifyError> {
    match raw.trim().to_ascii_uppercase().as_str() {
        "POSITIVE" | "POS" | "LABEL_1" => Ok(SentimentLabel::Positive),
        "NEGATIVE" | "NEG" | "LABEL_0" => Ok(SentimentLabel::Negative),
        _ => Err(ClassifyError::UnknownLabel(raw.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_nested_response() {
        let body = r#"[[{"label":"POSITIVE","score":0.9998},{"label":"NEGATIVE","score":0.0002}]]"#;
        let s = parse_response(body).unwrap();
        assert_eq!(s.label, SentimentLabel::Positive);
        assert_eq!(s.score, 0.9998);
    }

    #[test]
    fn parses_flat_response_with_generic_labels() {
        let body = r#"[{"label":"LABEL_1","score":0.12},{"label":"LABEL_0","score":0.88}]"#;
        let s = parse_response(body).unwrap();
        assert_eq!(s.label, SentimentLabel::Negative);
        assert_eq!(s.score, 0.88);
    }

    #[test]
    fn rejects_unknown_labels_and_errors() {
        assert!(matches!(
            parse_response(r#"[[{"label":"NEUTRAL","score":0.9}]]"#),
            Err(ClassifyError::UnknownLabel(_))
        ));
        assert!(matches!(
            parse_response(r#"{"error":"Model is currently loading"}"#),
            Err(ClassifyError::UnexpectedResponse(_))
        ));
        assert!(matches!(
            parse_response("[]"),
            Err(ClassifyError::UnexpectedResponse(_))
        ));
    }

    #[test]
    fn endpoint_joins_base_and_model() {
        let clf = InferenceClassifier::new(
            "https://api-inference.huggingface.co/",
            "distilbert-base-uncased-finetuned-sst-2-english",
            Some("hf_test"),
            Duration::from_secs(5),
            3,
        )
        .unwrap();
        assert_eq!(
            clf.endpoint(),
            "https://api-inference.huggingface.co/models/distilbert-base-uncased-finetuned-sst-2-english"
        );
        assert_eq!(clf.model_id(), "distilbert-base-uncased-finetuned-sst-2-english");
    }
}
