//! Gemini-backed primary extractor.
//!
//! Sends the message text to the Gemini generateContent endpoint and parses
//! the model's JSON reply into an [`ExtractionResult`]. All model output is
//! treated as untrusted: unknown enum values, negative amounts and unmasked
//! account numbers are normalized before anything leaves this module.

use async_trait::async_trait;
use chrono::NaiveDate;
use regex::Regex;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, warn};

use crate::error::ExtractorError;
use crate::pipeline::types::{ExtractionResult, ParsingMethod, TransactionType};

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";
pub const DEFAULT_MODEL: &str = "gemini-2.0-flash";

const EXTRACTION_PROMPT: &str = r#"You are a financial SMS parser. Extract transaction details from the SMS below and respond with ONLY a JSON object, no other text:

{
  "transaction_type": "credit" | "debit" | "refund" | "failed" | "unknown",
  "amount": <number or null>,
  "merchant_name": "<merchant or empty string>",
  "account_masked": "<masked account like XX1234 or empty string>",
  "date": "<YYYY-MM-DD or empty string>"
}

Never include full account or card numbers. SMS:
"#;

/// Raw shape of the model's JSON reply. Every field is defaulted so a
/// partial reply still deserializes.
#[derive(Debug, Deserialize)]
struct RawExtraction {
    #[serde(default)]
    transaction_type: String,
    #[serde(default)]
    amount: Option<f64>,
    #[serde(default)]
    merchant_name: String,
    #[serde(default)]
    account_masked: String,
    #[serde(default)]
    date: String,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: CandidateContent,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    #[serde(default)]
    text: String,
}

pub struct GeminiExtractor {
    http: reqwest::Client,
    api_key: SecretString,
    model: String,
    base_url: String,
    masked_account: Regex,
    trailing_digits: Regex,
}

impl GeminiExtractor {
    pub fn new(api_key: SecretString, model: impl Into<String>) -> Self {
        Self::with_base_url(api_key, model, DEFAULT_BASE_URL)
    }

    pub fn with_base_url(
        api_key: SecretString,
        model: impl Into<String>,
        base_url: impl Into<String>,
    ) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_key,
            model: model.into(),
            base_url: base_url.into(),
            masked_account: Regex::new(r"[Xx]+[0-9]{4}\b").unwrap(),
            trailing_digits: Regex::new(r"([0-9]{4})\b[^0-9]*$").unwrap(),
        }
    }

    async fn generate(&self, text: &str) -> Result<String, ExtractorError> {
        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url, self.model
        );
        let body = json!({
            "contents": [{
                "parts": [{ "text": format!("{EXTRACTION_PROMPT}{text}") }]
            }],
            "generationConfig": { "temperature": 0.0 }
        });

        let response = self
            .http
            .post(&url)
            .header("x-goog-api-key", self.api_key.expose_secret())
            .json(&body)
            .send()
            .await
            .map_err(|e| ExtractorError::RequestFailed {
                extractor: "gemini".into(),
                reason: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(ExtractorError::RequestFailed {
                extractor: "gemini".into(),
                reason: format!("HTTP {status}"),
            });
        }

        let parsed: GenerateResponse =
            response
                .json()
                .await
                .map_err(|e| ExtractorError::InvalidResponse {
                    extractor: "gemini".into(),
                    reason: e.to_string(),
                })?;

        parsed
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content.parts.into_iter().next())
            .map(|p| p.text)
            .ok_or_else(|| ExtractorError::InvalidResponse {
                extractor: "gemini".into(),
                reason: "empty candidates".into(),
            })
    }

    fn parse_reply(&self, reply: &str) -> Result<ExtractionResult, ExtractorError> {
        let json_str = extract_json_object(reply);
        let raw: RawExtraction = serde_json::from_str(&json_str)?;
        Ok(self.normalize(raw))
    }

    /// Clamp untrusted model output into the pipeline's invariants.
    fn normalize(&self, raw: RawExtraction) -> ExtractionResult {
        let transaction_type = match raw.transaction_type.to_lowercase().as_str() {
            "credit" => TransactionType::Credit,
            "debit" => TransactionType::Debit,
            "refund" => TransactionType::Refund,
            "failed" => TransactionType::Failed,
            other => {
                if !other.is_empty() && other != "unknown" {
                    debug!(value = other, "unrecognized transaction type from model");
                }
                TransactionType::Unknown
            }
        };

        let amount = match raw.amount {
            Some(v) if v < 0.0 => {
                warn!(amount = v, "model returned negative amount, dropping");
                None
            }
            other => other,
        };

        ExtractionResult {
            transaction_type,
            amount,
            merchant_name: raw.merchant_name.trim().to_string(),
            account_masked: self.sanitize_account(&raw.account_masked),
            date: normalize_date(&raw.date),
            parsing_method: ParsingMethod::Primary,
        }
    }

    /// Keep only a masked last-4 reference. A model that echoes a longer
    /// digit run gets re-masked; anything else is dropped.
    fn sanitize_account(&self, raw: &str) -> String {
        let raw = raw.trim();
        if raw.is_empty() {
            return String::new();
        }
        if let Some(m) = self.masked_account.find(raw) {
            return m.as_str().to_string();
        }
        if let Some(caps) = self.trailing_digits.captures(raw) {
            return format!("XXXX{}", &caps[1]);
        }
        String::new()
    }
}

#[async_trait]
impl super::Extractor for GeminiExtractor {
    fn name(&self) -> &str {
        "gemini"
    }

    async fn extract(&self, text: &str) -> Result<ExtractionResult, ExtractorError> {
        let reply = self.generate(text).await?;
        self.parse_reply(&reply)
    }
}

/// Keep only dates the calendar accepts, normalized to `YYYY-MM-DD`.
fn normalize_date(raw: &str) -> String {
    let raw = raw.trim();
    match NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        Ok(date) => date.format("%Y-%m-%d").to_string(),
        Err(_) => String::new(),
    }
}

/// Extract a JSON object from model output (handles markdown wrapping).
fn extract_json_object(text: &str) -> String {
    let trimmed = text.trim();

    if trimmed.starts_with('{') {
        return trimmed.to_string();
    }

    if let Some(start) = trimmed.find("```json") {
        let after = &trimmed[start + 7..];
        if let Some(end) = after.find("```") {
            return after[..end].trim().to_string();
        }
    }

    if let Some(start) = trimmed.find("```") {
        let after = &trimmed[start + 3..];
        if let Some(end) = after.find("```") {
            let inner = after[..end].trim();
            if inner.starts_with('{') {
                return inner.to_string();
            }
        }
    }

    if let (Some(start), Some(end)) = (trimmed.find('{'), trimmed.rfind('}'))
        && end > start
    {
        return trimmed[start..=end].to_string();
    }

    trimmed.to_string()
}
