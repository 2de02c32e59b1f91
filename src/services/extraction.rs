use async_trait::async_trait;
use base64::{engine::general_purpose, Engine as _};
use jsonschema::JSONSchema;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use thiserror::Error;

use crate::models::ExtractedInvoiceData;

/// Seconds the caller waits for one extraction before giving up on the item.
pub const EXTRACTION_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("Extraction timed out after {0} seconds")]
    Timeout(u64),
    #[error("Extraction service error {status}: {body}")]
    Service { status: u16, body: String },
    #[error("Extraction request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("Extraction returned unusable data: {0}")]
    InvalidResponse(String),
}

/// The AI boundary: file bytes and a MIME type in, structured invoice fields
/// out. A missing or unparsable reply is the same as an explicit failure.
#[async_trait]
pub trait ExtractionProvider: Send + Sync {
    async fn extract(
        &self,
        content: &[u8],
        mime_type: &str,
    ) -> Result<ExtractedInvoiceData, ExtractionError>;
}

#[derive(Serialize)]
struct ChatRequest {
    model: String,
    temperature: f32,
    messages: Vec<Message>,
    response_format: ResponseFormat,
}

#[derive(Serialize)]
struct Message {
    role: String,
    content: Vec<ContentPart>,
}

#[derive(Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentPart {
    Text { text: String },
    ImageUrl { image_url: ImageUrl },
}

#[derive(Serialize)]
struct ImageUrl {
    url: String,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    content: String,
}

pub struct OpenAiExtractor {
    api_key: String,
}

impl OpenAiExtractor {
    pub fn new(api_key: String) -> Self {
        OpenAiExtractor { api_key }
    }
}

#[async_trait]
impl ExtractionProvider for OpenAiExtractor {
    async fn extract(
        &self,
        content: &[u8],
        mime_type: &str,
    ) -> Result<ExtractedInvoiceData, ExtractionError> {
        let schema = extraction_schema();
        let data_url = format!(
            "data:{};base64,{}",
            mime_type,
            general_purpose::STANDARD.encode(content)
        );

        let mut raw = call_openai(&self.api_key, system_prompt(), &data_url).await?;
        let mut value = parse_json(&raw)?;

        if !schema.is_valid(&value) {
            // One repair pass: ask the model to fix its own JSON.
            raw = call_openai(
                &self.api_key,
                &format!(
                    "Fix this JSON so it matches the schema exactly. Output JSON only. JSON:\n{}",
                    raw
                ),
                &data_url,
            )
            .await?;
            value = parse_json(&raw)?;
            if !schema.is_valid(&value) {
                return Err(ExtractionError::InvalidResponse(
                    "response does not match the schema".to_string(),
                ));
            }
        }

        let data: ExtractedInvoiceData = serde_json::from_value(value)
            .map_err(|e| ExtractionError::InvalidResponse(e.to_string()))?;

        if data.invoice_number.as_deref().unwrap_or("").trim().is_empty() {
            return Err(ExtractionError::InvalidResponse(
                "no invoice number found".to_string(),
            ));
        }
        if data.amount_before_vat.is_none() {
            return Err(ExtractionError::InvalidResponse(
                "no amount found".to_string(),
            ));
        }

        Ok(data)
    }
}

async fn call_openai(
    api_key: &str,
    system_prompt: &str,
    data_url: &str,
) -> Result<String, ExtractionError> {
    let client = reqwest::Client::new();
    let request = ChatRequest {
        model: "gpt-4o-mini".to_string(),
        temperature: 0.1,
        messages: vec![
            Message {
                role: "system".to_string(),
                content: vec![ContentPart::Text {
                    text: system_prompt.to_string(),
                }],
            },
            Message {
                role: "user".to_string(),
                content: vec![
                    ContentPart::Text {
                        text: "Extract the invoice fields from this document.".to_string(),
                    },
                    ContentPart::ImageUrl {
                        image_url: ImageUrl {
                            url: data_url.to_string(),
                        },
                    },
                ],
            },
        ],
        response_format: ResponseFormat {
            format_type: "json_object".to_string(),
        },
    };

    let response = client
        .post("https://api.openai.com/v1/chat/completions")
        .bearer_auth(api_key)
        .json(&request)
        .send()
        .await?;

    if !response.status().is_success() {
        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        return Err(ExtractionError::Service { status, body });
    }

    let body: ChatResponse = response.json().await?;
    let content = body
        .choices
        .first()
        .ok_or_else(|| ExtractionError::InvalidResponse("empty response".to_string()))?
        .message
        .content
        .trim()
        .to_string();
    Ok(content)
}

#[derive(Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    format_type: String,
}

fn parse_json(raw: &str) -> Result<Value, ExtractionError> {
    serde_json::from_str::<Value>(raw)
        .map_err(|e| ExtractionError::InvalidResponse(format!("invalid JSON: {}", e)))
}

fn extraction_schema() -> JSONSchema {
    let schema = json!({
        "type": "object",
        "additionalProperties": false,
        "required": ["invoice_number", "amount_before_vat"],
        "properties": {
            "invoice_number": {"type": ["string", "null"]},
            "receipt_number": {"type": ["string", "null"]},
            "customer": {"type": ["string", "null"]},
            "amount_before_vat": {"type": ["number", "null"]},
            "currency_code": {"type": ["string", "null"]},
            "invoice_date": {"type": ["string", "null"]},
            "project_description": {"type": ["string", "null"]}
        }
    });

    JSONSchema::compile(&schema).expect("Invalid JSON schema")
}

fn system_prompt() -> &'static str {
    r#"You are an invoice extraction system. Return JSON only and match the schema exactly.
Fields:
- invoice_number (string|null)
- receipt_number (string|null)
- customer (string|null)
- amount_before_vat (number|null, before VAT)
- currency_code (ISO 4217 string|null)
- invoice_date (YYYY-MM-DD|null)
- project_description (string|null, short)
"#
}
