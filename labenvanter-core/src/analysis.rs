//! AI-assisted calibration certificate analysis.
//!
//! Thin client over the Gemini `generateContent` endpoint. The service is
//! asked for JSON matching a fixed schema; details it cannot determine come
//! back as "N/A" from the service itself, never filled in locally. One
//! request per call, no retries.

use crate::{InventoryError, Result};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::time::Duration;

/// Environment variable holding the API key.
pub const GEMINI_API_KEY_ENV: &str = "GEMINI_API_KEY";

const GEMINI_MODEL: &str = "gemini-2.5-flash";
const GEMINI_ENDPOINT: &str = "https://generativelanguage.googleapis.com/v1beta/models";

/// Structured result of a certificate analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CertificateAnalysisResult {
    pub summary: String,
    pub device_info: CertificateDeviceInfo,
    pub calibration_results: CertificateCalibrationResults,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CertificateDeviceInfo {
    pub serial_number: String,
    pub model: String,
    pub equipment_type: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CertificateCalibrationResults {
    pub status: CertificateStatus,
    /// Up to three key measurement lines quoted from the certificate.
    pub key_measurements: Vec<String>,
    pub reasoning: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CertificateStatus {
    #[serde(rename = "PASS")]
    Pass,
    #[serde(rename = "FAIL")]
    Fail,
    #[serde(rename = "INDETERMINATE")]
    Indeterminate,
}

/// HTTP client for the analysis service.
pub struct CertificateAnalyzer {
    client: reqwest::Client,
    api_key: String,
}

impl CertificateAnalyzer {
    /// Build a client from `GEMINI_API_KEY`. A missing key fails here,
    /// before any request is made.
    pub fn from_env() -> Result<Self> {
        let api_key =
            std::env::var(GEMINI_API_KEY_ENV).map_err(|_| InventoryError::MissingApiKey)?;
        if api_key.trim().is_empty() {
            return Err(InventoryError::MissingApiKey);
        }
        Self::new(api_key)
    }

    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;
        Ok(Self {
            client,
            api_key: api_key.into(),
        })
    }

    /// Analyze extracted certificate text. Single attempt; any transport or
    /// parse failure surfaces without touching other state.
    pub async fn analyze(&self, certificate_text: &str) -> Result<CertificateAnalysisResult> {
        let url = format!("{}/{}:generateContent", GEMINI_ENDPOINT, GEMINI_MODEL);
        let body = json!({
            "contents": [{ "parts": [{ "text": build_prompt(certificate_text) }] }],
            "generationConfig": {
                "responseMimeType": "application/json",
                "responseSchema": response_schema(),
            },
        });

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(InventoryError::Analysis(format!(
                "analysis request failed with status {}",
                response.status()
            )));
        }

        let reply: GenerateContentResponse = response.json().await?;
        let text = reply
            .candidates
            .into_iter()
            .next()
            .and_then(|candidate| candidate.content.parts.into_iter().next())
            .map(|part| part.text)
            .ok_or_else(|| {
                InventoryError::Analysis("empty response from the analysis service".to_string())
            })?;

        let result = serde_json::from_str(text.trim())
            .map_err(|e| InventoryError::Analysis(format!("unparseable analysis reply: {}", e)))?;
        Ok(result)
    }
}

fn build_prompt(certificate_text: &str) -> String {
    format!(
        "You are an expert quality assurance engineer specializing in \
         laboratory equipment calibration. Analyze the following text \
         extracted from a calibration certificate.\n\n\
         Certificate Text:\n```\n{}\n```\n\n\
         Based on the text, provide a JSON response with the specified \
         structure. If information is not present, use 'N/A'.",
        certificate_text
    )
}

/// Response schema sent with the request so the service answers in the
/// exact shape `CertificateAnalysisResult` deserializes from.
fn response_schema() -> serde_json::Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "summary": {
                "type": "STRING",
                "description": "A brief, one-sentence summary of the certificate's purpose."
            },
            "device_info": {
                "type": "OBJECT",
                "properties": {
                    "serial_number": { "type": "STRING", "description": "The identified serial number, or 'N/A'." },
                    "model": { "type": "STRING", "description": "The identified model, or 'N/A'." },
                    "equipment_type": { "type": "STRING", "description": "The type of equipment, or 'N/A'." }
                },
                "required": ["serial_number", "model", "equipment_type"]
            },
            "calibration_results": {
                "type": "OBJECT",
                "properties": {
                    "status": {
                        "type": "STRING",
                        "enum": ["PASS", "FAIL", "INDETERMINATE"],
                        "description": "Status based on measurement data and tolerances."
                    },
                    "key_measurements": {
                        "type": "ARRAY",
                        "items": { "type": "STRING" },
                        "description": "List up to 3 key measurement results."
                    },
                    "reasoning": {
                        "type": "STRING",
                        "description": "A short explanation for the status conclusion."
                    }
                },
                "required": ["status", "key_measurements", "reasoning"]
            }
        },
        "required": ["summary", "device_info", "calibration_results"]
    })
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
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
    parts: Vec<ContentPart>,
}

#[derive(Debug, Deserialize)]
struct ContentPart {
    text: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn analysis_result_deserializes_from_service_json() {
        let raw = r#"{
            "summary": "Calibration certificate for an analytical balance.",
            "device_info": {
                "serial_number": "SN-67890",
                "model": "Explorer EX224",
                "equipment_type": "Analytical balance"
            },
            "calibration_results": {
                "status": "PASS",
                "key_measurements": ["100 g: +0.1 mg", "200 g: +0.2 mg"],
                "reasoning": "All deviations are within tolerance."
            }
        }"#;
        let result: CertificateAnalysisResult = serde_json::from_str(raw).unwrap();
        assert_eq!(result.calibration_results.status, CertificateStatus::Pass);
        assert_eq!(result.device_info.serial_number, "SN-67890");
        assert_eq!(result.calibration_results.key_measurements.len(), 2);
    }

    #[test]
    fn status_values_use_service_spelling() {
        assert_eq!(
            serde_json::to_string(&CertificateStatus::Indeterminate).unwrap(),
            "\"INDETERMINATE\""
        );
        let status: CertificateStatus = serde_json::from_str("\"FAIL\"").unwrap();
        assert_eq!(status, CertificateStatus::Fail);
    }

    #[test]
    fn candidate_reply_unwraps_to_inner_text() {
        let raw = r#"{
            "candidates": [
                { "content": { "parts": [ { "text": "{\"x\":1}" } ] } }
            ]
        }"#;
        let reply: GenerateContentResponse = serde_json::from_str(raw).unwrap();
        let text = reply
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content.parts.into_iter().next())
            .map(|p| p.text);
        assert_eq!(text.as_deref(), Some("{\"x\":1}"));
    }

    #[test]
    fn missing_api_key_fails_before_any_request() {
        std::env::remove_var(GEMINI_API_KEY_ENV);
        assert!(matches!(
            CertificateAnalyzer::from_env(),
            Err(InventoryError::MissingApiKey)
        ));
    }
}
