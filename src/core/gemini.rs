//! Gemini REST transport for both receipt adapters.
//!
//! [`GeminiClient`] calls `models/{model}:generateContent` and implements
//! [`ReceiptExtractor`] and [`ReceiptEditor`]. Every failure on the way (request, status,
//! body, missing content) collapses into the single error of the adapter being served.

use crate::{
    config::settings::GeminiConfig,
    core::{
        editing::{ReceiptEditor, edit_prompt},
        extraction::{ReceiptExtraction, ReceiptExtractor, extraction_prompt, extraction_schema},
        receipt::ReceiptImage,
    },
    errors::{Error, Result},
};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use tracing::instrument;

/// Media type assumed for a returned image that does not declare one.
const DEFAULT_EDITED_MEDIA_TYPE: &str = "image/png";

/// How much of an error body is kept in the error message.
const ERROR_BODY_LIMIT: usize = 300;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    contents: Vec<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationConfig>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Part {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    inline_data: Option<InlineData>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    thought: bool,
}

impl Part {
    fn text(text: String) -> Self {
        Self {
            text: Some(text),
            ..Self::default()
        }
    }

    fn image(image: &ReceiptImage) -> Self {
        Self {
            inline_data: Some(InlineData {
                mime_type: image.media_type().to_string(),
                data: image.payload().to_string(),
            }),
            ..Self::default()
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InlineData {
    #[serde(default)]
    mime_type: String,
    #[serde(default)]
    data: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    response_mime_type: String,
    response_schema: Value,
}

#[derive(Debug, Default, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Default, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<Content>,
}

impl GenerateContentResponse {
    fn first_parts(&self) -> &[Part] {
        self.candidates
            .first()
            .and_then(|candidate| candidate.content.as_ref())
            .map(|content| content.parts.as_slice())
            .unwrap_or_default()
    }

    /// Concatenated answer text, ignoring thought parts. `None` when there is none.
    fn text(&self) -> Option<String> {
        let text: String = self
            .first_parts()
            .iter()
            .filter(|part| !part.thought)
            .filter_map(|part| part.text.as_deref())
            .collect();
        (!text.trim().is_empty()).then_some(text)
    }

    /// First inline image with a non-empty payload.
    fn first_inline_image(&self) -> Option<&InlineData> {
        self.first_parts()
            .iter()
            .filter_map(|part| part.inline_data.as_ref())
            .find(|inline| !inline.data.is_empty())
    }
}

/// Client for the Gemini `generateContent` endpoint.
pub struct GeminiClient {
    http: reqwest::Client,
    settings: GeminiConfig,
    api_key: String,
}

impl GeminiClient {
    /// Builds a client with the configured timeout.
    pub fn new(settings: GeminiConfig, api_key: String) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.request_timeout_secs))
            .build()
            .map_err(|e| Error::Config {
                message: format!("Failed to build HTTP client: {e}"),
            })?;
        Ok(Self {
            http,
            settings,
            api_key,
        })
    }

    fn endpoint(&self, model: &str) -> String {
        format!(
            "{}/models/{model}:generateContent",
            self.settings.base_url.trim_end_matches('/')
        )
    }

    async fn generate(
        &self,
        model: &str,
        request: &GenerateContentRequest,
    ) -> std::result::Result<GenerateContentResponse, String> {
        let response = self
            .http
            .post(self.endpoint(model))
            .header("x-goog-api-key", &self.api_key)
            .json(request)
            .send()
            .await
            .map_err(|e| format!("request to {model} failed: {e}"))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let body: String = body.chars().take(ERROR_BODY_LIMIT).collect();
            return Err(format!("{model} answered {status}: {body}"));
        }

        response
            .json::<GenerateContentResponse>()
            .await
            .map_err(|e| format!("unreadable answer from {model}: {e}"))
    }
}

fn extraction_request(
    image: &ReceiptImage,
    categories: &[String],
    fallback_category: &str,
) -> GenerateContentRequest {
    GenerateContentRequest {
        contents: vec![Content {
            parts: vec![
                Part::image(image),
                Part::text(extraction_prompt(categories, fallback_category)),
            ],
        }],
        generation_config: Some(GenerationConfig {
            response_mime_type: "application/json".to_string(),
            response_schema: extraction_schema(),
        }),
    }
}

fn edit_request(image: &ReceiptImage, instruction: &str) -> GenerateContentRequest {
    GenerateContentRequest {
        contents: vec![Content {
            parts: vec![Part::image(image), Part::text(edit_prompt(instruction))],
        }],
        generation_config: None,
    }
}

fn extraction_from_response(response: &GenerateContentResponse) -> Result<ReceiptExtraction> {
    let text = response.text().ok_or_else(|| Error::Extraction {
        message: "no response text from the model".to_string(),
    })?;
    ReceiptExtraction::from_model_json(&text)
}

fn image_from_response(response: &GenerateContentResponse) -> Result<ReceiptImage> {
    let inline = response.first_inline_image().ok_or_else(|| Error::Edit {
        message: "no image generated".to_string(),
    })?;
    let media_type = if inline.mime_type.is_empty() {
        DEFAULT_EDITED_MEDIA_TYPE
    } else {
        inline.mime_type.as_str()
    };
    Ok(ReceiptImage::from_base64(media_type, &inline.data))
}

#[async_trait]
impl ReceiptExtractor for GeminiClient {
    #[instrument(name = "gemini_extract", skip(self, image))]
    async fn extract(
        &self,
        image: &ReceiptImage,
        categories: &[String],
    ) -> Result<ReceiptExtraction> {
        let request = extraction_request(image, categories, &self.settings.fallback_category);
        let response = self
            .generate(&self.settings.extraction_model, &request)
            .await
            .map_err(|message| Error::Extraction { message })
            .inspect_err(|e| tracing::error!("Error analyzing receipt: {e}"))?;

        extraction_from_response(&response)
            .inspect_err(|e| tracing::error!("Error analyzing receipt: {e}"))
    }
}

#[async_trait]
impl ReceiptEditor for GeminiClient {
    #[instrument(name = "gemini_edit", skip(self, image))]
    async fn edit(&self, image: &ReceiptImage, instruction: &str) -> Result<ReceiptImage> {
        let request = edit_request(image, instruction);
        let response = self
            .generate(&self.settings.edit_model, &request)
            .await
            .map_err(|message| Error::Edit { message })
            .inspect_err(|e| tracing::error!("Error editing receipt: {e}"))?;

        image_from_response(&response).inspect_err(|e| tracing::error!("Error editing receipt: {e}"))
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::float_cmp)]
    use super::*;
    use serde_json::json;
    use tokio::{
        io::{AsyncReadExt, AsyncWriteExt},
        net::TcpListener,
    };

    fn response(body: Value) -> GenerateContentResponse {
        serde_json::from_value(body).unwrap()
    }

    /// Answers exactly one HTTP request with `status` and `body`, returning the base URL.
    async fn serve_once(status: &'static str, body: &'static str) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = Vec::new();
            let mut buf = [0u8; 4096];
            loop {
                let n = socket.read(&mut buf).await.unwrap();
                if n == 0 {
                    break;
                }
                request.extend_from_slice(&buf[..n]);
                let text = String::from_utf8_lossy(&request);
                if let Some(end) = text.find("\r\n\r\n") {
                    let content_length = text[..end]
                        .lines()
                        .find_map(|line| {
                            let (name, value) = line.split_once(':')?;
                            name.eq_ignore_ascii_case("content-length")
                                .then(|| value.trim().parse::<usize>().ok())
                                .flatten()
                        })
                        .unwrap_or(0);
                    if request.len() >= end + 4 + content_length {
                        break;
                    }
                }
            }

            let reply = format!(
                "HTTP/1.1 {status}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
                body.len()
            );
            socket.write_all(reply.as_bytes()).await.unwrap();
            socket.shutdown().await.unwrap();
        });

        format!("http://{addr}/v1beta")
    }

    fn client_for(base_url: String) -> GeminiClient {
        let settings = GeminiConfig {
            base_url,
            request_timeout_secs: 5,
            ..GeminiConfig::default()
        };
        GeminiClient::new(settings, "key".to_string()).unwrap()
    }

    #[tokio::test]
    async fn test_server_error_becomes_extraction_error() {
        let base_url = serve_once("500 Internal Server Error", "{\"error\":\"boom\"}").await;
        let client = client_for(base_url);
        let image = ReceiptImage::from_base64("image/jpeg", "QUJD");

        let result = client.extract(&image, &["Comidas".to_string()]).await;

        match result {
            Err(Error::Extraction { message }) => {
                assert!(message.contains("500"), "{message}");
                assert!(message.contains("boom"), "{message}");
            }
            other => panic!("expected an extraction error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_unreadable_body_becomes_edit_error() {
        let base_url = serve_once("200 OK", "not json").await;
        let client = client_for(base_url);
        let image = ReceiptImage::from_base64("image/jpeg", "QUJD");

        let result = client.edit(&image, "crop").await;

        assert!(matches!(result, Err(Error::Edit { .. })));
    }

    #[tokio::test]
    async fn test_unreachable_server_becomes_extraction_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        let client = client_for(format!("http://{addr}/v1beta"));
        let image = ReceiptImage::from_base64("image/jpeg", "QUJD");

        let result = client.extract(&image, &[]).await;

        assert!(matches!(result, Err(Error::Extraction { .. })));
    }

    #[test]
    fn test_extraction_request_shape() {
        let image = ReceiptImage::from_base64("image/png", "QUJD");
        let request = extraction_request(&image, &["Comidas".to_string()], "Otros gastos");
        let body = serde_json::to_value(&request).unwrap();

        let parts = &body["contents"][0]["parts"];
        assert_eq!(parts[0]["inlineData"]["mimeType"], "image/png");
        assert_eq!(parts[0]["inlineData"]["data"], "QUJD");
        assert!(parts[0].get("text").is_none());
        assert!(parts[1]["text"].as_str().unwrap().contains("Comidas"));
        assert_eq!(
            body["generationConfig"]["responseMimeType"],
            "application/json"
        );
        assert_eq!(
            body["generationConfig"]["responseSchema"]["properties"]["amount"]["type"],
            "NUMBER"
        );
    }

    #[test]
    fn test_edit_request_has_no_generation_config() {
        let image = ReceiptImage::from_base64("image/jpeg", "QUJD");
        let body = serde_json::to_value(edit_request(&image, "crop")).unwrap();

        assert!(body.get("generationConfig").is_none());
        assert_eq!(
            body["contents"][0]["parts"][1]["text"],
            "Edit this image: crop. Return only the image."
        );
    }

    #[test]
    fn test_endpoint_joins_model() {
        let settings = GeminiConfig {
            base_url: "https://example.test/v1beta/".to_string(),
            ..GeminiConfig::default()
        };
        let client = GeminiClient::new(settings, "key".to_string()).unwrap();
        assert_eq!(
            client.endpoint("gemini-x"),
            "https://example.test/v1beta/models/gemini-x:generateContent"
        );
    }

    #[test]
    fn test_extraction_reads_concatenated_text() {
        let answer = response(json!({
            "candidates": [{ "content": { "role": "model", "parts": [
                { "text": "thinking...", "thought": true },
                { "text": "{\"date\":\"2024-03-01\"," },
                { "text": "\"amount\":12.5}" }
            ]}}]
        }));

        let extraction = extraction_from_response(&answer).unwrap();
        assert_eq!(extraction.amount, Some(12.5));
        assert!(extraction.creditor.is_none());
    }

    #[test]
    fn test_extraction_without_text_fails() {
        let empty = response(json!({ "candidates": [] }));
        assert!(matches!(
            extraction_from_response(&empty),
            Err(Error::Extraction { .. })
        ));

        let blank = response(json!({ "candidates": [{ "content": { "parts": [{ "text": "  " }] } }] }));
        assert!(extraction_from_response(&blank).is_err());
    }

    #[test]
    fn test_edit_takes_first_inline_image() {
        let answer = response(json!({
            "candidates": [{ "content": { "parts": [
                { "text": "Here is your image" },
                { "inlineData": { "mimeType": "image/png", "data": "" } },
                { "inlineData": { "mimeType": "image/webp", "data": "TkVX" } },
                { "inlineData": { "mimeType": "image/png", "data": "TEFURVI=" } }
            ]}}]
        }));

        let image = image_from_response(&answer).unwrap();
        assert_eq!(image.as_data_uri(), "data:image/webp;base64,TkVX");
    }

    #[test]
    fn test_edit_defaults_media_type() {
        let answer = response(json!({
            "candidates": [{ "content": { "parts": [ { "inlineData": { "data": "TkVX" } } ] } }]
        }));

        let image = image_from_response(&answer).unwrap();
        assert_eq!(image.media_type(), "image/png");
    }

    #[test]
    fn test_edit_without_image_fails() {
        let answer = response(json!({
            "candidates": [{ "content": { "parts": [ { "text": "I cannot edit this." } ] } }]
        }));

        assert!(matches!(
            image_from_response(&answer),
            Err(Error::Edit { .. })
        ));
    }
}
