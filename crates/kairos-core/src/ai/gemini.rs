use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::attachments::split_data_url;

pub const DEFAULT_MODEL: &str = "gemini-2.0-flash";
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

const QUESTION_PREFIX: &str = "\n\nPregunta del usuario: ";
const IMAGE_INSTRUCTION: &str = "Por favor, analiza esta imagen en el contexto del simulador de escaneo 3D. Describe:
1. ¿Qué objeto es?
2. Si es escaneable (dimensiones, complejidad)
3. Ángulos recomendados de captura
4. Posibles desafíos al escanearlo

Al final de tu respuesta SIEMPRE añade esta frase, sin excepciones:
\"Nota: “La interpretación de la imagen puede no ser 100% precisa. Te recomiendo corroborar la información.”\"";
const DEFAULT_IMAGE_MIME: &str = "image/jpeg";

#[derive(Serialize)]
struct InlineData {
    mime_type: String,
    data: String,
}

#[derive(Serialize)]
#[serde(untagged)]
enum Part {
    Text { text: String },
    Image { inline_data: InlineData },
}

#[derive(Serialize)]
struct Content {
    role: String,
    parts: Vec<Part>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    top_p: f32,
    top_k: u32,
    max_output_tokens: u32,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest {
    contents: Vec<Content>,
    generation_config: GenerationConfig,
}

#[derive(Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

#[derive(Deserialize)]
struct ResponseContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<ResponseContent>,
}

#[derive(Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

/// One user turn sent upstream
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub system_prompt: String,
    pub message: String,
    /// Data URL or bare base64 payload
    pub image: Option<String>,
}

#[derive(Debug, Error)]
pub enum GeminiError {
    #[error("Error de API (Código {0})")]
    Status(u16),

    // Connection failures carry no HTTP status
    #[error("Error de API (Código 0)")]
    Transport(#[from] reqwest::Error),
}

#[derive(Clone)]
pub struct GeminiClient {
    client: Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl GeminiClient {
    pub fn new(api_key: &str) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .unwrap_or_else(|_| Client::new());
        Self {
            client,
            api_key: api_key.to_string(),
            model: DEFAULT_MODEL.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }

    pub fn with_model(mut self, model: &str) -> Self {
        self.model = model.to_string();
        self
    }

    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Generate a reply. `Ok(None)` means the model answered without any text.
    pub async fn generate(&self, request: &GenerationRequest) -> Result<Option<String>, GeminiError> {
        let url = format!(
            "{}/models/{}:generateContent?key={}",
            self.base_url, self.model, self.api_key
        );

        let response = self
            .client
            .post(&url)
            .header("content-type", "application/json")
            .json(&build_request(request))
            .send()
            .await
            .map_err(|e| {
                tracing::warn!(error = %e, "gemini request failed");
                GeminiError::Transport(e)
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            tracing::warn!(%status, body = %text, "gemini API error");
            return Err(GeminiError::Status(status.as_u16()));
        }

        let gemini_response: GeminiResponse = match response.json().await {
            Ok(parsed) => parsed,
            Err(e) => {
                tracing::warn!(error = %e, "gemini response is not valid JSON");
                return Ok(None);
            }
        };
        Ok(first_text(gemini_response))
    }
}

fn build_request(request: &GenerationRequest) -> GeminiRequest {
    let mut parts = vec![Part::Text {
        text: format!("{}{}{}", request.system_prompt, QUESTION_PREFIX, request.message),
    }];

    if let Some(image) = request.image.as_deref().filter(|i| !i.is_empty()) {
        let (mime_type, data) = split_data_url(image).unwrap_or((DEFAULT_IMAGE_MIME, image));
        parts.push(Part::Image {
            inline_data: InlineData {
                mime_type: mime_type.to_string(),
                data: data.to_string(),
            },
        });
        parts.push(Part::Text {
            text: IMAGE_INSTRUCTION.to_string(),
        });
    }

    GeminiRequest {
        contents: vec![Content {
            role: "user".to_string(),
            parts,
        }],
        generation_config: GenerationConfig {
            temperature: 0.7,
            top_p: 0.95,
            top_k: 40,
            max_output_tokens: 1024,
        },
    }
}

fn first_text(response: GeminiResponse) -> Option<String> {
    response
        .candidates
        .into_iter()
        .next()?
        .content?
        .parts
        .into_iter()
        .next()?
        .text
}
