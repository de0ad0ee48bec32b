use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use rendicion_ingest::{parse_receipts_json, ReceiptData, ReceiptExtractor, ScanError, ScanImage};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::time::Duration;
use tracing::debug;

use crate::config::OcrSection;

const PROMPT: &str = "Analiza la siguiente imagen, que puede contener una o varias boletas de venta en español. \
Procesa CADA boleta por separado. Para cada una: \
1. extrae el número de boleta (ej. '001-000306'); \
2. extrae el proveedor y la fecha (YYYY-MM-DD); \
3. lista todos los productos, corrige errores ortográficos obvios y escribe la descripción en MAYÚSCULAS; \
4. suma los montos de los productos y usa esa suma como total si el total impreso difiere o es ilegible; \
5. indica si es una boleta de venta o documento similar. \
Devuelve un array JSON con un objeto por boleta. Si no hay ninguna boleta, devuelve [].";

/// Receipt reader backed by Gemini `generateContent`.
pub struct GeminiExtractor {
    client: reqwest::Client,
    base_url: String,
    model: String,
    api_key: String,
}

impl GeminiExtractor {
    pub fn from_config(cfg: &OcrSection) -> Result<Self> {
        if cfg.provider != "gemini" {
            bail!("unsupported [ocr] provider {:?} (only \"gemini\")", cfg.provider);
        }
        let api_key = std::env::var(&cfg.api_key_env)
            .ok()
            .filter(|k| !k.trim().is_empty())
            .with_context(|| format!("{} is not set; export your Gemini API key", cfg.api_key_env))?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(cfg.timeout_secs))
            .build()
            .context("build http client")?;

        Ok(Self {
            client,
            base_url: cfg.base_url.trim_end_matches('/').to_string(),
            model: cfg.model.clone(),
            api_key,
        })
    }

    async fn generate(&self, image: &ScanImage) -> Result<String, String> {
        #[derive(Serialize)]
        #[serde(rename_all = "camelCase")]
        struct Req {
            contents: Vec<Value>,
            generation_config: Value,
        }

        #[derive(Deserialize)]
        struct Resp {
            #[serde(default)]
            candidates: Vec<Candidate>,
        }

        #[derive(Deserialize)]
        struct Candidate {
            content: Option<Content>,
        }

        #[derive(Deserialize)]
        struct Content {
            #[serde(default)]
            parts: Vec<Part>,
        }

        #[derive(Deserialize)]
        struct Part {
            text: Option<String>,
        }

        let body = Req {
            contents: vec![json!({
                "parts": [
                    { "inlineData": { "mimeType": image.mime_type, "data": STANDARD.encode(&image.bytes) } },
                    { "text": PROMPT }
                ]
            })],
            generation_config: json!({
                "responseMimeType": "application/json",
                "responseSchema": receipts_schema(),
            }),
        };

        let url = format!("{}/v1beta/models/{}:generateContent", self.base_url, self.model);
        let resp = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| e.to_string())?;

        let status = resp.status();
        if !status.is_success() {
            let txt = resp.text().await.unwrap_or_default();
            return Err(format!("gemini error: {status} {txt}"));
        }

        let raw = resp.text().await.map_err(|e| e.to_string())?;
        // A body without candidates is a blocked prompt.
        let out: Resp = serde_json::from_str(&raw).map_err(|e| format!("parse response: {e}"))?;
        let Some(first) = out.candidates.first() else {
            return Err(format!("response blocked: {raw}"));
        };

        let text: String = first
            .content
            .iter()
            .flat_map(|c| c.parts.iter())
            .filter_map(|p| p.text.as_deref())
            .collect();
        Ok(text)
    }
}

#[async_trait]
impl ReceiptExtractor for GeminiExtractor {
    async fn extract(&self, image: &ScanImage) -> Result<Vec<ReceiptData>, ScanError> {
        debug!(file = %image.file_name, bytes = image.bytes.len(), "sending receipt to gemini");
        let text = self
            .generate(image)
            .await
            .map_err(|raw| ScanError::Extractor(user_message(&raw).to_string()))?;
        parse_receipts_json(&text)
    }
}

/// Map a raw API failure to something a ward leader can act on.
pub fn user_message(raw: &str) -> &'static str {
    let lower = raw.to_lowercase();
    if lower.contains("safety") || lower.contains("blocked") {
        "El análisis fue bloqueado. La imagen puede contener contenido no permitido por las políticas de seguridad."
    } else if lower.contains("api key not valid") {
        "Error de configuración. La clave de API no es válida."
    } else if lower.contains("quota") {
        "Se ha excedido la cuota de uso de la API. Por favor, inténtelo más tarde."
    } else {
        "No se pudo analizar la boleta. La imagen podría ser muy borrosa, no contener texto claro, o no ser una boleta válida."
    }
}

fn receipts_schema() -> Value {
    json!({
        "type": "ARRAY",
        "items": {
            "type": "OBJECT",
            "properties": {
                "receiptNumber": { "type": "STRING", "description": "Número de la boleta, ej. '001-000306'." },
                "vendor": { "type": "STRING", "description": "Nombre del comercio o proveedor." },
                "date": { "type": "STRING", "description": "Fecha de la transacción, YYYY-MM-DD." },
                "total": { "type": "NUMBER", "description": "Suma de todos los lineItems." },
                "isBoleta": { "type": "BOOLEAN", "description": "Verdadero si es una boleta de venta o similar." },
                "lineItems": {
                    "type": "ARRAY",
                    "items": {
                        "type": "OBJECT",
                        "properties": {
                            "description": { "type": "STRING" },
                            "amount": { "type": "NUMBER" }
                        },
                        "required": ["description", "amount"]
                    }
                }
            },
            "required": ["receiptNumber", "vendor", "date", "total", "isBoleta", "lineItems"]
        }
    })
}
