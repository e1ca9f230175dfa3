//! Intent Extraction
//!
//! Turns free-form product searches into structured filter criteria by
//! delegating to an external language model. The model is a black box with
//! a fixed JSON contract; this module owns the chat-turn types, the
//! validated contract record and the extractor trait.

mod openai;

pub use openai::OpenAiExtractor;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Speaker of a chat turn, serialized in the wire casing the chat API expects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// One turn of the rolling conversation sent to the extractor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatTurn {
    pub role: Role,
    pub content: String,
}

impl ChatTurn {
    pub fn system(content: impl Into<String>) -> Self {
        Self { role: Role::System, content: content.into() }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self { role: Role::User, content: content.into() }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self { role: Role::Assistant, content: content.into() }
    }
}

/// Validated extractor response.
///
/// Field names serialize back to the Spanish wire contract so the assistant
/// turn echoed into the history matches what the model itself produced,
/// preserving few-shot continuity across searches.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductIntent {
    #[serde(rename = "nombre_producto")]
    pub name: Option<String>,
    #[serde(rename = "categoria")]
    pub category: Option<String>,
    #[serde(rename = "precio_maximo")]
    pub max_price: Option<f64>,
    #[serde(rename = "marca")]
    pub brand: Option<String>,
    #[serde(rename = "modelo")]
    pub model: Option<String>,
    /// Short confirmation line shown above the result list. The only
    /// non-nullable contract field; its absence fails the parse.
    #[serde(rename = "respuesta_breve")]
    pub reply: String,
}

impl ProductIntent {
    /// True when the model extracted nothing searchable: no category, no
    /// free-text name and no price ceiling. Brand/model alone never trigger
    /// a catalog query.
    pub fn is_empty(&self) -> bool {
        self.category.is_none() && self.name.is_none() && self.max_price.is_none()
    }
}

/// Extractor failure modes. All of them collapse into the same generic
/// "try again shortly" reply at the dispatch layer.
#[derive(Debug, Error)]
pub enum ExtractorError {
    #[error("extractor request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("extractor API error (status {status}): {message}")]
    Api { status: u16, message: String },

    /// The model answered, but not with the agreed JSON contract.
    #[error("malformed extractor response: {0}")]
    Contract(String),
}

/// Black-box natural-language → filter extraction.
#[async_trait]
pub trait IntentExtractor: Send + Sync {
    /// Extract filter criteria from the conversation so far. The last turn
    /// of `history` is the query being interpreted.
    async fn extract(&self, history: &[ChatTurn]) -> Result<ProductIntent, ExtractorError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_wire_casing() {
        let turn = ChatTurn::user("hola");
        let json = serde_json::to_string(&turn).expect("serialize");
        assert_eq!(json, r#"{"role":"user","content":"hola"}"#);
    }

    #[test]
    fn test_intent_is_empty() {
        let empty = ProductIntent {
            name: None,
            category: None,
            max_price: None,
            brand: Some("samsung".into()),
            model: None,
            reply: "No entendí qué buscas.".into(),
        };
        assert!(empty.is_empty());

        let by_price = ProductIntent { max_price: Some(500.0), ..empty.clone() };
        assert!(!by_price.is_empty());
    }

    #[test]
    fn test_intent_roundtrips_contract_names() {
        let raw = r#"{"categoria":"celular","precio_maximo":500,"respuesta_breve":"Buscando celulares hasta $500"}"#;
        let intent: ProductIntent = serde_json::from_str(raw).expect("parse");
        assert_eq!(intent.category.as_deref(), Some("celular"));
        assert_eq!(intent.max_price, Some(500.0));

        let echoed = serde_json::to_string(&intent).expect("serialize");
        assert!(echoed.contains("\"categoria\":\"celular\""));
        assert!(echoed.contains("\"precio_maximo\":500"));
    }
}
