//! WhatsApp Message Handler
//!
//! Processes incoming messages: unwraps nested message containers, extracts
//! text, filters out groups/broadcasts/self-echoes and routes the rest
//! through the storefront dispatcher.

use crate::shop::{Reply, Storefront};
use std::sync::Arc;

use wacore::types::message::MessageInfo;
use waproto::whatsapp::Message;
use whatsapp_rust::client::Client;

/// WhatsApp text messages cap out far higher, but long replies read badly;
/// split on line boundaries near this size.
const MAX_MESSAGE_LEN: usize = 4000;

/// Unwrap nested message wrappers (device_sent, ephemeral, view_once).
/// Returns the innermost Message that contains actual content.
fn unwrap_message(msg: &Message) -> &Message {
    if let Some(ref dsm) = msg.device_sent_message
        && let Some(ref inner) = dsm.message
    {
        return unwrap_message(inner);
    }
    if let Some(ref eph) = msg.ephemeral_message
        && let Some(ref inner) = eph.message
    {
        return unwrap_message(inner);
    }
    if let Some(ref vo) = msg.view_once_message
        && let Some(ref inner) = vo.message
    {
        return unwrap_message(inner);
    }
    msg
}

/// Extract plain text: the conversation field for simple messages, the
/// extended text for messages with previews/formatting.
fn extract_text(msg: &Message) -> Option<String> {
    let msg = unwrap_message(msg);
    if let Some(ref conv) = msg.conversation
        && !conv.is_empty()
    {
        return Some(conv.clone());
    }
    if let Some(ref ext) = msg.extended_text_message
        && let Some(ref text) = ext.text
        && !text.is_empty()
    {
        return Some(text.clone());
    }
    None
}

/// Split a reply into chunks, preferring to break on a newline close to the
/// limit so product lists stay readable.
pub(crate) fn split_message(text: &str, max_len: usize) -> Vec<&str> {
    if text.len() <= max_len {
        return vec![text];
    }
    let mut chunks = Vec::new();
    let mut start = 0;
    while start < text.len() {
        let end = (start + max_len).min(text.len());
        let break_at = if end < text.len() {
            text[start..end]
                .rfind('\n')
                .filter(|&pos| pos > end - start - 200)
                .map(|pos| start + pos + 1)
                .unwrap_or(end)
        } else {
            end
        };
        chunks.push(&text[start..break_at]);
        start = break_at;
    }
    chunks
}

/// Render a reply for a channel without native document upload: the
/// document variant becomes a caption plus a named link.
fn render_reply(reply: Reply) -> String {
    match reply {
        Reply::Text(text) => text,
        Reply::Document { url, file_name, caption } => {
            format!("{caption}\n\n📎 {file_name}\n{url}")
        }
    }
}

pub(crate) async fn handle_message(
    msg: Message,
    info: MessageInfo,
    client: Arc<Client>,
    shop: Arc<Storefront>,
) {
    // Our own replies echo back with is_from_me; the storefront must never
    // talk to itself (or to the store operator's outgoing messages).
    if info.source.is_from_me {
        return;
    }

    // Only direct customer chats; groups and broadcast/status traffic are
    // not storefront conversations.
    let chat = info.source.chat.to_string();
    if info.source.is_group || chat.contains("@broadcast") {
        return;
    }

    let Some(text) = extract_text(&msg) else {
        return;
    };

    let conversation_id = info.source.sender.to_string();
    let sender_name = if info.push_name.is_empty() {
        "Cliente".to_string()
    } else {
        info.push_name.clone()
    };

    tracing::info!("WhatsApp: message from {} ({}): {}", conversation_id, sender_name, text);

    let reply = shop.handle_message(&conversation_id, &sender_name, &text).await;
    let rendered = render_reply(reply);

    let reply_jid = info.source.sender.clone();
    for chunk in split_message(&rendered, MAX_MESSAGE_LEN) {
        let outbound = Message {
            conversation: Some(chunk.to_string()),
            ..Default::default()
        };
        if let Err(e) = client.send_message(reply_jid.clone(), outbound).await {
            tracing::error!("WhatsApp: failed to send reply: {e}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_text_conversation() {
        let msg = Message {
            conversation: Some("agregar 1".to_string()),
            ..Default::default()
        };
        assert_eq!(extract_text(&msg), Some("agregar 1".to_string()));
    }

    #[test]
    fn test_extract_text_extended() {
        let msg = Message {
            extended_text_message: Some(Box::new(
                waproto::whatsapp::message::ExtendedTextMessage {
                    text: Some("laptop hasta 800".to_string()),
                    ..Default::default()
                },
            )),
            ..Default::default()
        };
        assert_eq!(extract_text(&msg), Some("laptop hasta 800".to_string()));
    }

    #[test]
    fn test_extract_text_none_for_empty() {
        let msg = Message {
            conversation: Some(String::new()),
            ..Default::default()
        };
        assert_eq!(extract_text(&msg), None);
    }

    #[test]
    fn test_split_short_message() {
        let chunks = split_message("hola", 4000);
        assert_eq!(chunks, vec!["hola"]);
    }

    #[test]
    fn test_split_long_message_preserves_content() {
        let text = "1. Producto\n".repeat(800);
        let chunks = split_message(&text, 4000);
        assert!(chunks.len() >= 2);
        for chunk in &chunks {
            assert!(chunk.len() <= 4000);
        }
        let joined: String = chunks.concat();
        assert_eq!(joined, text);
    }

    #[test]
    fn test_render_document_reply_as_link() {
        let rendered = render_reply(Reply::Document {
            url: "https://example.com/catalogo.pdf".into(),
            file_name: "Catálogo.pdf".into(),
            caption: "📄 Aquí tienes nuestro catálogo.".into(),
        });
        assert!(rendered.starts_with("📄 Aquí tienes nuestro catálogo."));
        assert!(rendered.contains("Catálogo.pdf"));
        assert!(rendered.ends_with("https://example.com/catalogo.pdf"));
    }
}
