//! WhatsApp Integration
//!
//! Runs a WhatsApp Web client for the store's account, forwarding customer
//! messages to the storefront dispatcher and replying with its output.

mod agent;
pub(crate) mod handler;

pub use agent::WhatsAppAgent;

use tokio::sync::Mutex;

/// Shared WhatsApp connection state.
///
/// Written by the bot's event loop (pairing QR, connect/disconnect), read
/// by the gateway's QR page.
#[derive(Default)]
pub struct WhatsAppState {
    /// Latest pairing QR payload; cleared once connected.
    qr: Mutex<Option<String>>,
    connected: Mutex<bool>,
}

impl WhatsAppState {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn set_qr(&self, code: Option<String>) {
        *self.qr.lock().await = code;
    }

    pub async fn qr(&self) -> Option<String> {
        self.qr.lock().await.clone()
    }

    pub async fn set_connected(&self, connected: bool) {
        *self.connected.lock().await = connected;
    }

    pub async fn is_connected(&self) -> bool {
        *self.connected.lock().await
    }
}
