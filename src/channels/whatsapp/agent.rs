//! WhatsApp Agent
//!
//! Owns the WhatsApp Web client: session storage, the event loop and the
//! wiring between inbound messages and the storefront dispatcher. Pairing
//! QR codes are published to the shared state for the gateway page.

use super::handler;
use super::WhatsAppState;
use crate::shop::Storefront;
use std::path::PathBuf;
use std::sync::Arc;

use wacore::types::events::Event;
use whatsapp_rust::bot::Bot;
use whatsapp_rust_sqlite_storage::SqliteStore;
use whatsapp_rust_tokio_transport::TokioWebSocketTransportFactory;
use whatsapp_rust_ureq_http_client::UreqHttpClient;

/// WhatsApp agent that forwards customer messages to the storefront.
pub struct WhatsAppAgent {
    shop: Arc<Storefront>,
    state: Arc<WhatsAppState>,
    /// Directory holding the paired-session database.
    data_dir: PathBuf,
}

impl WhatsAppAgent {
    pub fn new(shop: Arc<Storefront>, state: Arc<WhatsAppState>, data_dir: PathBuf) -> Self {
        Self { shop, state, data_dir }
    }

    /// Start as a background task. Returns the JoinHandle.
    ///
    /// If already paired (session database present) the client reconnects
    /// silently; otherwise the pairing QR is published for the gateway's
    /// `/qr` page to render.
    pub fn start(self) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            let db_path = self.data_dir.join("whatsapp").join("session.db");
            if let Some(parent) = db_path.parent() {
                let _ = std::fs::create_dir_all(parent);
            }

            let backend = match SqliteStore::new(db_path.to_string_lossy().as_ref()).await {
                Ok(store) => Arc::new(store),
                Err(e) => {
                    tracing::error!("WhatsApp: failed to open session store: {e}");
                    return;
                }
            };

            let shop = self.shop.clone();
            let state = self.state.clone();

            let bot_result = Bot::builder()
                .with_backend(backend)
                .with_transport_factory(TokioWebSocketTransportFactory::new())
                .with_http_client(UreqHttpClient::new())
                .on_event(move |event, client| {
                    let shop = shop.clone();
                    let state = state.clone();
                    async move {
                        match event {
                            Event::PairingQrCode { ref code, .. } => {
                                tracing::info!(
                                    "WhatsApp: QR code available, open the /qr page to scan"
                                );
                                state.set_qr(Some(code.clone())).await;
                            }
                            Event::Connected(_) => {
                                tracing::info!("WhatsApp: connected successfully");
                                state.set_qr(None).await;
                                state.set_connected(true).await;
                            }
                            Event::PairSuccess(_) => {
                                tracing::info!("WhatsApp: pairing successful");
                            }
                            Event::Message(msg, info) => {
                                handler::handle_message(*msg, info, client, shop).await;
                            }
                            Event::LoggedOut(_) => {
                                tracing::warn!(
                                    "WhatsApp: logged out; delete the session database and re-pair"
                                );
                                state.set_connected(false).await;
                            }
                            Event::Disconnected(_) => {
                                tracing::warn!("WhatsApp: disconnected");
                                state.set_connected(false).await;
                            }
                            other => {
                                tracing::debug!("WhatsApp: unhandled event: {other:?}");
                            }
                        }
                    }
                })
                .build()
                .await;

            let mut bot = match bot_result {
                Ok(b) => b,
                Err(e) => {
                    tracing::error!("WhatsApp: failed to build bot: {e}");
                    return;
                }
            };

            match bot.run().await {
                Ok(handle) => {
                    if let Err(e) = handle.await {
                        tracing::error!("WhatsApp agent task error: {e:?}");
                    }
                }
                Err(e) => {
                    tracing::error!("WhatsApp agent error: {e}");
                }
            }
        })
    }
}
