//! Storefront Dispatcher
//!
//! Entry point for inbound messages: resolves the conversation's session,
//! applies reset keywords, walks the menu table and forwards search-state
//! messages to the search/cart flow. Every path produces a reply; nothing
//! propagates to the transport as an error.

use super::menu::{self, MenuAction, RESET_KEYWORDS};
use super::search;
use super::session::{MenuState, SessionRegistry};
use super::{Reply, StoreProfile};
use crate::catalog::CatalogGateway;
use crate::intent::IntentExtractor;
use crate::orders::{ContactRegistry, OrderSink};
use std::sync::Arc;

/// The conversational storefront: menu tree, per-conversation sessions and
/// the collaborators the flows call out to.
pub struct Storefront {
    sessions: SessionRegistry,
    profile: StoreProfile,
    catalog: Arc<dyn CatalogGateway>,
    extractor: Arc<dyn IntentExtractor>,
    orders: Arc<dyn OrderSink>,
    contacts: Arc<dyn ContactRegistry>,
}

impl Storefront {
    pub fn new(
        profile: StoreProfile,
        catalog: Arc<dyn CatalogGateway>,
        extractor: Arc<dyn IntentExtractor>,
        orders: Arc<dyn OrderSink>,
        contacts: Arc<dyn ContactRegistry>,
    ) -> Self {
        Self {
            sessions: SessionRegistry::new(),
            profile,
            catalog,
            extractor,
            orders,
            contacts,
        }
    }

    /// Handle one inbound text message.
    ///
    /// Holds the conversation's session lock for the whole call, so two
    /// messages from the same conversation are processed strictly in order
    /// while distinct conversations run in parallel.
    pub async fn handle_message(
        &self,
        conversation_id: &str,
        sender_name: &str,
        text: &str,
    ) -> Reply {
        let raw = text.trim();
        let command = raw.to_uppercase();

        let handle = self.sessions.get_or_create(conversation_id).await;
        let mut session = handle.lock().await;

        // Reset keywords override everything, including the search state.
        if RESET_KEYWORDS.contains(&command.as_str()) {
            session.reset();
            return Reply::Text(menu::render_main_menu(&self.profile, sender_name));
        }

        // Best-effort contact upsert; a datastore hiccup must not block the
        // conversation.
        let phone = phone_from_conversation(conversation_id);
        if let Err(e) = self.contacts.ensure_contact(phone, sender_name).await {
            tracing::warn!("Contacts: upsert failed for {phone}: {e}");
        }

        match session.menu {
            MenuState::Main => match menu::find_option(&command) {
                None => Reply::Text(menu::INVALID_OPTION.to_string()),
                Some(option) => match option.action {
                    MenuAction::Navigate(target) => {
                        session.menu = target;
                        Reply::Text(menu::prompt_for(target, &self.profile, sender_name))
                    }
                    MenuAction::Inform(action) => menu::render_info(action, &self.profile),
                },
            },
            MenuState::Searching => Reply::Text(
                search::handle_search(
                    &mut session,
                    raw,
                    conversation_id,
                    self.extractor.as_ref(),
                    self.catalog.as_ref(),
                    self.orders.as_ref(),
                )
                .await,
            ),
        }
    }

    /// Registry accessor for diagnostics and tests.
    pub fn sessions(&self) -> &SessionRegistry {
        &self.sessions
    }
}

/// JIDs look like `5215551234567@s.whatsapp.net`; the contact sheet keys on
/// the bare phone number.
fn phone_from_conversation(conversation_id: &str) -> &str {
    conversation_id
        .split('@')
        .next()
        .unwrap_or(conversation_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{ProductFilters, ProductSnapshot};
    use crate::intent::{ChatTurn, ExtractorError, ProductIntent};
    use crate::orders::Order;
    use async_trait::async_trait;
    use std::sync::Mutex as StdMutex;

    struct StaticCatalog(Vec<ProductSnapshot>);

    #[async_trait]
    impl CatalogGateway for StaticCatalog {
        async fn query(&self, _filters: &ProductFilters) -> anyhow::Result<Vec<ProductSnapshot>> {
            Ok(self.0.clone())
        }
    }

    struct StaticExtractor(ProductIntent);

    #[async_trait]
    impl IntentExtractor for StaticExtractor {
        async fn extract(&self, _history: &[ChatTurn]) -> Result<ProductIntent, ExtractorError> {
            Ok(self.0.clone())
        }
    }

    #[derive(Default)]
    struct MemorySink {
        orders: StdMutex<Vec<Order>>,
    }

    #[async_trait]
    impl OrderSink for MemorySink {
        async fn append_order(&self, order: &Order) -> anyhow::Result<()> {
            self.orders.lock().expect("lock").push(order.clone());
            Ok(())
        }
        async fn update_stock(&self, _product_id: &str, _new_quantity: u32) -> anyhow::Result<()> {
            Ok(())
        }
    }

    #[derive(Default)]
    struct MemoryContacts {
        upserts: StdMutex<Vec<(String, String)>>,
        fail: bool,
    }

    #[async_trait]
    impl ContactRegistry for MemoryContacts {
        async fn ensure_contact(&self, phone: &str, name: &str) -> anyhow::Result<()> {
            if self.fail {
                anyhow::bail!("sheet unavailable");
            }
            self.upserts
                .lock()
                .expect("lock")
                .push((phone.to_string(), name.to_string()));
            Ok(())
        }
    }

    fn storefront_with(contacts: Arc<MemoryContacts>) -> Storefront {
        let intent = ProductIntent {
            name: None,
            category: Some("celular".into()),
            max_price: None,
            brand: None,
            model: None,
            reply: "Aquí tienes celulares".into(),
        };
        Storefront::new(
            StoreProfile { name: Some("TecnoDemo".into()), ..Default::default() },
            Arc::new(StaticCatalog(Vec::new())),
            Arc::new(StaticExtractor(intent)),
            Arc::new(MemorySink::default()),
            contacts,
        )
    }

    fn storefront() -> Storefront {
        storefront_with(Arc::new(MemoryContacts::default()))
    }

    const JID: &str = "5215551234567@s.whatsapp.net";

    fn text_of(reply: Reply) -> String {
        match reply {
            Reply::Text(t) => t,
            Reply::Document { .. } => unreachable!("expected a text reply"),
        }
    }

    #[tokio::test]
    async fn test_option_a_enters_search() {
        let shop = storefront();
        let reply = text_of(shop.handle_message(JID, "Ana", "A").await);
        assert_eq!(reply, menu::SEARCH_PROMPT);

        let handle = shop.sessions().get_or_create(JID).await;
        let session = handle.lock().await;
        assert_eq!(session.menu, MenuState::Searching);
        assert!(session.cart.is_empty());
    }

    #[tokio::test]
    async fn test_unknown_option_is_invalid_without_mutation() {
        let shop = storefront();
        let reply = text_of(shop.handle_message(JID, "Ana", "Z").await);
        assert_eq!(reply, menu::INVALID_OPTION);

        let handle = shop.sessions().get_or_create(JID).await;
        assert_eq!(handle.lock().await.menu, MenuState::Main);
    }

    #[tokio::test]
    async fn test_inform_option_keeps_state() {
        let shop = storefront();
        let reply = text_of(shop.handle_message(JID, "Ana", "c").await);
        assert!(reply.contains("Horarios de Atención"));

        let handle = shop.sessions().get_or_create(JID).await;
        assert_eq!(handle.lock().await.menu, MenuState::Main);
    }

    #[tokio::test]
    async fn test_reset_from_search_state() {
        let shop = storefront();
        shop.handle_message(JID, "Ana", "A").await;
        let reply = text_of(shop.handle_message(JID, "Ana", "menu").await);
        assert!(reply.contains("TecnoDemo"));

        let handle = shop.sessions().get_or_create(JID).await;
        let session = handle.lock().await;
        assert_eq!(session.menu, MenuState::Main);
        assert!(session.history.is_empty());
    }

    #[tokio::test]
    async fn test_contact_upsert_uses_bare_phone() {
        let contacts = Arc::new(MemoryContacts::default());
        let shop = storefront_with(contacts.clone());
        shop.handle_message(JID, "Ana", "B").await;

        let upserts = contacts.upserts.lock().expect("lock");
        assert_eq!(upserts.as_slice(), &[("5215551234567".to_string(), "Ana".to_string())]);
    }

    #[tokio::test]
    async fn test_contact_failure_does_not_block_reply() {
        let contacts = Arc::new(MemoryContacts { fail: true, ..Default::default() });
        let shop = storefront_with(contacts);
        let reply = text_of(shop.handle_message(JID, "Ana", "D").await);
        assert!(reply.contains("Información de Contacto"));
    }

    #[tokio::test]
    async fn test_reset_skips_contact_upsert() {
        let contacts = Arc::new(MemoryContacts::default());
        let shop = storefront_with(contacts.clone());
        shop.handle_message(JID, "Ana", "SALIR").await;
        assert!(contacts.upserts.lock().expect("lock").is_empty());
    }
}
