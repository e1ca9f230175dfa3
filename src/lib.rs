//! Mercabot - WhatsApp Storefront Bot
//!
//! A conversational storefront over WhatsApp: a fixed menu tree, natural
//! language product search delegated to an LLM, an in-memory per-customer
//! cart and a Google Sheets datastore for catalog, orders, stock and
//! contacts.
//!
//! ## Architecture
//!
//! - `shop`: the core. Per-conversation sessions, menu dispatch, the
//!   search flow and the cart/checkout engine; collaborators are trait
//!   objects.
//! - `catalog`, `intent`, `orders`: collaborator contracts (plus the
//!   OpenAI extractor implementation).
//! - `sheets`: the spreadsheet-backed datastore implementing those
//!   contracts.
//! - `channels`: the WhatsApp transport.
//! - `gateway`: the pairing QR page.

pub mod catalog;
pub mod channels;
pub mod config;
pub mod gateway;
pub mod intent;
pub mod logging;
pub mod orders;
pub mod sheets;
pub mod shop;

// Re-export the core entry points
pub use shop::{Reply, Storefront, StoreProfile};

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
