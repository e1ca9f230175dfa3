//! Channel Integrations
//!
//! Messaging transports that feed inbound text into the storefront and
//! deliver its replies. WhatsApp is the only channel; the dispatcher is
//! transport-agnostic, so others can be added alongside it.

pub mod whatsapp;
