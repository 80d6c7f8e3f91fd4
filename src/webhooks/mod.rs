//! Handling of inbound GitHub webhook payloads.
//!
//! This module provides:
//! - Signature verification for webhook payloads (HMAC-SHA256)
//! - Normalization of raw payloads into canonical events, with display titles

pub mod normalize;
pub mod payload;
pub mod signature;
pub mod title;

pub use normalize::normalize;
pub use signature::{
    WebhookSecret, compute_signature, format_signature_header, parse_signature_header,
    verify_signature,
};
pub use title::generate_title;
