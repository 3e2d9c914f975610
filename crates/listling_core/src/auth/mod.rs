//! Boundary authentication for the untrusted web channel.
//!
//! # Responsibility
//! - Verify signed init-data payloads asserting a chat-platform identity.
//!
//! # Invariants
//! - The chat channel is implicitly trusted by its transport; only
//!   web-originated requests pass through this module.
//! - Signature comparison is constant time.

pub mod init_data;
