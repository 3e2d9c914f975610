//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate repository calls into use-case level APIs.
//! - Enforce the ownership guard before any mutation of an existing list.

pub mod list_service;
