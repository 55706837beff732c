//! Web framework integrations.
//!
//! The service core ([`crate::service`]) is framework-agnostic; this module
//! maps it onto HTTP.
//!
//! | Framework | Module |
//! |-----------|--------|
//! | Axum | [`axum`] |
//!
//! # Common Pattern
//!
//! 1. Load a [`ServiceConfig`](crate::ServiceConfig)
//! 2. Create a shared [`BrowserManager`](crate::BrowserManager)
//! 3. Put both into the framework's application state
//! 4. Run renders through `spawn_blocking` under a [`Deadline`](crate::Deadline)

pub mod axum;
