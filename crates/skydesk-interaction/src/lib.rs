//! Backend interaction layer for Skydesk.
//!
//! Provides the reqwest-based [`ChatApiClient`] implementing the
//! `TurnClient` seam from `skydesk-core`, plus endpoint configuration.

pub mod chat_api_client;
pub mod config;

pub use chat_api_client::ChatApiClient;
pub use config::BackendConfig;
