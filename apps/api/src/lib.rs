//! Screening conversation service: session lifecycle, dual-identity access,
//! score normalization and the client-side synchronization used by screens.

pub mod access;
pub mod client;
pub mod config;
pub mod db;
pub mod errors;
pub mod llm_client;
pub mod models;
pub mod routes;
pub mod scoring;
pub mod screening;
pub mod state;
pub mod store;
