//! # redcat-server
//!
//! Axum HTTP surface for the single-text embedding service.
//!
//! - `POST /embed`: `{text}` → `{vector, dim}`
//! - `GET /health`: liveness, uptime, and the model dimension once known
//! - Graceful shutdown on Ctrl-C / SIGTERM

#![deny(unsafe_code)]

pub mod config;
pub mod errors;
pub mod health;
pub mod server;
pub mod shutdown;

pub use config::ServerConfig;
pub use errors::ApiError;
pub use server::{AppState, EmbedRequest, EmbedResponse, EmbedServer};
