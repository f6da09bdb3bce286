//! # Feature Planner
//!
//! An HTTP service that turns a short feature brief into user stories and
//! grouped engineering tasks using a hosted chat-completion model, then
//! lets the plan be edited, reordered and exported.
//!
//! ## Features
//!
//! - **Generation**: model output is extracted, normalized and checked
//!   against minimums, with a deterministic fallback plan
//! - **Task Board**: group-scoped drag reordering with dense global order
//! - **Optimistic Edits**: local task patches rolled back on remote failure
//! - **Export**: canonical markdown and a plain-text rendering
//! - **Audit Trail**: one generation record per spec with usage and cost
//!
//! ## Architecture
//!
//! ```text
//! HTTP Client → axum Router → SpecService → Generator → Chat Completions (HTTP)
//!                                  ↓
//!                            SQLite (State)
//! ```
//!
//! ## Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use feature_planner::{Config, AppState};
//! use feature_planner::server::run_server;
//! use feature_planner::storage::SqliteStorage;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::from_env()?;
//!     let storage = SqliteStorage::new(&config.database).await?;
//!     let state = Arc::new(AppState::new(config, storage)?);
//!     run_server(state).await?;
//!     Ok(())
//! }
//! ```

/// Task board reorder engine and optimistic edits.
pub mod board;
/// Configuration management for the service.
pub mod config;
/// Error types and result aliases for the application.
pub mod error;
/// Markdown rendering and plain-text export.
pub mod export;
/// Chat-completion client and wire types.
pub mod llm;
/// Plan generation, normalization and fallback.
pub mod planner;
/// Prompts sent to the model.
pub mod prompts;
/// HTTP server, routing and handlers.
pub mod server;
/// Spec lifecycle service.
pub mod specs;
/// SQLite storage layer for persistence.
pub mod storage;
/// Request validation.
pub mod validation;

pub use config::Config;
pub use error::{AppError, AppResult};
pub use server::{AppState, SharedState};
