//! HTTP server exposing the procedures over the batch RPC transport.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │  HTTP layer (axum)                                       │
//! │  - /api/trpc/{paths}: batch decoding, session headers    │
//! │  - CORS, compression, tracing                            │
//! └───────────────────┬──────────────────────────────────────┘
//!                     │
//! ┌───────────────────▼──────────────────────────────────────┐
//! │  rpc::dispatch + services::* procedures                  │
//! └───────────────────┬──────────────────────────────────────┘
//!                     │
//! ┌───────────────────▼──────────────────────────────────────┐
//! │  db repositories, object storage, language model         │
//! └──────────────────────────────────────────────────────────┘
//! ```

pub mod dto;
pub mod error;
pub mod handlers;
pub mod router;
pub mod state;

pub use router::create_router;
pub use state::AppState;
