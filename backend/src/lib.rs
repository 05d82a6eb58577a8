//! # buildtrack
//!
//! Backend for construction project management: projects and their teams,
//! site diaries, tasks, budgets with supplier invoices, project file
//! storage and LLM-assisted invoice extraction.
//!
//! ## Architecture
//!
//! - [`models`]: domain records shared by every layer
//! - [`routes`]: procedure inputs, validation and path constants
//! - [`db`]: repository traits with in-memory and Postgres backends
//! - [`services`]: the procedures, plus storage, extraction and CSV export
//! - [`rpc`]: call context, dispatcher and wire envelope
//! - [`http`]: axum server for the batch transport
//! - [`client`]: transports and the optimistic query cache
//! - [`config`]: `buildtrack.toml` plus environment overrides

// RepositoryError carries context for debugging, so it is large.
#![allow(clippy::result_large_err)]

pub mod api;
pub mod client;
pub mod config;
pub mod db;
pub mod models;
pub mod routes;
pub mod rpc;
pub mod services;

#[cfg(feature = "http-server")]
pub mod http;
