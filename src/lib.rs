//! Terminal Pokédex backed by PokeAPI.
//!
//! The library holds the data layer (HTTP client with retry and caching,
//! search, pagination, favorites persistence) and a rendering-independent
//! application state machine. `main.rs` wires these to a ratatui UI.

pub mod app;
pub mod cache;
pub mod client;
pub mod config;
pub mod debounce;
pub mod error;
pub mod favorites;
pub mod models;
pub mod pagination;
pub mod retry;
pub mod search;
pub mod storage;
pub mod ui;
pub mod utils;

pub use client::PokeClient;
pub use config::Config;
pub use error::{ApiError, ErrorKind, StorageError};
pub use favorites::FavoritesStore;
