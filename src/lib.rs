//! Library crate for draft-clock-back, exposing modules for binaries, viewer clients, and integration tests.

pub mod client;
pub mod clock;
pub mod config;
pub mod dto;
mod error;
pub mod routes;
pub mod services;
pub mod state;
