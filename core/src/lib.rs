// Core of the tourism session pipeline:
// - Session, principal and credential types
// - Shared error taxonomy
// - Client configuration loading
// - Request dispatcher and its decoration stages
// - Reply decoding at the HTTP boundary

// Export client module - Request dispatcher
pub mod client;
pub use client::*;

// Export types module - Session data model
pub mod types;
pub use types::*;

// Export config module - Configuration loading
pub mod config;
pub use config::*;

// Export errors module - Shared error types
pub mod errors;
pub use errors::*;

pub mod reply;
pub use reply::{payload, Reply};

pub mod stages;
pub use stages::{DispatchContext, RequestStage};

pub mod token;
pub use token::{jwt_expiry, parse_timestamp};
