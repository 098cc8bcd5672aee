//! Core library for stockroom, a product-catalog admin client.
//!
//! The interesting part lives in [`api::ApiClient`] and
//! [`auth::SessionManager`]: bearer-token session handling with transparent,
//! single-flight renewal when requests fail authorization. Frontends stay
//! thin - they call typed product endpoints and subscribe to
//! [`events::SessionEvents`] to learn when the session dies under them.

pub mod api;
pub mod auth;
pub mod config;
pub mod events;
pub mod models;

pub use api::{ApiClient, ApiError};
pub use auth::{AuthError, SessionManager};
pub use config::Config;
pub use events::{SessionEvent, SessionEvents};
