//! REST API client module for the product catalog service.
//!
//! This module provides the `ApiClient` for communicating with the catalog
//! server's product endpoints.
//!
//! The API uses JWT bearer token authentication obtained through the
//! `/auth/login` endpoint and renewed transparently via `/auth/refresh`
//! when a request fails authorization.

pub mod client;
pub mod error;
pub mod products;

pub use client::ApiClient;
pub use error::ApiError;
pub use products::DEFAULT_PAGE_SIZE;
