//! Authenticated request pipeline.

mod client;
pub mod envelope;
mod refresh;
mod request;

pub use client::{ApiClient, REFRESH_TOKEN_PATH};
pub use envelope::{ApiEnvelope, BusinessCodes, Outcome};
pub use request::{ApiRequest, AuthMode, BlobResponse, RequestBody, ResponseKind};
