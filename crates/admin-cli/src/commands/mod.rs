pub mod auth;
pub mod dict;
