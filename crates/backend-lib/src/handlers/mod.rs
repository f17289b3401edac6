//! HTTP handlers for the login, logout and identity endpoints.

pub mod auth;
