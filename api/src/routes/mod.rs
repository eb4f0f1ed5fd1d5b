//! HTTP route handlers

pub mod auth;
