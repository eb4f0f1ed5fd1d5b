//! Error translation between the domain and HTTP

pub mod error_handler;

pub use error_handler::handle_domain_error;
