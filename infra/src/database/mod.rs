//! Database connectivity and repository implementations

mod connection;
pub mod mysql;

pub use connection::create_pool;
pub use mysql::MySqlTokenRepository;
