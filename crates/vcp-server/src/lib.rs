//! TCP server for VCP.
//!
//! Serves project submissions, clones, listings and account requests over
//! the length-prefixed frame protocol, one command per connection.

pub mod config;
pub mod error;
pub mod handler;
pub mod server;
mod walk;

pub use config::{ServerConfig, USERS_DIR};
pub use error::{ServerError, ServerResult};
pub use handler::Dispatcher;
pub use server::{shutdown_signal, VcpServer};
