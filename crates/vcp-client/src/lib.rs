//! Client for VCP servers.
//!
//! Every request opens its own TCP connection, drives one command to
//! completion and closes it. The session token obtained by `signup` or
//! `login` is cached on disk by [`SessionCache`].

pub mod client;
pub mod error;
pub mod session;

pub use client::{Client, CloneReport, ProgressFn, Signup, SubmitReport};
pub use error::{ClientError, ClientResult};
pub use session::{SessionCache, SESSION_FILE};
