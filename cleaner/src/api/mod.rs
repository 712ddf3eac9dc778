//! HTTP API module.
//!
//! The artifact server, its wire types, and the console logger shared by
//! the job and the server.

pub mod logs;
pub mod server;
pub mod types;

pub use logs::*;
pub use server::{router, start_server};
pub use types::*;
