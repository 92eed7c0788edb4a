//! Tinymind - a thought journal stored in your own GitHub repository
//!
//! Users log in with GitHub OAuth. Each user's thoughts live in a JSON file
//! inside a repository under their own account, created from a template on
//! first use. The server keeps no database; every read and write goes
//! through the GitHub contents API with the user's access token.
//!
//! ## Modules
//!
//! - **auth**: OAuth code exchange, identity lookup, cookie sessions
//! - **store**: remote content seam, repository provisioning, thoughts file
//! - **services**: login and submission flows
//! - **routes**: HTTP handlers
//! - **server**: hyper accept loop and request routing

pub mod auth;
pub mod config;
pub mod routes;
pub mod server;
pub mod services;
pub mod store;
pub mod types;

pub use config::Args;
pub use server::{run, AppState};
pub use types::{Result, TinymindError};
