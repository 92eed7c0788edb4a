//! Shared types for Tinymind

pub mod error;
pub mod thought;

pub use error::{IdentityFailure, Result, TinymindError, ValidationError};
pub use thought::{Thought, ThoughtCollection};
