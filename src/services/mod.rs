//! Request-level services composed from auth and store

pub mod login;
pub mod submission;

pub use login::{LoginOutcome, LoginService};
pub use submission::SubmissionService;
