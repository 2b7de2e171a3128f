//! Data models for the research projects backend.
//!
//! Field names match the JSON contract the dashboard frontend already speaks.

mod collaborator;
mod email;
mod project;
mod user;

pub use collaborator::*;
pub use email::*;
pub use project::*;
pub use user::*;
