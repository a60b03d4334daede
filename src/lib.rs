//! clubsync - notification and messaging state sync for the campus club client.
//!
//! Keeps locally held notification and conversation lists consistent with
//! the server under optimistic mutations, paginated loading and push events.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

/// Application layer containing state containers, services and push handling.
pub mod application;
/// Domain layer containing entities, errors, and port definitions.
pub mod domain;
/// Infrastructure layer containing adapters for external services.
pub mod infrastructure;

/// Current version of the application.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name.
pub const NAME: &str = "clubsync";
