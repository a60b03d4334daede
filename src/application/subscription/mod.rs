//! Push channel ownership and event demultiplexing.

mod handler;
mod manager;

pub use handler::{PushHandler, dispatch};
pub use manager::SubscriptionManager;
