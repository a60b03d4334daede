mod client;
mod codec;
mod connection;
mod constants;
mod error;

pub use client::{PushClient, PushClientConfig};
pub use codec::EventParser;
pub use constants::MAX_RECONNECT_ATTEMPTS;
pub use error::{PushError, PushResult};
