//! Domain error types.

mod sync_error;

pub use sync_error::{SyncError, SyncResult};
