//! Data transfer objects for the application layer.

mod snapshot_dto;

pub use snapshot_dto::{MessagingSnapshot, NotificationSnapshot};
