//! Application layer: state containers, services and push subscriptions.

/// Session context wiring services and channels together.
pub mod context;
/// Read-only snapshots for consumers.
pub mod dto;
/// Notification and messaging services.
pub mod services;
/// Service tunables.
pub mod settings;
/// Reducer-driven state containers.
pub mod state;
/// Record store and unread counter.
pub mod store;
/// Push channel management.
pub mod subscription;

pub use context::SyncContext;
pub use dto::{MessagingSnapshot, NotificationSnapshot};
pub use services::{MessagingService, NotificationService};
pub use settings::SyncSettings;
pub use subscription::{PushHandler, SubscriptionManager};
