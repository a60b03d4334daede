pub mod messaging_service;
pub mod notification_service;

pub use messaging_service::MessagingService;
pub use notification_service::NotificationService;
