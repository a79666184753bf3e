pub mod marketmodel;
pub mod notificationmodel;
