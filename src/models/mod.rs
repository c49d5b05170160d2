pub mod applicationmodel;
pub mod chatmodels;
pub mod contractmodel;
pub mod notificationmodel;
pub mod paymentmodel;
pub mod projectmodel;
pub mod usermodel;
