pub mod applicationdb;
pub mod chatdb;
pub mod contractdb;
pub mod db;
pub mod notificationdb;
pub mod paymentdb;
pub mod projectdb;
pub mod userdb;
