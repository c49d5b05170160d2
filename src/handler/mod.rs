pub mod applications;
pub mod auth;
pub mod chat;
pub mod contracts;
pub mod notifications;
pub mod payments;
pub mod projects;
pub mod users;
pub mod ws;
