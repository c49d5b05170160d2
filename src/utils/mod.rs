pub mod money;
pub mod password;
pub mod reference;
pub mod token;
