pub mod applicationdtos;
pub mod chatdtos;
pub mod common;
pub mod contractdtos;
pub mod paymentdtos;
pub mod projectdtos;
pub mod userdtos;
