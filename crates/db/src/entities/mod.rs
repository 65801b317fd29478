pub mod change_status;
pub mod ticket;
pub mod user;
