#![allow(clippy::useless_conversion)]

pub mod change_status;
pub mod ids;
pub mod page;
pub mod ticket;
pub mod user;
