pub mod mail;
pub mod password;
pub mod reset;
pub mod summary;
pub mod trips;
pub mod users;
