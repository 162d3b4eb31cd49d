pub mod auth;
pub mod book;
pub mod loan;
pub mod reading_status;
pub mod user;
