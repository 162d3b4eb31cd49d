pub mod auth;
pub mod book;
pub mod id;
pub mod loan;
pub mod reading_status;
pub mod role;
pub mod user;
