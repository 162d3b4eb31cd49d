pub mod auth;
pub mod book;
pub mod health;
pub mod loan;
pub mod reading_status;
pub mod user;
