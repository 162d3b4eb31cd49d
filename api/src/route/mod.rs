pub mod auth;
pub mod book;
pub mod health;
pub mod loan;
pub mod user;
pub mod v1;
