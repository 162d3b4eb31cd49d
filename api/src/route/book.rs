use axum::{
    routing::{delete, get, post, put},
    Router,
};
use registry::AppRegistry;

use crate::handler::{
    book::{delete_book, register_book, show_book, show_book_list, update_book},
    loan::{borrow_book, loan_history, return_book},
    reading_status::{delete_reading_status, show_reading_status, update_reading_status},
};

pub fn build_book_routers() -> Router<AppRegistry> {
    let book_routers = Router::new()
        .route("/", post(register_book))
        .route("/", get(show_book_list))
        .route("/:book_id", get(show_book))
        .route("/:book_id", put(update_book))
        .route("/:book_id", delete(delete_book));

    let loan_routers = Router::new()
        .route("/:book_id/loans", post(borrow_book))
        .route("/:book_id/loans", get(loan_history))
        .route("/:book_id/loans/:loan_id/return", put(return_book));

    let reading_status_routers = Router::new()
        .route("/:book_id/reading-status", get(show_reading_status))
        .route("/:book_id/reading-status", put(update_reading_status))
        .route("/:book_id/reading-status", delete(delete_reading_status));

    Router::new().nest(
        "/books",
        book_routers.merge(loan_routers).merge(reading_status_routers),
    )
}
