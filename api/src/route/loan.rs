use axum::{routing::get, Router};
use registry::AppRegistry;

use crate::handler::loan::{show_loan_list, show_overdue_list};

pub fn build_loan_routers() -> Router<AppRegistry> {
    let loan_routers = Router::new()
        .route("/", get(show_loan_list))
        .route("/overdue", get(show_overdue_list));

    Router::new().nest("/loans", loan_routers)
}
