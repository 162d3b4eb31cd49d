use axum::{routing::get, Router};
use registry::AppRegistry;

use crate::handler::{loan::show_my_loans, reading_status::show_my_reading_statuses};

pub fn build_user_routers() -> Router<AppRegistry> {
    let user_routers = Router::new()
        .route("/me/loans", get(show_my_loans))
        .route("/me/reading-statuses", get(show_my_reading_statuses));

    Router::new().nest("/users", user_routers)
}
