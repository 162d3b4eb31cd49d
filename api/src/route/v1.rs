use axum::Router;
use registry::AppRegistry;

use super::{
    auth::build_auth_routers, book::build_book_routers, health::build_health_check_routers,
    loan::build_loan_routers, user::build_user_routers,
};

pub fn routes() -> Router<AppRegistry> {
    let router = Router::new()
        .merge(build_health_check_routers())
        .merge(build_auth_routers())
        .merge(build_book_routers())
        .merge(build_loan_routers())
        .merge(build_user_routers());
    Router::new().nest("/api/v1", router)
}
