use axum::{
    middleware,
    response::{IntoResponse, Redirect},
    routing::{get, post, put},
    Extension, Json, Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

mod auth;
mod health;
pub mod middleware_auth;
mod pages;
pub mod session;
mod tasks;


pub use auth::register;
pub use health::health;

use crate::routes::auth::login;
use crate::state::AppState;
use crate::todos::Identity;

pub fn routes(state: AppState) -> Router {
    let task_router = Router::new()
        .route("/", post(tasks::routes::create).get(tasks::routes::list))
        .route(
            "/{id}",
            put(tasks::routes::update).delete(tasks::routes::delete),
        );

    let page_router = Router::new()
        .route("/todos", get(pages::show).post(pages::add))
        .route("/todos/{id}/toggle", post(pages::toggle))
        .route("/todos/{id}/delete", post(pages::delete))
        .route("/signin", get(auth::signin_page).post(auth::signin))
        .route("/signout", post(auth::signout))
        .layer(middleware::from_fn(session::attach_session));

    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .merge(page_router)
        .nest(
            "/api",
            Router::new()
                .route("/me", get(me_handler))
                .nest("/todos", task_router)
                .layer(middleware::from_fn_with_state(
                    state.clone(),
                    middleware_auth::require_auth,
                ))
                .layer(CorsLayer::permissive()),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn root() -> Redirect {
    Redirect::to("/todos")
}

async fn me_handler(Extension(identity): Extension<Identity>) -> impl IntoResponse {
    Json(identity)
}
