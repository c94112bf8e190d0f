use axum::{http::Method, Router};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub mod analytics;
pub mod auth;
pub mod bookings;
pub mod dayclose;
pub mod error;
pub mod settings;
pub mod state;

pub use state::AppState;

pub fn app(state: AppState) -> Router {
    // CORS Middleware
    let cors = CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::OPTIONS])
        .allow_headers([
            axum::http::header::AUTHORIZATION,
            axum::http::header::CONTENT_TYPE,
            axum::http::header::USER_AGENT,
        ]);

    let staff_routes = Router::new().merge(bookings::routes()).layer(
        axum::middleware::from_fn_with_state(state.clone(), auth::staff_auth_middleware),
    );

    let manager_routes = Router::new()
        .merge(dayclose::routes())
        .merge(analytics::routes())
        .merge(settings::routes())
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            auth::manager_auth_middleware,
        ));

    Router::new()
        .merge(staff_routes)
        .merge(manager_routes)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
