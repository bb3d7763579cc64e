use axum::{
    error_handling::HandleErrorLayer,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post, put},
    BoxError, Router,
};
use std::time::Duration;
use tower::{buffer::BufferLayer, limit::RateLimitLayer, ServiceBuilder};
use tower_http::{compression::CompressionLayer, services::ServeDir, trace::TraceLayer};

use crate::{api, AppState};

pub fn generate_routes(state: AppState) -> Router {
    let media = ServeDir::new(&state.config.media_root);
    let rate_limit = state.config.rate_limit.max(1);

    Router::new()
        // ==== AUTH ==== //
        .route("/api/auth/token/login/", post(api::auth::login))
        .route("/api/auth/token/logout/", post(api::auth::logout))
        // ==== USERS ==== //
        .route(
            "/api/users/",
            get(api::users::list_users).post(api::auth::registration),
        )
        .route("/api/users/me/", get(api::users::me))
        .route(
            "/api/users/me/avatar/",
            put(api::users::update_avatar).delete(api::users::delete_avatar),
        )
        .route("/api/users/set_password/", post(api::users::set_password))
        .route("/api/users/subscriptions/", get(api::users::subscriptions))
        .route("/api/users/:id/", get(api::users::get_user))
        .route(
            "/api/users/:id/subscribe/",
            post(api::users::subscribe).delete(api::users::unsubscribe),
        )
        // ==== INGREDIENTS ==== //
        .route("/api/ingredients/", get(api::ingredients::list_ingredients))
        .route("/api/ingredients/:id/", get(api::ingredients::get_ingredient))
        // ==== RECIPES ==== //
        .route(
            "/api/recipes/",
            get(api::recipes::list_recipes).post(api::recipes::create_recipe),
        )
        .route(
            "/api/recipes/download_shopping_cart/",
            get(api::recipes::download_shopping_cart),
        )
        .route(
            "/api/recipes/:id/",
            get(api::recipes::get_recipe)
                .patch(api::recipes::update_recipe)
                .delete(api::recipes::delete_recipe),
        )
        .route("/api/recipes/:id/get-link/", get(api::recipes::get_link))
        .route(
            "/api/recipes/:id/favorite/",
            post(api::recipes::favorite_recipe).delete(api::recipes::unfavorite_recipe),
        )
        .route(
            "/api/recipes/:id/shopping_cart/",
            post(api::recipes::add_to_shopping_cart)
                .delete(api::recipes::remove_from_shopping_cart),
        )
        // ==== SHORT LINKS / MEDIA ==== //
        .route("/s/:id/", get(api::links::short_link))
        .nest_service("/media", media)
        .fallback(handler_404)
        .with_state(state)
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(
            ServiceBuilder::new()
                .layer(HandleErrorLayer::new(|err: BoxError| async move {
                    (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        format!("Unhandled error: {}", err),
                    )
                }))
                .layer(BufferLayer::new(1024))
                .layer(RateLimitLayer::new(rate_limit, Duration::from_secs(1))),
        )
}

async fn handler_404() -> impl IntoResponse {
    (StatusCode::NOT_FOUND, "nothing to see here")
}
