//! Documentation of a server-rendered recipe catalog.
//!
//!
//!
//! # General Infrastructure
//! - One axum process renders every page, no frontend build step
//! - Templates are embedded into the binary, see `templates/`
//! - Recipes and the category registry live in Redis, see [`database`]
//! - `DATABASE_URL=memory://` swaps Redis for an in-process store, handy for demos
//!
//!
//!
//! # Flow
//! - `/`: sign in with any display name, no password
//! - `/search`: pick optional cuisine, author, ingredient and allergen filters
//! - `/results`: matching recipes, most viewed first, 5 per page
//! - `/recipe/{id}`: one recipe, every visit counts a view
//! - `/add_recipe`, `/edit_recipe/{id}`: authoring forms
//! - `/insert_recipe`, `/update_recipe/{id}`, `/delete_recipe/{id}`: mutations, each
//!   redirecting with a one-time confirmation message
//! - `/logout`: forget the display name
//!
//! Every page except sign-in and logout redirects to `/` without a session.
//!
//!
//!
//! # Notes
//!
//! ## Search state
//! Filters are built per request and never stored server side. Pagination links repeat the
//! filter fields in the query string, so two users searching at once cannot see each
//! other's filters.
//!
//! ## Ownership
//! Any signed-in name may edit or delete any recipe. The display name is not tied to
//! authored recipes.
//!
//!
//!
//! # Setup
//!
//! Environment, all optional:
//! ```sh
//! IP=0.0.0.0
//! PORT=5000
//! SECRET=change-me
//! DATABASE_URL=redis://127.0.0.1:6379
//! DATABASE_NAME=cookbook
//! RUST_LOG=info
//! ```
//!
//! Run against a throwaway Redis.
//! ```sh
//! docker run --rm -p 6379:6379 redis
//! cargo run -p cookbook
//! ```
//!
//! Run without Redis.
//! ```sh
//! DATABASE_URL=memory:// cargo run -p cookbook
//! ```
use std::sync::Arc;

use anyhow::Result;
use axum::{
    Router,
    routing::{get, post},
};

#[cfg(unix)]
use tokio::signal::unix::{SignalKind, signal};
use tokio::{net::TcpListener, signal::ctrl_c};
use tower_http::trace::TraceLayer;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, fmt};

pub mod config;
pub mod database;
pub mod error;
pub mod forms;
pub mod models;
pub mod recipes;
pub mod routes;
pub mod search;
pub mod session;
pub mod state;
pub mod store;
pub mod templates;

use config::Config;
use routes::{
    add_recipe_handler, delete_recipe_handler, edit_recipe_handler, index_handler,
    insert_recipe_handler, logout_handler, recipe_handler, results_form_handler, results_handler,
    search_handler, sign_in_handler, update_recipe_handler,
};
use state::State;

pub fn app(state: Arc<State>) -> Router {
    Router::new()
        .route("/", get(index_handler).post(sign_in_handler))
        .route("/search", get(search_handler))
        .route("/results", get(results_handler).post(results_form_handler))
        .route("/add_recipe", get(add_recipe_handler))
        .route("/insert_recipe", post(insert_recipe_handler))
        .route("/recipe/{id}", get(recipe_handler).post(recipe_handler))
        .route(
            "/edit_recipe/{id}",
            get(edit_recipe_handler).post(edit_recipe_handler),
        )
        .route("/update_recipe/{id}", post(update_recipe_handler))
        .route("/delete_recipe/{id}", get(delete_recipe_handler))
        .route("/logout", get(logout_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn start_server() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();

    info!("Loading config...");
    let config = Config::load()?;

    info!("Initializing state...");
    let state = State::new(config).await?;

    info!("Starting server...");
    let address = state.config.address();
    let app = app(state.clone());

    info!("Binding to {address}");
    let listener = TcpListener::bind(&address).await?;
    info!("Server running on {address}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shut down");

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        match ctrl_c().await {
            Ok(()) => info!("Received Ctrl+C, shutting down"),
            Err(e) => {
                error!("Failed to install Ctrl+C handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal(SignalKind::terminate()) {
            Ok(mut terminate) => {
                terminate.recv().await;
                info!("Received terminate signal, shutting down");
            }
            Err(e) => {
                error!("Failed to install signal handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
