// Define data modules
mod logic; // Status derivation and reminder selection
mod models; // Data structures (Task, Batch, Template, AppState)
mod routes_batches; // HTTP handlers for batch & schedule APIs
mod routes_templates; // HTTP handlers for template APIs
mod state; // State controller: every aggregate mutation
mod store; // Persistent storage (load/save state.json)
mod time; // Day-number and time-of-day helpers

// Import axum routing utilities and Router
use axum::{
    routing::{delete, get, post, put},
    Router,
};
use std::net::SocketAddr;
use tower_http::services::ServeDir; // Used to serve static files (HTML/CSS/JS)
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    // Initialize tracing (respects RUST_LOG env var)
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let api = Router::new()
        // full aggregate
        .route("/state", get(routes_batches::get_app_state))
        // batches
        .route(
            "/batches",
            get(routes_batches::get_batches).post(routes_batches::create_batch),
        )
        .route(
            "/batches/:id",
            put(routes_batches::update_batch).delete(routes_batches::delete_batch),
        )
        .route("/batches/:id/reset", post(routes_batches::reset_batch))
        .route("/batches/:id/finalize", post(routes_batches::finalize_batch))
        .route("/batches/:id/reminders", get(routes_batches::get_reminders))
        .route("/batches/:id/days/:day", get(routes_batches::get_batch_day))
        .route(
            "/batches/:id/days/:day/tasks",
            post(routes_batches::create_batch_task),
        )
        .route(
            "/batches/:id/days/:day/tasks/:task_id",
            put(routes_batches::update_batch_task).delete(routes_batches::delete_batch_task),
        )
        .route(
            "/batches/:id/days/:day/tasks/:task_id/sent",
            post(routes_batches::mark_task_sent),
        )
        // media
        .route("/media/download", post(routes_batches::download_media))
        // templates
        .route(
            "/templates",
            get(routes_templates::get_templates).post(routes_templates::create_template),
        )
        .route("/templates/:id", delete(routes_templates::delete_template))
        .route(
            "/templates/:id/days/:day",
            get(routes_templates::get_template_day),
        )
        .route(
            "/templates/:id/days/:day/tasks",
            post(routes_templates::create_template_task),
        )
        .route(
            "/templates/:id/days/:day/tasks/:task_id",
            put(routes_templates::update_template_task)
                .delete(routes_templates::delete_template_task),
        );

    let app = Router::new()
        .nest("/api", api)
        .nest_service("/", ServeDir::new("static"));

    let addr: SocketAddr = "127.0.0.1:3000".parse().unwrap();

    info!("Server running at http://{}", addr);
    info!("Static files: http://{}/", addr);
    info!("API base:     http://{}/api", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("bind failed");

    axum::serve(listener, app).await.expect("server error");
}
