pub mod error;
pub mod handlers;
pub mod state;

use anyhow::{Context, Result};
use axum::Router;
use axum::routing::{get, post};
use tower_http::cors::{Any, CorsLayer};

use crate::config::Config;
use crate::engine::{Engine, scheduler};
use state::AppState;

/// Admin/operator HTTP surface over the engine (§6 Admin/CLI surface).
/// Deliberately not a public signup/auth API (§1) — every route here is the
/// same call an operator's `clap` subcommand makes, just reachable over
/// HTTP for dashboard/automation use.
pub async fn serve(host: &str, port: u16, db: crate::store::Db, config: Config) -> Result<()> {
    let engine = Engine::new(db, config);
    let state = AppState::new(engine);

    let scheduler_state = state.clone();
    tokio::spawn(async move {
        loop {
            let now_utc = chrono::Utc::now();
            {
                let inner = scheduler_state.inner.read().await;
                match scheduler::tick(&inner.db, &inner.bus, &inner.config, now_utc).await {
                    Ok(Some(result)) => {
                        tracing::info!(
                            session_index = result.session_index,
                            new_pairs = result.new_pairs,
                            "scheduler tick ran a session"
                        );
                    }
                    Ok(None) => {}
                    Err(e) => tracing::warn!(error = %e, "scheduler tick failed"),
                }
            }
            tokio::time::sleep(scheduler::duration_until_next_minute(now_utc)).await;
        }
    });

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/api/activate", post(handlers::activation::activate))
        .route("/api/place-user", post(handlers::users::place_user))
        .route("/api/users/{id}/wallet", get(handlers::users::wallet_balance))
        .route("/api/epins/generate", post(handlers::epins::generate))
        .route("/api/epins/{code}/transfer", post(handlers::epins::transfer))
        .route("/api/epins/{code}/reserve", post(handlers::epins::reserve))
        .route("/api/session/trigger/{index}", post(handlers::sessions::trigger))
        .route("/api/funds/monthly", post(handlers::funds::distribute_monthly))
        .route("/api/funds/travel", post(handlers::funds::allocate_travel))
        .route("/api/franchise/sell", post(handlers::franchise::sell))
        .route("/api/admin/credit", post(handlers::admin::credit))
        .route(
            "/api/admin/approve-withdraw/{hold_tx_id}",
            post(handlers::admin::approve_withdraw),
        )
        .route(
            "/api/admin/recalculate-ranks/{user_id}",
            post(handlers::admin::recalculate_ranks),
        )
        .layer(cors)
        .with_state(state);

    let addr = format!("{host}:{port}");
    println!("compensation engine admin API listening on {addr}");
    println!("  Health:   GET  http://{addr}/health");
    println!("  Activate: POST http://{addr}/api/activate");
    println!("  Session:  POST http://{addr}/api/session/trigger/{{index}}");

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("binding to {addr}"))?;

    axum::serve(listener, app).await.context("running server")?;

    Ok(())
}
