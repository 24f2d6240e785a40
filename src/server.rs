//! HTTP surface: the prompt endpoint plus the two static site trees

use std::sync::Arc;
use axum::{
    extract::{rejection::JsonRejection, State},
    http::{Method, StatusCode},
    routing::post,
    Json, Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use log::{info, warn};

use crate::client::Relay;
use crate::config::{RelayConfig, ServerConfig};
use crate::error::Error;
use crate::request::{PromptRequest, RelayResponse};
use crate::Credential;

/// Build the application router.
///
/// `/chatbot` is nested ahead of the catch-all so the home site never
/// shadows it. Directory requests get their `index.html`.
pub fn router(relay: Arc<Relay>, config: &ServerConfig) -> Router
{   for dir in [&config.home_dir, &config.chatbot_dir]
    {   if !dir.is_dir()
        {   warn!("Static directory {} does not exist", dir.display());
        }
    }

    Router::new()
      .route(
        "/api/gemini",
        post(ask_gemini).fallback(wrong_method)
      )
      .nest_service("/chatbot", ServeDir::new(&config.chatbot_dir))
      .fallback_service(ServeDir::new(&config.home_dir))
      .layer(
        CorsLayer::new()
          .allow_origin(Any)
          .allow_methods(Any)
          .allow_headers(Any),
      )
      .with_state(relay)
}

async fn ask_gemini(
  State(relay): State<Arc<Relay>>
, payload: Result<Json<PromptRequest>, JsonRejection>
) -> (StatusCode, Json<RelayResponse>)
{   match payload
    {   Ok(Json(request)) => {
          (StatusCode::OK, Json(relay.ask(&request.prompt).await))
        }
      , Err(rejection) => {
          warn!("Rejected prompt request: {}", rejection.body_text());
          (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(
              RelayResponse::failure("invalid request body")
                .with_details(rejection.body_text())
            )
          )
        }
    }
}

async fn wrong_method(method: Method)
  -> (StatusCode, Json<RelayResponse>)
{   warn!("Rejected {} on prompt endpoint", method);
    (
      StatusCode::METHOD_NOT_ALLOWED,
      Json(
        RelayResponse::failure("method not allowed")
          .with_details(format!("{} is not supported, use POST", method))
      )
    )
}

/// Bind and run until Ctrl-C
pub async fn serve(
  config: RelayConfig
, credential: Option<Credential>
) -> Result<(), Error>
{   let relay = Arc::new(Relay::new(&config.gemini, credential));
    let app = router(relay, &config.server);

    let listener = tokio::net::TcpListener::bind(&config.server.bind_addr)
      .await?;
    info!("Relay listening on http://{}", listener.local_addr()?);

    axum::serve(listener, app)
      .with_graceful_shutdown(shutdown_signal())
      .await?;

    info!("Relay shut down");
    Ok(())
}

async fn shutdown_signal()
{   if let Err(e) = tokio::signal::ctrl_c().await
    {   warn!("Failed to listen for Ctrl-C: {}", e);
        std::future::pending::<()>().await;
    }
}
