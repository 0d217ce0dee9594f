use crate::entities::Entities;
use crate::routes::*;
use crate::AppError;
use axum::extract::{DefaultBodyLimit, FromRequest};
use axum::response::{IntoResponse, Response};
use axum::Router;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use tokio::net::TcpListener;
use tokio::sync::watch;
use tower_http::cors::CorsLayer;
use tower_http::services::{ServeDir, ServeFile};
use utoipa::{OpenApi, ToSchema};
use utoipa_axum::router::OpenApiRouter;
use utoipa_axum::routes;
use utoipa_swagger_ui::SwaggerUi;

/// JSON bodies larger than this are rejected with 413.
const BODY_LIMIT_BYTES: usize = 10 * 1024 * 1024;

// Create our own JSON extractor by wrapping `axum::Json`. This makes it easy to override the
// rejection and provide our own which formats errors to match our application.
#[derive(FromRequest, Deserialize)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct AppJson<T>(pub T);

impl<T> IntoResponse for AppJson<T>
where
    axum::Json<T>: IntoResponse,
{
    fn into_response(self) -> Response {
        axum::Json(self.0).into_response()
    }
}

/// Wire shape of every error response.
#[derive(Serialize, Deserialize, ToSchema)]
pub struct ErrorBody {
    pub error: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let error = match self {
            AppError::NotFound(_)        => "Not found".to_string(),
            AppError::JsonRejection(rej) => rej.body_text(),
            other                        => other.to_string(),
        };
        (status, AppJson(ErrorBody { error })).into_response()
    }
}

#[derive(Clone)]
pub struct RequestState {
    pub entities: Entities,
}

impl RequestState {
    pub fn new(entities: Entities) -> Self {
        Self { entities }
    }
}

#[derive(OpenApi)]
#[openapi(info(license(name = "MIT")))]
pub struct ApiDoc;

pub fn build_router(state: RequestState, cors: Option<CorsLayer>, static_dir: &Path) -> Router<()> {
    let (api, openapi) = OpenApiRouter::with_openapi(ApiDoc::openapi())
        .routes(routes!(health))
        .routes(routes!(list_records, create_record))
        .routes(routes!(bulk_upsert_records))
        .routes(routes!(update_record, delete_record))
        .split_for_parts();

    // Everything outside /api serves the built single-page app; unknown paths
    // fall back to index.html for client-side routing.
    let spa = ServeDir::new(static_dir).not_found_service(ServeFile::new(static_dir.join("index.html")));

    let merged = api
        .merge(SwaggerUi::new("/swagger-ui").url("/apidoc/openapi.json", openapi))
        .fallback_service(spa)
        .layer(DefaultBodyLimit::max(BODY_LIMIT_BYTES))
        .with_state(state);
    if let Some(cors_layer) = cors {
        merged.layer(cors_layer)
    } else {
        merged
    }
}

pub async fn serve(
    state: RequestState,
    socket_addr: SocketAddr,
    static_dir: PathBuf,
    cors: Option<CorsLayer>,
    shutdown: watch::Receiver<bool>,
) -> Result<(), AppError> {
    let router = build_router(state, cors, &static_dir);
    let tcp = TcpListener::bind(socket_addr).await?;

    let mut shutdown = shutdown.clone();
    axum::serve(tcp, router)
        .with_graceful_shutdown(async move {
            if shutdown.changed().await.is_ok() {
                crate::info!("Shutting down server...");
            }
        })
        .await?;
    Ok(())
}
