use std::{net::SocketAddr, sync::Arc};

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::Deserialize;
use serde_json::{Value, json};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};

use crate::{
    codec::ImageReference,
    orchestrator::{PipelineRouter, process_image},
    providers::GenerativeClient,
};

#[derive(Debug, Deserialize)]
pub struct ProcessRequest {
    /// `data:` URI of the canvas export. Local `file://` references are refused.
    pub image: String,
    #[serde(default)]
    pub mime_type: Option<String>,
}

pub fn app<C: GenerativeClient + 'static>(router: Arc<PipelineRouter<C>>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/process", post(process::<C>))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(router)
}

pub async fn run_server<C: GenerativeClient + 'static>(
    bind_addr: SocketAddr,
    router: Arc<PipelineRouter<C>>,
) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(bind_addr).await?;
    info!(target: "server", %bind_addr, "HTTP 服务已启动");

    axum::serve(listener, app(router))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!(target: "server", "收到退出信号, 准备关闭");
    }
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

async fn process<C: GenerativeClient + 'static>(
    State(router): State<Arc<PipelineRouter<C>>>,
    Json(request): Json<ProcessRequest>,
) -> Response {
    let image = match ImageReference::parse(&request.image, request.mime_type.as_deref()) {
        Ok(image) if image.is_local() => {
            warn!(target: "server", uri = %image.uri(), "拒绝读取服务端本地文件");
            return bad_request("只接受 data: 形式的图片");
        }
        Ok(image) => image,
        Err(err) => {
            warn!(target: "server", error = %err, "无法解析提交的图片");
            return bad_request(&err.to_string());
        }
    };

    match process_image(&*router, &image).await {
        Ok(outcome) => {
            info!(target: "server", event = outcome.event_name(), "提交处理完成");
            Json(outcome).into_response()
        }
        Err(err) => (
            StatusCode::BAD_GATEWAY,
            Json(json!({
                "error": err.to_string(),
                "stage": err.stage,
                "kind": err.cause().kind(),
                "cause": err.cause().to_string(),
            })),
        )
            .into_response(),
    }
}

fn bad_request(message: &str) -> Response {
    (StatusCode::BAD_REQUEST, Json(json!({ "error": message }))).into_response()
}
