//! Static assets

use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};

const ANNOTATE_JS: &str = include_str!("../../ui/annotate.js");

/// GET /static/annotate.js
///
/// Serves the selection widget script
pub async fn serve_annotate_js() -> Response {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "application/javascript")],
        ANNOTATE_JS,
    )
        .into_response()
}
