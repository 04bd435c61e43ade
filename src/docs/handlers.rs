//! Documentation endpoints.

use axum::{extract::State, response::Html, Json};

use crate::docs::model::AggregatedDoc;
use crate::http::server::AppState;

const INDEX_HTML: &str = include_str!("../../assets/docs_index.html");

/// `GET {prefix}/docs/doc.json`
pub async fn doc_json(State(state): State<AppState>) -> Json<AggregatedDoc> {
    Json(
        state
            .docs
            .aggregate(&state.doc_sources, &state.public_prefix)
            .await,
    )
}

/// `GET {prefix}/docs/index.html`
pub async fn doc_index() -> Html<&'static str> {
    Html(INDEX_HTML)
}
