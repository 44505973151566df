use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::warn;

use crate::error::{ServiceError, TransportError};
use crate::models::Invoice;
use crate::service::InvoiceService;

#[derive(Debug, Deserialize)]
pub struct InvoiceQuery {
    #[serde(default, alias = "qrCodeParameter")]
    pub qr_code_parameter: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub detail: String,
}

pub struct ApiError(ServiceError);

impl From<ServiceError> for ApiError {
    fn from(e: ServiceError) -> Self {
        Self(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            ServiceError::Payload(_) => StatusCode::BAD_REQUEST,
            ServiceError::Transport(TransportError::Timeout { .. }) => StatusCode::REQUEST_TIMEOUT,
            ServiceError::Transport(_) => StatusCode::SERVICE_UNAVAILABLE,
        };
        warn!("Request failed with {}: {}", status, self.0);

        let body = ErrorResponse {
            detail: self.0.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

pub async fn health_check() -> &'static str {
    "OK"
}

/// `GET /?qr_code_parameter=<QR payload>`
pub async fn extract_invoice(
    State(service): State<Arc<InvoiceService>>,
    Query(query): Query<InvoiceQuery>,
) -> Result<Json<Invoice>, ApiError> {
    let raw = query.qr_code_parameter.unwrap_or_default();
    let invoice = service.process(&raw).await?;
    Ok(Json(invoice))
}
