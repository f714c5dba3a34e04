use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use axum_macros::debug_handler;
use utoipa::OpenApi;

use std::sync::Arc;

use crate::{
    dto::{DeliveryStatus, SendEbookRequest, SendEbookResponse},
    service::{DeliveryError, DeliveryService},
};

#[derive(OpenApi)]
#[openapi(
    paths(send_ebook),
    components(schemas(SendEbookRequest, SendEbookResponse, DeliveryStatus)),
    tags(
        (name = "ebook", description = "Ebook delivery API")
    )
)]
pub struct ApiDoc;

impl IntoResponse for DeliveryError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            Self::Configuration => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Server email configuration missing.".to_string(),
            ),
            Self::Validation(reason) => (StatusCode::BAD_REQUEST, reason.to_string()),
            Self::AttachmentMissing { filename } => (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Ebook file '{filename}' not found on server."),
            ),
            Self::Attachment(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Error processing ebook file.".to_string(),
            ),
            Self::MailAuth(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Email server authentication failed. Check server configuration.".to_string(),
            ),
            Self::MailConnect(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Could not connect to email server.".to_string(),
            ),
            Self::MailUnknown(detail) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Failed to send email: {detail}"),
            ),
        };

        (status, Json(SendEbookResponse::error(message))).into_response()
    }
}

#[utoipa::path(
    post,
    path = "/send-ebook",
    request_body = SendEbookRequest,
    responses(
        (status = 200, description = "Ebook handed to the mail server", body = SendEbookResponse),
        (status = 400, description = "Missing or empty email", body = SendEbookResponse),
        (status = 500, description = "Configuration, attachment or mail server failure", body = SendEbookResponse)
    ),
    tag = "ebook"
)]
#[debug_handler]
pub async fn send_ebook(
    State(service): State<Arc<DeliveryService>>,
    payload: Result<Json<SendEbookRequest>, JsonRejection>,
) -> Response {
    let request = match payload {
        Ok(Json(request)) => Some(request),
        Err(rejection) => {
            tracing::debug!("unreadable send-ebook payload: {}", rejection);
            None
        }
    };

    match service.send_ebook(request).await {
        Ok(r) => (StatusCode::OK, Json(r)).into_response(),
        Err(e) => {
            if let DeliveryError::Validation(_) = e {
                tracing::warn!("Rejected ebook request: {e}");
            } else {
                tracing::error!("Failed to send ebook: {e}");
            }
            e.into_response()
        }
    }
}

#[debug_handler]
pub async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

#[debug_handler]
pub async fn health_check() -> Response {
    (StatusCode::OK, "Hello from ebook service!").into_response()
}
