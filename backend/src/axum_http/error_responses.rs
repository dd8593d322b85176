use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use uuid::Uuid;

use crate::usecases::errors::UseCaseError;

#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conflicts: Option<Vec<Uuid>>,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            field: None,
            conflicts: None,
        }
    }
}

pub fn json_error(status: StatusCode, message: impl Into<String>) -> Response {
    (status, Json(ErrorResponse::new(message))).into_response()
}

impl From<&UseCaseError> for ErrorResponse {
    fn from(err: &UseCaseError) -> Self {
        match err {
            UseCaseError::InvalidArgument { field, .. } => ErrorResponse {
                field: Some(field.to_string()),
                ..ErrorResponse::new(err.to_string())
            },
            UseCaseError::Conflict {
                conflicting_block_ids,
            } => ErrorResponse {
                conflicts: Some(conflicting_block_ids.clone()),
                ..ErrorResponse::new(err.to_string())
            },
            // Don't leak internal error detail to client
            UseCaseError::Unavailable(_) => ErrorResponse::new("internal server error"),
            UseCaseError::NotFound { .. } | UseCaseError::SignatureInvalid { .. } => {
                ErrorResponse::new(err.to_string())
            }
        }
    }
}

impl IntoResponse for UseCaseError {
    fn into_response(self) -> Response {
        (self.status_code(), Json(ErrorResponse::from(&self))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn invalid_argument_names_the_field() {
        let response = UseCaseError::invalid("amount", "must be greater than 0").into_response();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            body_json(response).await,
            serde_json::json!({ "error": "amount must be greater than 0", "field": "amount" })
        );
    }

    #[tokio::test]
    async fn conflict_lists_blocking_ids() {
        let block_id = Uuid::new_v4();
        let response = UseCaseError::Conflict {
            conflicting_block_ids: vec![block_id],
        }
        .into_response();

        assert_eq!(response.status(), StatusCode::CONFLICT);
        assert_eq!(
            body_json(response).await["conflicts"],
            serde_json::json!([block_id])
        );
    }

    #[tokio::test]
    async fn unavailable_hides_internals() {
        let response =
            UseCaseError::Unavailable(anyhow::anyhow!("password authentication failed"))
                .into_response();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            body_json(response).await,
            serde_json::json!({ "error": "internal server error" })
        );
    }
}
