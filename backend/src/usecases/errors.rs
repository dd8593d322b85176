use axum::http::StatusCode;
use thiserror::Error;
use tourops_core::domain::value_objects::validation::FieldViolation;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum UseCaseError {
    #[error("{field} {message}")]
    InvalidArgument {
        field: &'static str,
        message: String,
    },
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: String },
    #[error("vehicle is already blocked for the requested dates")]
    Conflict { conflicting_block_ids: Vec<Uuid> },
    #[error("invalid signature for order {order_id}")]
    SignatureInvalid { order_id: String },
    #[error(transparent)]
    Unavailable(#[from] anyhow::Error),
}

impl UseCaseError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            UseCaseError::InvalidArgument { .. } | UseCaseError::SignatureInvalid { .. } => {
                StatusCode::BAD_REQUEST
            }
            UseCaseError::NotFound { .. } => StatusCode::NOT_FOUND,
            UseCaseError::Conflict { .. } => StatusCode::CONFLICT,
            UseCaseError::Unavailable(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn invalid(field: &'static str, message: impl Into<String>) -> Self {
        UseCaseError::InvalidArgument {
            field,
            message: message.into(),
        }
    }

    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        UseCaseError::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    /// Lifts a `FieldViolation` carried inside a repository error back into `InvalidArgument`.
    pub fn from_repository(err: anyhow::Error) -> Self {
        match err.downcast_ref::<FieldViolation>() {
            Some(violation) => violation.clone().into(),
            None => UseCaseError::Unavailable(err),
        }
    }
}

impl From<FieldViolation> for UseCaseError {
    fn from(value: FieldViolation) -> Self {
        UseCaseError::InvalidArgument {
            field: value.field,
            message: value.message,
        }
    }
}

pub type UseCaseResult<T> = std::result::Result<T, UseCaseError>;
