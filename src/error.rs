//! Error type shared by the content services and the HTTP layer.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use thiserror::Error;
use tracing::{error, warn};

use crate::forms::{FieldErrors, FormState};

#[derive(Error, Debug)]
pub enum CmsError {
    #[error("Validation failed. Please check the errors.")]
    Validation(FieldErrors),

    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: String },

    #[error("Navigation item {id} cannot be moved under {parent_id}: it would become its own ancestor")]
    CyclicParent { id: String, parent_id: String },

    #[error("{0} ID is required")]
    MissingId(&'static str),

    #[error("Database error: {0}")]
    Store(#[from] anyhow::Error),
}

impl CmsError {
    pub fn not_found(entity: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity,
            id: id.into(),
        }
    }

    /// Single-field validation failure.
    pub fn field(field: &str, message: impl Into<String>) -> Self {
        let mut errors = FieldErrors::new();
        errors.insert(field.to_string(), vec![message.into()]);
        Self::Validation(errors)
    }

    pub fn status(&self) -> StatusCode {
        match self {
            CmsError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            CmsError::NotFound { .. } => StatusCode::NOT_FOUND,
            CmsError::CyclicParent { .. } => StatusCode::CONFLICT,
            CmsError::MissingId(_) => StatusCode::BAD_REQUEST,
            CmsError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for CmsError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = self.to_string();

        let field_errors = match self {
            CmsError::Validation(errors) => {
                warn!("Rejected form submission: {:?}", errors);
                errors
            }
            CmsError::CyclicParent { .. } => {
                warn!("{}", message);
                let mut errors = FieldErrors::new();
                errors.insert("parent_id".to_string(), vec![message.clone()]);
                errors
            }
            CmsError::Store(e) => {
                error!("Store failure: {:#}", e);
                let mut errors = FieldErrors::new();
                errors.insert(
                    "general".to_string(),
                    vec!["An unexpected database error occurred.".to_string()],
                );
                errors
            }
            CmsError::NotFound { .. } | CmsError::MissingId(_) => FieldErrors::new(),
        };

        (status, Json(FormState::<()>::failure(message, field_errors))).into_response()
    }
}
