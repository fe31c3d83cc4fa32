//! Error taxonomy for the checkout pipeline.
//!
//! Component-local collaborator failures never reach this type: the price
//! resolver absorbs them into "no campaign" and the inventory gate into
//! "out of stock". Only pipeline-level failures cross the handler boundary.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CheckoutError {
    /// One or more items failed the inventory gate; no session was created.
    #[error("{0}")]
    OutOfStock(String),

    /// Resolution could not produce a usable price id. Signals a
    /// data-integrity problem upstream; the checkout is refused rather
    /// than guessing.
    #[error("{0}")]
    MissingPrice(String),

    /// Tenant configuration forbids gift-card purchase.
    #[error("Gift cards are not enabled for this store")]
    GiftCardsDisabled,

    /// The payment-session collaborator rejected the request; its message
    /// is passed through verbatim for display.
    #[error("{0}")]
    Upstream(String),

    #[error("{0}")]
    InvalidRequest(String),

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Unexpected failure: {0}")]
    Internal(String),
}

impl CheckoutError {
    /// Stable machine-readable code carried in every error response.
    pub fn code(&self) -> &'static str {
        match self {
            Self::OutOfStock(_) => "OUT_OF_STOCK",
            Self::MissingPrice(_) => "MISSING_PRICE",
            Self::GiftCardsDisabled => "GIFT_CARDS_DISABLED",
            Self::Upstream(_) => "UPSTREAM_ERROR",
            Self::InvalidRequest(_) => "INVALID_REQUEST",
            Self::Unauthorized => "UNAUTHORIZED",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::OutOfStock(_) | Self::Upstream(_) | Self::InvalidRequest(_) => {
                StatusCode::BAD_REQUEST
            }
            Self::MissingPrice(_) => StatusCode::NOT_FOUND,
            Self::GiftCardsDisabled => StatusCode::FORBIDDEN,
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for CheckoutError {
    fn into_response(self) -> Response {
        let body = json!({
            "success": false,
            "error": self.to_string(),
            "code": self.code(),
        });
        (self.status(), Json(body)).into_response()
    }
}
