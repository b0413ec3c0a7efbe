//! HTTP error mapping.
//!
//! Every error body is `{ "error": string, "details"?: object }`.

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::{json, Value as JsonValue};
use tracing::{error, warn};

use printshop_core::Error;

#[derive(Debug)]
pub enum ApiError {
    BadRequest {
        message: String,
        details: Option<JsonValue>,
    },
    NotFound(String),
    Internal(String),
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        ApiError::BadRequest {
            message: message.into(),
            details: None,
        }
    }

    /// The 404 body for an unknown or inactive slug.
    pub fn product_not_found() -> Self {
        ApiError::NotFound("Product not found".to_string())
    }
}

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        match err {
            Error::Validation { field, message } => ApiError::BadRequest {
                message: format!("{}: {}", field, message),
                details: Some(json!({ "field": field })),
            },
            Error::Config(msg) => {
                // Preset data defect: 400 to the caller, WARN for the operator.
                warn!(
                    subsystem = "api",
                    component = "error",
                    error = %msg,
                    "Pricing configuration error"
                );
                ApiError::BadRequest {
                    message: msg,
                    details: Some(json!({ "kind": "config" })),
                }
            }
            Error::InvalidConfig(report) => ApiError::BadRequest {
                message: "Invalid pricing config".to_string(),
                details: serde_json::to_value(&report).ok(),
            },
            Error::NotFound(msg) => ApiError::NotFound(msg),
            other => {
                error!(subsystem = "api", component = "error", error = %other, "Request failed");
                ApiError::Internal(other.to_string())
            }
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::bad_request(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::bad_request(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            ApiError::BadRequest { message, details } => {
                let mut body = json!({ "error": message });
                if let Some(details) = details {
                    body["details"] = details;
                }
                (StatusCode::BAD_REQUEST, body)
            }
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, json!({ "error": msg })),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, json!({ "error": msg })),
        };

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use printshop_core::pricing::validate;

    #[test]
    fn test_validation_maps_to_bad_request() {
        let api: ApiError = Error::validation("quantity", "must be greater than 0").into();
        match api {
            ApiError::BadRequest { message, details } => {
                assert_eq!(message, "quantity: must be greater than 0");
                assert_eq!(details.unwrap()["field"], "quantity");
            }
            other => panic!("Expected BadRequest, got {:?}", other),
        }
    }

    #[test]
    fn test_invalid_config_carries_every_error() {
        let report = validate("QTY_TIERED", &json!({ "tiers": [], "fileFee": -1 }));
        let api: ApiError = Error::InvalidConfig(report).into();
        match api {
            ApiError::BadRequest { details, .. } => {
                let details = details.unwrap();
                assert_eq!(details["valid"], false);
                assert!(details["errors"].as_array().unwrap().len() >= 2);
            }
            other => panic!("Expected BadRequest, got {:?}", other),
        }
    }

    #[test]
    fn test_not_found_and_internal_status() {
        let resp = ApiError::product_not_found().into_response();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);

        let resp = ApiError::from(Error::Internal("boom".to_string())).into_response();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
