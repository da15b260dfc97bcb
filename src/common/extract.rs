// JSON body extractor whose rejections use the API error envelope

use axum::extract::{rejection::JsonRejection, FromRequest};

use super::error::ApiError;

/// Drop-in for `axum::Json` on request bodies
///
/// Malformed JSON, wrongly typed fields and a missing `Content-Type` all
/// become `ApiError::Validation` on the `body` field.
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct ApiJson<T>(pub T);

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        let message = match &rejection {
            JsonRejection::MissingJsonContentType(_) => {
                "Expected Content-Type: application/json".to_string()
            }
            JsonRejection::JsonSyntaxError(_) => "Request body is not valid JSON".to_string(),
            JsonRejection::JsonDataError(e) => e.body_text(),
            other => other.body_text(),
        };
        ApiError::invalid_field("body", &message)
    }
}
