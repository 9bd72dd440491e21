//! Shared HTTP building blocks: response envelope, error mapping, extractors

mod api_error;
mod api_response;
pub mod cookies;
pub mod validated_json;

pub use api_error::{status_for, ApiError, InternalErrorDetail};
pub use api_response::{ApiResponse, EmptyData};
pub use validated_json::ValidatedJson;
