//! HTTP handlers.
//!
//! Each handler validates its input, makes its store calls and maps the
//! outcome to a JSON response. Store failures are logged here with full
//! detail and returned to the client as a generic `ApiError::Internal`.

pub mod dashboard;
pub mod webhook;

pub use dashboard::{recent_events, stats};
pub use webhook::{get_event, list_events, receive_webhook};

use tracing::error;

use crate::error::{ApiError, StoreError};

/// Log a store failure and replace it with a generic client-facing error.
fn internal(message: &'static str) -> impl FnOnce(StoreError) -> ApiError {
    move |e| {
        error!(error = %e, "{message}");
        ApiError::Internal(message)
    }
}
