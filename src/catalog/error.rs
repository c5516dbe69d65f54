use thiserror::Error;

/// Failure talking to the remote product service.
///
/// Non-success statuses, transport failures and unreadable bodies all surface
/// as this one kind. The remote error body is never parsed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Failed to {operation}: {message}")]
pub struct ServiceError {
  operation: &'static str,
  message: String,
}

impl ServiceError {
  pub fn new(operation: &'static str, message: impl Into<String>) -> Self {
    Self {
      operation,
      message: message.into(),
    }
  }

  /// Error for a response with a non-2xx status
  pub fn status(operation: &'static str, status: reqwest::StatusCode) -> Self {
    Self::new(operation, format!("server responded with {}", status))
  }

  /// The operation that failed (e.g. "fetch products")
  pub fn operation(&self) -> &'static str {
    self.operation
  }

  pub fn message(&self) -> &str {
    &self.message
  }
}
