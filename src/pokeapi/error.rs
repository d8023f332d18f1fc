//! Errors produced while fetching and shaping PokeAPI data.
//!
//! Every failure is scoped to a single query: the error is stored on the
//! cache entry and handed to each subscriber of that key, so it has to be
//! cheap to clone.

use thiserror::Error;

/// Which endpoint family a request belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
  List,
  Detail,
}

impl Operation {
  /// Message used when the server gives us nothing better.
  pub fn fallback_message(self) -> &'static str {
    match self {
      Operation::List => "Failed to fetch Pokemon",
      Operation::Detail => "Failed to fetch Pokemon details",
    }
  }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ApiError {
  /// No response was received (connect, DNS, timeout, broken body)
  #[error("{message}")]
  Transport { message: String },

  /// The server answered with a non-2xx status
  #[error("{message} (HTTP {status})")]
  Http { status: u16, message: String },

  /// The response body did not have the shape we need
  #[error("Unexpected response: {message}")]
  Shape { message: String },

  /// Request parameters were rejected before hitting the network
  #[error("Invalid request: {message}")]
  InvalidRequest { message: String },

  /// The cache was torn down while the query was still pending
  #[error("Query was cancelled")]
  Cancelled,
}

impl ApiError {
  pub fn transport(err: &reqwest::Error) -> Self {
    ApiError::Transport {
      message: err.to_string(),
    }
  }

  pub fn shape(message: impl Into<String>) -> Self {
    ApiError::Shape {
      message: message.into(),
    }
  }

  /// Build an HTTP error from a failed response body.
  ///
  /// Looks at `message` and then `data.message` in a JSON body, falling back
  /// to the per-operation message.
  pub fn from_response(status: u16, body: &[u8], operation: Operation) -> Self {
    let message = serde_json::from_slice::<serde_json::Value>(body)
      .ok()
      .and_then(|value| {
        value
          .get("message")
          .and_then(|m| m.as_str())
          .or_else(|| value.pointer("/data/message").and_then(|m| m.as_str()))
          .map(String::from)
      })
      .filter(|m| !m.trim().is_empty())
      .unwrap_or_else(|| operation.fallback_message().to_string());

    ApiError::Http { status, message }
  }

  #[cfg(test)]
  /// HTTP status code, if the server answered at all.
  pub fn status(&self) -> Option<u16> {
    match self {
      ApiError::Http { status, .. } => Some(*status),
      _ => None,
    }
  }

  /// The message a view should show for this error.
  pub fn user_message(&self) -> String {
    match self {
      ApiError::Http { message, .. } => message.clone(),
      other => other.to_string(),
    }
  }
}
