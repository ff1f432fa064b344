//! Page responses: a template name plus its context, handed to the renderer

use axum::{
    http::{header::LOCATION, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::Value;

use crate::access::Identity;

/// Template reference with the context it is rendered with
#[derive(Debug, Serialize)]
pub struct Page {
    pub template: &'static str,
    pub context: Value,
}

impl Page {
    pub fn new(template: &'static str, context: Value) -> Self {
        Self { template, context }
    }

    /// Add the signed-in username (or null) to the context
    pub fn with_user(mut self, identity: &Identity) -> Self {
        if let Value::Object(ref mut map) = self.context {
            map.insert(
                "user".to_string(),
                identity
                    .user()
                    .map(|u| Value::String(u.username.clone()))
                    .unwrap_or(Value::Null),
            );
        }
        self
    }
}

impl IntoResponse for Page {
    fn into_response(self) -> Response {
        Json(self).into_response()
    }
}

/// `302 Found` to a location
pub fn found(location: &str) -> Response {
    (StatusCode::FOUND, [(LOCATION, location.to_string())]).into_response()
}

/// Only local absolute paths are followed after login
pub fn is_safe_redirect(next: &str) -> bool {
    next.starts_with('/')
        && !next.starts_with("//")
        && !next.contains('\\')
        && !next.chars().any(char::is_control)
}
