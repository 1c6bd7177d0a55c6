//! Server-rendered HTML pages over the same services as the JSON API.
//!
//! Sessions ride on the `api_token` cookie set at login. Feedback after a
//! redirect travels in the `notice` query parameter.

pub mod forms;
pub mod handlers;
pub mod routes;
pub mod templates;

pub use handlers::WebState;
