pub mod auth;

pub use auth::{request_token, session_auth_middleware};
