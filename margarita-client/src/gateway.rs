use async_trait::async_trait;
use margarita_core::{Booking, BookingError, CapabilitySet, ErrorKind, Field, ObjectId, ValidBooking};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Successful login, registration or renewal.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AuthPayload {
    pub uid: ObjectId,
    pub name: String,
    pub email: String,
    pub token: String,
    #[serde(default)]
    pub capabilities: CapabilitySet,
}

/// A failed remote call: the classified error plus what the server said, if it answered.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{error}")]
pub struct GatewayError {
    pub error: BookingError,
    /// `None` when the request never got an HTTP answer.
    pub status: Option<u16>,
    pub server_message: Option<String>,
}

impl GatewayError {
    fn offline(operation: &str, err: reqwest::Error) -> Self {
        Self {
            error: BookingError::network(operation, err),
            status: None,
            server_message: None,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        self.error.kind()
    }

    /// The server explicitly rejected the token.
    pub fn is_unauthorized(&self) -> bool {
        self.status == Some(StatusCode::UNAUTHORIZED.as_u16())
    }

    /// Text for the user. Server wording is kept for rejections but never for failures.
    pub fn user_message(&self) -> &str {
        match self.error.kind() {
            ErrorKind::Storage | ErrorKind::Network => self.error.user_message(),
            _ => self
                .server_message
                .as_deref()
                .unwrap_or_else(|| self.error.user_message()),
        }
    }
}

impl From<BookingError> for GatewayError {
    fn from(error: BookingError) -> Self {
        Self {
            error,
            status: None,
            server_message: None,
        }
    }
}

#[async_trait]
pub trait BookingGateway: Send + Sync {
    async fn login(&self, email: &str, password: &str) -> Result<AuthPayload, GatewayError>;

    async fn register(&self, name: &str, email: &str, password: &str) -> Result<AuthPayload, GatewayError>;

    async fn renew(&self, token: &str) -> Result<AuthPayload, GatewayError>;

    async fn list(&self, token: &str) -> Result<Vec<Booking>, GatewayError>;

    async fn create(&self, token: &str, candidate: &ValidBooking) -> Result<Booking, GatewayError>;

    async fn update(&self, token: &str, id: &ObjectId, candidate: &ValidBooking) -> Result<Booking, GatewayError>;

    async fn delete(&self, token: &str, id: &ObjectId) -> Result<(), GatewayError>;
}

#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    msg: Option<String>,
    error: Option<String>,
    field: Option<String>,
}

#[derive(Deserialize)]
struct EventList {
    eventos: Vec<Booking>,
}

#[derive(Deserialize)]
struct EventBody {
    evento: Booking,
}

#[derive(Deserialize)]
struct Ack {}

#[derive(Serialize)]
struct Credentials<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<&'a str>,
    email: &'a str,
    password: &'a str,
}

/// What a request was about, for error classification.
struct Call<'a> {
    operation: &'static str,
    target: &'a str,
    /// Login and registration answer 400 for bad credentials.
    credentials: bool,
}

fn classify(status: StatusCode, body: ErrorBody, call: &Call<'_>) -> GatewayError {
    let detail = body.error.unwrap_or_else(|| format!("HTTP {status}"));
    let error = match status {
        StatusCode::UNAUTHORIZED => BookingError::authentication(detail),
        StatusCode::FORBIDDEN => BookingError::authorization(detail),
        StatusCode::NOT_FOUND => BookingError::not_found(call.target),
        StatusCode::BAD_REQUEST if call.credentials => BookingError::authentication(detail),
        // Rejections the server cannot pin on a field concern the body as a whole.
        StatusCode::BAD_REQUEST => {
            let field = body.field.as_deref().and_then(Field::from_code).unwrap_or(Field::Body);
            BookingError::validation(field, detail)
        }
        StatusCode::BAD_GATEWAY | StatusCode::SERVICE_UNAVAILABLE | StatusCode::GATEWAY_TIMEOUT => {
            BookingError::network(call.operation, detail)
        }
        s if s.is_server_error() => BookingError::storage(call.operation, detail),
        _ => BookingError::network(call.operation, detail),
    };

    GatewayError {
        error,
        status: Some(status.as_u16()),
        server_message: body.msg,
    }
}

async fn read<T: DeserializeOwned>(response: reqwest::Response, call: Call<'_>) -> Result<T, GatewayError> {
    let status = response.status();
    tracing::debug!(operation = call.operation, status = status.as_u16(), "Response received");

    if status.is_success() {
        return response.json::<T>().await.map_err(|e| GatewayError {
            error: BookingError::network(call.operation, e),
            status: Some(status.as_u16()),
            server_message: None,
        });
    }

    let body: ErrorBody = response.json().await.unwrap_or_default();
    let err = classify(status, body, &call);
    tracing::warn!(operation = call.operation, status = status.as_u16(), "Request rejected: {}", err);
    Err(err)
}

pub struct HttpGateway {
    base_url: String,
    client: reqwest::Client,
}

impl HttpGateway {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_owned(),
            client: reqwest::Client::new(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn credentials(
        &self,
        path: &str,
        operation: &'static str,
        body: &Credentials<'_>,
    ) -> Result<AuthPayload, GatewayError> {
        let response = self
            .client
            .post(self.url(path))
            .json(body)
            .send()
            .await
            .map_err(|e| GatewayError::offline(operation, e))?;
        read(response, Call { operation, target: "", credentials: true }).await
    }
}

fn wire(candidate: &ValidBooking) -> Booking {
    candidate.clone().into_booking(None, None)
}

#[async_trait]
impl BookingGateway for HttpGateway {
    async fn login(&self, email: &str, password: &str) -> Result<AuthPayload, GatewayError> {
        let body = Credentials { name: None, email, password };
        self.credentials("/api/auth/login", "login", &body).await
    }

    async fn register(&self, name: &str, email: &str, password: &str) -> Result<AuthPayload, GatewayError> {
        let body = Credentials { name: Some(name), email, password };
        self.credentials("/api/auth/register", "register", &body).await
    }

    async fn renew(&self, token: &str) -> Result<AuthPayload, GatewayError> {
        let response = self
            .client
            .get(self.url("/api/auth/renew"))
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| GatewayError::offline("renew", e))?;
        read(response, Call { operation: "renew", target: "", credentials: false }).await
    }

    async fn list(&self, token: &str) -> Result<Vec<Booking>, GatewayError> {
        let response = self
            .client
            .get(self.url("/api/events"))
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| GatewayError::offline("list", e))?;
        let body: EventList = read(response, Call { operation: "list", target: "", credentials: false }).await?;
        tracing::info!("Fetched {} bookings", body.eventos.len());
        Ok(body.eventos)
    }

    async fn create(&self, token: &str, candidate: &ValidBooking) -> Result<Booking, GatewayError> {
        let response = self
            .client
            .post(self.url("/api/events"))
            .bearer_auth(token)
            .json(&wire(candidate))
            .send()
            .await
            .map_err(|e| GatewayError::offline("create", e))?;
        let body: EventBody = read(response, Call { operation: "create", target: "", credentials: false }).await?;
        Ok(body.evento)
    }

    async fn update(&self, token: &str, id: &ObjectId, candidate: &ValidBooking) -> Result<Booking, GatewayError> {
        let response = self
            .client
            .put(self.url(&format!("/api/events/{id}")))
            .bearer_auth(token)
            .json(&wire(candidate))
            .send()
            .await
            .map_err(|e| GatewayError::offline("update", e))?;
        let body: EventBody = read(response, Call { operation: "update", target: id.as_str(), credentials: false }).await?;
        Ok(body.evento)
    }

    async fn delete(&self, token: &str, id: &ObjectId) -> Result<(), GatewayError> {
        let response = self
            .client
            .delete(self.url(&format!("/api/events/{id}")))
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| GatewayError::offline("delete", e))?;
        read::<Ack>(response, Call { operation: "delete", target: id.as_str(), credentials: false }).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn call() -> Call<'static> {
        Call { operation: "update", target: "507f1f77bcf86cd799439011", credentials: false }
    }

    #[test]
    fn test_validation_rejection_keeps_field_and_server_message() {
        let body = ErrorBody {
            msg: Some("El título es obligatorio".into()),
            error: Some("validation failed".into()),
            field: Some("title".into()),
        };
        let err = classify(StatusCode::BAD_REQUEST, body, &call());
        assert_eq!(err.error.field(), Some(Field::Title));
        assert_eq!(err.user_message(), "El título es obligatorio");
        assert!(!err.is_unauthorized());
    }

    #[test]
    fn test_fieldless_rejection_is_validation_not_network() {
        let body = ErrorBody {
            msg: Some("Los datos enviados no son válidos.".into()),
            error: Some("malformed request body".into()),
            field: None,
        };
        let err = classify(StatusCode::BAD_REQUEST, body, &call());
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert_eq!(err.error.field(), Some(Field::Body));
        assert_eq!(err.user_message(), "Los datos enviados no son válidos.");
    }

    #[test]
    fn test_statuses_map_to_kinds() {
        let cases = [
            (StatusCode::UNAUTHORIZED, ErrorKind::Authentication),
            (StatusCode::FORBIDDEN, ErrorKind::Authorization),
            (StatusCode::NOT_FOUND, ErrorKind::NotFound),
            (StatusCode::INTERNAL_SERVER_ERROR, ErrorKind::Storage),
            (StatusCode::BAD_GATEWAY, ErrorKind::Network),
        ];
        for (status, kind) in cases {
            assert_eq!(classify(status, ErrorBody::default(), &call()).kind(), kind);
        }
    }

    #[test]
    fn test_server_failures_never_show_server_wording() {
        let body = ErrorBody {
            msg: Some("pool timed out".into()),
            ..ErrorBody::default()
        };
        let err = classify(StatusCode::INTERNAL_SERVER_ERROR, body, &call());
        assert_eq!(err.user_message(), err.error.user_message());
    }
}
