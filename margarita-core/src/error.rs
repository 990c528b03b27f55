use serde::{Deserialize, Serialize};
use std::fmt;

/// Booking field a validation failure is attached to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    Title,
    Dates,
    DateRange,
    PastDate,
    BookingType,
    PartySize,
    BookingId,
    /// The request body as a whole could not be read.
    Body,
}

impl Field {
    pub fn as_str(&self) -> &'static str {
        match self {
            Field::Title => "title",
            Field::Dates => "dates",
            Field::DateRange => "date_range",
            Field::PastDate => "past_date",
            Field::BookingType => "booking_type",
            Field::PartySize => "party_size",
            Field::BookingId => "booking_id",
            Field::Body => "body",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        [
            Field::Title,
            Field::Dates,
            Field::DateRange,
            Field::PastDate,
            Field::BookingType,
            Field::PartySize,
            Field::BookingId,
            Field::Body,
        ]
        .into_iter()
        .find(|f| f.as_str() == code)
    }

    fn user_message(&self) -> &'static str {
        match self {
            Field::Title => "El título del evento es obligatorio.",
            Field::Dates => "Las fechas proporcionadas no son válidas.",
            Field::DateRange => "La fecha de fin no puede ser anterior a la fecha de inicio.",
            Field::PastDate => "No se pueden crear reservas en fechas pasadas.",
            Field::BookingType => "Selecciona un tipo de reserva válido.",
            Field::PartySize => "La cantidad de personas debe estar entre 1 y 25.",
            Field::BookingId => "ID de evento inválido.",
            Field::Body => "Los datos enviados no son válidos.",
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Coarse failure category, stable across the HTTP boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    Validation,
    Authorization,
    NotFound,
    Storage,
    Network,
    Authentication,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Validation => "VALIDATION",
            ErrorKind::Authorization => "AUTHORIZATION",
            ErrorKind::NotFound => "NOT_FOUND",
            ErrorKind::Storage => "STORAGE",
            ErrorKind::Network => "NETWORK",
            ErrorKind::Authentication => "AUTHENTICATION",
        }
    }
}

/// Structured rejection produced by the validator, the authorization gate and the stores.
///
/// The `Display` output is the technical message meant for logs; [`BookingError::user_message`]
/// is the short localized text shown to end users.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BookingError {
    #[error("validation failed for '{field}': {detail}")]
    Validation { field: Field, detail: String },

    #[error("unauthorized: {detail}")]
    Authorization { detail: String },

    #[error("booking {id} not found")]
    NotFound { id: String },

    #[error("storage failure during {operation}: {detail}")]
    Storage { operation: String, detail: String },

    #[error("network failure during {operation}: {detail}")]
    Network { operation: String, detail: String },

    #[error("authentication failed: {detail}")]
    Authentication { detail: String },
}

impl BookingError {
    pub fn validation(field: Field, detail: impl Into<String>) -> Self {
        Self::Validation {
            field,
            detail: detail.into(),
        }
    }

    pub fn authorization(detail: impl Into<String>) -> Self {
        Self::Authorization {
            detail: detail.into(),
        }
    }

    pub fn not_found(id: impl fmt::Display) -> Self {
        Self::NotFound { id: id.to_string() }
    }

    pub fn storage(operation: &str, detail: impl fmt::Display) -> Self {
        Self::Storage {
            operation: operation.to_owned(),
            detail: detail.to_string(),
        }
    }

    pub fn network(operation: &str, detail: impl fmt::Display) -> Self {
        Self::Network {
            operation: operation.to_owned(),
            detail: detail.to_string(),
        }
    }

    pub fn authentication(detail: impl Into<String>) -> Self {
        Self::Authentication {
            detail: detail.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            BookingError::Validation { .. } => ErrorKind::Validation,
            BookingError::Authorization { .. } => ErrorKind::Authorization,
            BookingError::NotFound { .. } => ErrorKind::NotFound,
            BookingError::Storage { .. } => ErrorKind::Storage,
            BookingError::Network { .. } => ErrorKind::Network,
            BookingError::Authentication { .. } => ErrorKind::Authentication,
        }
    }

    pub fn field(&self) -> Option<Field> {
        match self {
            BookingError::Validation { field, .. } => Some(*field),
            _ => None,
        }
    }

    pub fn technical_message(&self) -> String {
        self.to_string()
    }

    pub fn user_message(&self) -> &'static str {
        match self {
            BookingError::Validation { field, .. } => field.user_message(),
            BookingError::Authorization { .. } => "No tienes permisos para realizar esta acción.",
            BookingError::NotFound { .. } => "El evento que intentas modificar ya no existe.",
            BookingError::Storage { .. } => {
                "Ocurrió un problema con el servidor. Intenta nuevamente en unos momentos."
            }
            BookingError::Network { .. } => {
                "Problema de conexión. Verifica tu internet e intenta nuevamente."
            }
            BookingError::Authentication { .. } => {
                "Tu sesión ha expirado. Por favor, inicia sesión nuevamente."
            }
        }
    }
}

pub type CoreResult<T> = Result<T, BookingError>;
