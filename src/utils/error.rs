use thiserror::Error;
use rocket::http::Status;
use rocket::response::Responder;
use rocket::Request;
use rocket::Response;
use rocket::http::ContentType;
use std::io::Cursor;
use serde_json::json;
use serde::Serialize;
use rocket_okapi::JsonSchema;
use sqlx::mysql::MySqlDatabaseError;

// MySQL server error numbers the booking paths care about
const ER_DUP_ENTRY: u16 = 1062;
const ER_LOCK_WAIT_TIMEOUT: u16 = 1205;
const ER_LOCK_DEADLOCK: u16 = 1213;

#[derive(Error, Debug, Clone, PartialEq, Serialize, JsonSchema)]
pub enum AppError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Authentication error: {0}")]
    AuthError(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Showtime not found: {0}")]
    ShowtimeNotFound(String),

    #[error("Reservation not found: {0}")]
    ReservationNotFound(String),

    #[error("Not enough seats available, requested {requested} but only {available} left")]
    InsufficientSeats { requested: i32, available: i32 },

    #[error("Duplicate id: {0}")]
    DuplicateId(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Storage unavailable: {0}")]
    StorageUnavailable(String),

    #[error("Bookkeeping fault: {0}")]
    BookkeepingFault(String),
}

impl AppError {
    /// Transient failures the caller may safely retry.
    pub fn is_retryable(&self) -> bool {
        matches!(self, AppError::Conflict(_) | AppError::StorageUnavailable(_))
    }

    /// Expected outcomes of a booking request, not defects.
    pub fn is_business_outcome(&self) -> bool {
        matches!(
            self,
            AppError::InsufficientSeats { .. }
                | AppError::ShowtimeNotFound(_)
                | AppError::ReservationNotFound(_)
                | AppError::NotFound(_)
                | AppError::InvalidInput(_)
        )
    }
}

// Classify driver errors into the failure kinds callers act on
impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_err) = &err {
            if let Some(mysql_err) = db_err.try_downcast_ref::<MySqlDatabaseError>() {
                match mysql_err.number() {
                    ER_LOCK_DEADLOCK => return AppError::Conflict(mysql_err.to_string()),
                    ER_LOCK_WAIT_TIMEOUT => {
                        return AppError::StorageUnavailable(mysql_err.to_string())
                    }
                    ER_DUP_ENTRY => return AppError::DuplicateId(mysql_err.to_string()),
                    _ => {}
                }
            }
        }

        match err {
            sqlx::Error::RowNotFound => AppError::NotFound("Row not found".into()),
            other => AppError::StorageUnavailable(other.to_string()),
        }
    }
}

impl From<sqlx::migrate::MigrateError> for AppError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        AppError::StorageUnavailable(err.to_string())
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(err: validator::ValidationErrors) -> Self {
        AppError::InvalidInput(err.to_string())
    }
}

// Define a type alias for the result type
pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    pub fn status(&self) -> Status {
        match self {
            AppError::InvalidInput(_) => Status::BadRequest,
            AppError::AuthError(_) => Status::Unauthorized,
            AppError::NotFound(_) => Status::NotFound,
            AppError::ShowtimeNotFound(_) => Status::NotFound,
            AppError::ReservationNotFound(_) => Status::NotFound,
            AppError::InsufficientSeats { .. } => Status::Conflict,
            AppError::DuplicateId(_) => Status::Conflict,
            AppError::Conflict(_) => Status::Conflict,
            AppError::StorageUnavailable(_) => Status::ServiceUnavailable,
            AppError::BookkeepingFault(_) => Status::InternalServerError,
        }
    }
}

// Format all error from route level to a Http Response at route level
#[rocket::async_trait]
impl<'r> Responder<'r, 'static> for AppError {
    fn respond_to(self, _: &'r Request<'_>) -> rocket::response::Result<'static> {
        let status = self.status();

        let mut body = json!({
            "error": self.to_string()
        });
        if let AppError::InsufficientSeats { available, .. } = &self {
            body["available_seats"] = json!(available);
        }

        Response::build()
            .status(status)
            .header(ContentType::JSON)
            .sized_body(None, Cursor::new(body.to_string()))
            .ok()
    }
}
