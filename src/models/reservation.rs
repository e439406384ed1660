use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use validator::Validate;

/// A committed booking of `seat_count` seats by one user for one showtime.
///
/// `total_price` and `reservation_date` are snapshots taken when the booking
/// committed; they are never recomputed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema, sqlx::FromRow)]
pub struct Reservation {
    pub reservation_id: String,
    pub user_id: i32,
    pub showtime_id: String,
    pub seat_count: i32,
    pub total_price: Decimal,
    pub reservation_date: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, JsonSchema, Validate)]
pub struct BookingRequest {
    #[validate(length(min = 1, message = "showtime_id is required"))]
    pub showtime_id: String,
    #[validate(range(min = 1, message = "seats should be a positive integer"))]
    pub seats: i32,
}

/// Which slice of the ledger a listing covers.
#[derive(Debug, Clone, PartialEq)]
pub enum ReservationScope {
    All,
    User(i32),
    Showtime(String),
    Upcoming { user_id: i32, now: DateTime<Utc> },
}

#[derive(Debug, Serialize, JsonSchema)]
pub struct ReservationListResponse {
    pub reservations: Vec<Reservation>,
}

#[derive(Debug, Serialize, JsonSchema)]
pub struct CancellationResponse {
    pub reservation_id: String,
    pub released_seats: i32,
    pub status: String,
}
