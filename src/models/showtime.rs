use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use validator::Validate;

#[derive(Debug, Clone, Serialize, JsonSchema, sqlx::FromRow)]
pub struct Showtime {
    pub showtime_id: String,
    pub movie_id: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub venue: String,
    pub price_per_seat: Decimal,
    pub total_seats: i32,
    pub available_seats: i32,
}

/// The inventory record for one showtime.
///
/// `available_seats` only moves through the conditional reserve and the
/// bounded release; `total_seats` is the original capacity.
#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct ShowtimeInventory {
    pub showtime_id: String,
    pub total_seats: i32,
    pub available_seats: i32,
    pub price_per_seat: Decimal,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
}

/// Price and date captured inside the booking transaction.
#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct PricingSnapshot {
    pub price_per_seat: Decimal,
    pub start_time: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, JsonSchema, sqlx::FromRow)]
pub struct SeatsAndPrice {
    pub available_seats: i32,
    pub price_per_seat: Decimal,
}

#[derive(Debug, Clone, Deserialize, JsonSchema, Validate)]
pub struct NewShowtimeRequest {
    #[validate(length(min = 1, message = "movie_id is required"))]
    pub movie_id: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    #[validate(length(min = 1, message = "venue is required"))]
    pub venue: String,
    pub price_per_seat: Decimal,
    #[validate(range(min = 1, message = "total_seats should be a positive integer"))]
    pub total_seats: i32,
}

// No seat counts: inventory only moves through booking and cancellation
#[derive(Debug, Clone, Default, Deserialize, JsonSchema)]
pub struct UpdateShowtimeRequest {
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub venue: Option<String>,
    pub price_per_seat: Option<Decimal>,
}

#[derive(Debug, Serialize, JsonSchema, sqlx::FromRow)]
pub struct ShowtimeAndMovie {
    pub showtime_id: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub venue: String,
    pub price_per_seat: Decimal,
    pub available_seats: i32,
    pub movie_id: String,
    pub title: String,
    pub genre: String,
    pub director: String,
    pub poster_image: String,
}
