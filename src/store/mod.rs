//! Durable storage for showtime inventory and the reservation ledger.
//!
//! The coordinators in [`crate::services::booking_service`] only see the two
//! traits below. A [`BookingTransaction`] holds an exclusive lock on every
//! inventory row it has touched until it is committed or rolled back, and
//! nothing it writes is visible to other callers before commit. Dropping a
//! transaction without committing discards its writes.

pub mod memory;
pub mod mysql;

use crate::models::reservation::Reservation;
use crate::models::showtime::{PricingSnapshot, SeatsAndPrice, ShowtimeInventory};
use crate::utils::error::AppResult;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

pub use memory::MemoryStore;
pub use mysql::MySqlStore;

/// Result of a conditional decrement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReserveOutcome {
    /// Seats were taken; carries what is left afterwards
    Reserved { remaining: i32 },
    /// Guard failed; carries the seats available when it was evaluated
    Insufficient { available: i32 },
    ShowtimeNotFound,
}

#[async_trait]
pub trait BookingStore: Send + Sync {
    /// Open a transaction scoped to one booking or cancellation.
    async fn begin(&self) -> AppResult<Box<dyn BookingTransaction>>;

    // Read-committed lookups, no locks taken
    async fn inventory(&self, showtime_id: &str) -> AppResult<Option<ShowtimeInventory>>;
    async fn availability(&self, showtime_id: &str) -> AppResult<Option<SeatsAndPrice>>;
    async fn find_reservation(&self, reservation_id: &str) -> AppResult<Option<Reservation>>;
    async fn find_all(&self) -> AppResult<Vec<Reservation>>;
    async fn find_by_user(&self, user_id: i32) -> AppResult<Vec<Reservation>>;
    async fn find_by_showtime(&self, showtime_id: &str) -> AppResult<Vec<Reservation>>;
    async fn find_upcoming(&self, user_id: i32, now: DateTime<Utc>) -> AppResult<Vec<Reservation>>;
}

#[async_trait]
pub trait BookingTransaction: Send {
    async fn pricing_snapshot(&mut self, showtime_id: &str) -> AppResult<Option<PricingSnapshot>>;

    /// Decrement `available_seats` by `seats` only if at least `seats` remain.
    ///
    /// `seats <= 0` is rejected with `InvalidInput`.
    async fn try_reserve(&mut self, showtime_id: &str, seats: i32) -> AppResult<ReserveOutcome>;

    /// Return `seats` to the showtime. Exceeding the original capacity is a
    /// `BookkeepingFault`, never clamped.
    async fn release(&mut self, showtime_id: &str, seats: i32) -> AppResult<i32>;

    /// Fails with `DuplicateId` if the id is already in the ledger.
    async fn insert_reservation(&mut self, reservation: &Reservation) -> AppResult<()>;

    /// Lock and load a reservation for deletion.
    async fn find_reservation_for_update(
        &mut self,
        reservation_id: &str,
    ) -> AppResult<Option<Reservation>>;

    /// Fails with `ReservationNotFound` if absent.
    async fn delete_reservation(&mut self, reservation_id: &str) -> AppResult<()>;

    async fn commit(self: Box<Self>) -> AppResult<()>;
    async fn rollback(self: Box<Self>) -> AppResult<()>;
}
