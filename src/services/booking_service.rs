use crate::config::BookingConfig;
use crate::models::reservation::{Reservation, ReservationScope};
use crate::models::showtime::SeatsAndPrice;
use crate::store::{BookingStore, BookingTransaction, ReserveOutcome};
use crate::utils::error::{AppError, AppResult};
use rand::Rng;
use rust_decimal::Decimal;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Books and cancels seats against a [`BookingStore`].
///
/// Every booking and cancellation runs in one store transaction that is
/// committed on success and rolled back on every other exit. The only state
/// shared between concurrent calls is the store itself.
#[derive(Clone)]
pub struct BookingService {
    store: Arc<dyn BookingStore>,
    config: BookingConfig,
}

impl BookingService {
    pub fn new(store: Arc<dyn BookingStore>, config: BookingConfig) -> Self {
        BookingService { store, config }
    }

    /// Reserve `seat_count` seats on a showtime for a user.
    ///
    /// Checks availability, snapshots the price and start time, decrements
    /// the inventory and records the reservation as one unit.
    pub async fn book(
        &self,
        user_id: i32,
        showtime_id: &str,
        seat_count: i32,
    ) -> AppResult<Reservation> {
        if seat_count <= 0 {
            return Err(AppError::InvalidInput(
                "seats should be a positive integer".into(),
            ));
        }
        if showtime_id.trim().is_empty() {
            return Err(AppError::InvalidInput("showtime_id is required".into()));
        }

        let result = self
            .with_conflict_retry("book", move || self.book_once(user_id, showtime_id, seat_count))
            .await;

        match &result {
            Ok(reservation) => info!(
                reservation_id = %reservation.reservation_id,
                user_id,
                showtime_id,
                seat_count,
                total_price = %reservation.total_price,
                "seats booked"
            ),
            Err(err) if err.is_business_outcome() => {
                debug!(user_id, showtime_id, seat_count, %err, "booking declined")
            }
            Err(err) => warn!(user_id, showtime_id, seat_count, %err, "booking failed"),
        }

        result
    }

    /// Delete a reservation and return its seats to the showtime.
    pub async fn cancel(&self, reservation_id: &str) -> AppResult<Reservation> {
        self.cancel_checked(reservation_id, None).await
    }

    /// Cancel on behalf of a user; someone else's reservation reads as missing.
    pub async fn cancel_for_user(&self, user_id: i32, reservation_id: &str) -> AppResult<Reservation> {
        self.cancel_checked(reservation_id, Some(user_id)).await
    }

    async fn cancel_checked(&self, reservation_id: &str, owner: Option<i32>) -> AppResult<Reservation> {
        if reservation_id.trim().is_empty() {
            return Err(AppError::InvalidInput("reservation_id is required".into()));
        }

        let result = self
            .with_conflict_retry("cancel", move || self.cancel_once(reservation_id, owner))
            .await;

        match &result {
            Ok(reservation) => info!(
                reservation_id,
                showtime_id = %reservation.showtime_id,
                released_seats = reservation.seat_count,
                "reservation cancelled"
            ),
            Err(err) if err.is_business_outcome() => {
                debug!(reservation_id, %err, "cancellation declined")
            }
            Err(err) => warn!(reservation_id, %err, "cancellation failed"),
        }

        result
    }

    /// Seats left and price for a showtime. Sold out is `available_seats == 0`,
    /// not an error.
    pub async fn availability(&self, showtime_id: &str) -> AppResult<SeatsAndPrice> {
        self.store
            .availability(showtime_id)
            .await?
            .ok_or_else(|| AppError::ShowtimeNotFound(showtime_id.to_string()))
    }

    pub async fn reservation(&self, reservation_id: &str) -> AppResult<Reservation> {
        self.store
            .find_reservation(reservation_id)
            .await?
            .ok_or_else(|| AppError::ReservationNotFound(reservation_id.to_string()))
    }

    pub async fn list_reservations(&self, scope: ReservationScope) -> AppResult<Vec<Reservation>> {
        match scope {
            ReservationScope::All => self.store.find_all().await,
            ReservationScope::User(user_id) => self.store.find_by_user(user_id).await,
            ReservationScope::Showtime(showtime_id) => self.store.find_by_showtime(&showtime_id).await,
            ReservationScope::Upcoming { user_id, now } => {
                self.store.find_upcoming(user_id, now).await
            }
        }
    }

    async fn book_once(
        &self,
        user_id: i32,
        showtime_id: &str,
        seat_count: i32,
    ) -> AppResult<Reservation> {
        let mut tx = self.bounded("book", self.store.begin()).await?;
        let result = self
            .bounded("book", reserve_in(tx.as_mut(), user_id, showtime_id, seat_count))
            .await;
        finish(tx, result).await
    }

    async fn cancel_once(&self, reservation_id: &str, owner: Option<i32>) -> AppResult<Reservation> {
        let mut tx = self.bounded("cancel", self.store.begin()).await?;
        let result = self
            .bounded("cancel", release_in(tx.as_mut(), reservation_id, owner))
            .await;
        finish(tx, result).await
    }

    // Only work before commit is bounded; commit and rollback always run to completion
    async fn bounded<T, Fut>(&self, operation: &'static str, work: Fut) -> AppResult<T>
    where
        Fut: Future<Output = AppResult<T>>,
    {
        match tokio::time::timeout(self.config.transaction_timeout, work).await {
            Ok(result) => result,
            Err(_) => Err(AppError::StorageUnavailable(format!(
                "{} did not finish within {:?}",
                operation, self.config.transaction_timeout
            ))),
        }
    }

    // Retry lost races, each attempt in a fresh transaction
    async fn with_conflict_retry<T, F, Fut>(&self, operation: &'static str, mut attempt: F) -> AppResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = AppResult<T>>,
    {
        let mut retries = 0;
        loop {
            let result = attempt().await;

            match result {
                Err(AppError::Conflict(reason)) if retries < self.config.conflict_retries => {
                    retries += 1;
                    warn!(operation, retries, %reason, "concurrent update conflict, retrying");
                    let backoff = rand::thread_rng().gen_range(5..25);
                    tokio::time::sleep(Duration::from_millis(backoff)).await;
                }
                other => return other,
            }
        }
    }
}

async fn reserve_in(
    tx: &mut dyn BookingTransaction,
    user_id: i32,
    showtime_id: &str,
    seat_count: i32,
) -> AppResult<Reservation> {
    let snapshot = tx
        .pricing_snapshot(showtime_id)
        .await?
        .ok_or_else(|| AppError::ShowtimeNotFound(showtime_id.to_string()))?;

    match tx.try_reserve(showtime_id, seat_count).await? {
        ReserveOutcome::Reserved { remaining } => {
            debug!(showtime_id, seat_count, remaining, "inventory decremented")
        }
        ReserveOutcome::Insufficient { available } => {
            return Err(AppError::InsufficientSeats {
                requested: seat_count,
                available,
            })
        }
        ReserveOutcome::ShowtimeNotFound => {
            return Err(AppError::ShowtimeNotFound(showtime_id.to_string()))
        }
    }

    let reservation = Reservation {
        reservation_id: Uuid::new_v4().to_string(),
        user_id,
        showtime_id: showtime_id.to_string(),
        seat_count,
        total_price: Decimal::from(seat_count) * snapshot.price_per_seat,
        reservation_date: snapshot.start_time,
    };
    tx.insert_reservation(&reservation).await?;

    Ok(reservation)
}

async fn release_in(
    tx: &mut dyn BookingTransaction,
    reservation_id: &str,
    owner: Option<i32>,
) -> AppResult<Reservation> {
    let reservation = tx
        .find_reservation_for_update(reservation_id)
        .await?
        .filter(|r| owner.map_or(true, |user_id| r.user_id == user_id))
        .ok_or_else(|| AppError::ReservationNotFound(reservation_id.to_string()))?;

    tx.delete_reservation(reservation_id).await?;
    let available = tx
        .release(&reservation.showtime_id, reservation.seat_count)
        .await?;
    debug!(
        showtime_id = %reservation.showtime_id,
        released = reservation.seat_count,
        available,
        "inventory restored"
    );

    Ok(reservation)
}

// Commit on success, roll back on every other exit
async fn finish<T>(tx: Box<dyn BookingTransaction>, result: AppResult<T>) -> AppResult<T> {
    match result {
        Ok(value) => {
            tx.commit().await?;
            Ok(value)
        }
        Err(err) => {
            if let Err(rollback_err) = tx.rollback().await {
                warn!(%rollback_err, "rollback failed, connection will be discarded");
            }
            Err(err)
        }
    }
}
