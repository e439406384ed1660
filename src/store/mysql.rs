use crate::models::reservation::Reservation;
use crate::models::showtime::{PricingSnapshot, SeatsAndPrice, ShowtimeInventory};
use crate::store::{BookingStore, BookingTransaction, ReserveOutcome};
use crate::utils::error::{AppError, AppResult};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{MySql, MySqlPool, Transaction};

const RESERVATION_COLUMNS: &str =
    "reservation_id, user_id, showtime_id, seat_count, total_price, reservation_date";

/// Inventory store and reservation ledger backed by InnoDB.
///
/// The conditional decrement is a single guarded `UPDATE`, so two racing
/// transactions serialize on the showtime row lock and the second one
/// re-evaluates the guard against the committed value.
#[derive(Clone)]
pub struct MySqlStore {
    pool: MySqlPool,
}

impl MySqlStore {
    pub fn new(pool: MySqlPool) -> Self {
        MySqlStore { pool }
    }
}

#[async_trait]
impl BookingStore for MySqlStore {
    async fn begin(&self) -> AppResult<Box<dyn BookingTransaction>> {
        let tx = self.pool.begin().await?;
        Ok(Box::new(MySqlTransaction { tx }))
    }

    async fn inventory(&self, showtime_id: &str) -> AppResult<Option<ShowtimeInventory>> {
        let inventory = sqlx::query_as::<_, ShowtimeInventory>(
            r#"
            SELECT showtime_id, total_seats, available_seats, price_per_seat, start_time, end_time
            FROM showtime
            WHERE showtime_id = ?
            "#,
        )
        .bind(showtime_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(inventory)
    }

    async fn availability(&self, showtime_id: &str) -> AppResult<Option<SeatsAndPrice>> {
        let seats = sqlx::query_as::<_, SeatsAndPrice>(
            "SELECT available_seats, price_per_seat FROM showtime WHERE showtime_id = ?",
        )
        .bind(showtime_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(seats)
    }

    async fn find_reservation(&self, reservation_id: &str) -> AppResult<Option<Reservation>> {
        let query = format!(
            "SELECT {} FROM reservation WHERE reservation_id = ?",
            RESERVATION_COLUMNS
        );
        let reservation = sqlx::query_as::<_, Reservation>(&query)
            .bind(reservation_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(reservation)
    }

    async fn find_all(&self) -> AppResult<Vec<Reservation>> {
        let query = format!(
            "SELECT {} FROM reservation ORDER BY reservation_date DESC",
            RESERVATION_COLUMNS
        );
        let reservations = sqlx::query_as::<_, Reservation>(&query)
            .fetch_all(&self.pool)
            .await?;

        Ok(reservations)
    }

    async fn find_by_user(&self, user_id: i32) -> AppResult<Vec<Reservation>> {
        let query = format!(
            "SELECT {} FROM reservation WHERE user_id = ? ORDER BY reservation_date DESC",
            RESERVATION_COLUMNS
        );
        let reservations = sqlx::query_as::<_, Reservation>(&query)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(reservations)
    }

    async fn find_by_showtime(&self, showtime_id: &str) -> AppResult<Vec<Reservation>> {
        let query = format!(
            "SELECT {} FROM reservation WHERE showtime_id = ? ORDER BY created_at",
            RESERVATION_COLUMNS
        );
        let reservations = sqlx::query_as::<_, Reservation>(&query)
            .bind(showtime_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(reservations)
    }

    async fn find_upcoming(&self, user_id: i32, now: DateTime<Utc>) -> AppResult<Vec<Reservation>> {
        let query = format!(
            r#"
            SELECT {} FROM reservation
            WHERE user_id = ? AND reservation_date > ?
            ORDER BY reservation_date
            "#,
            RESERVATION_COLUMNS
        );
        let reservations = sqlx::query_as::<_, Reservation>(&query)
            .bind(user_id)
            .bind(now)
            .fetch_all(&self.pool)
            .await?;

        Ok(reservations)
    }
}

pub struct MySqlTransaction {
    tx: Transaction<'static, MySql>,
}

impl MySqlTransaction {
    // Current (locking) read of the counters after a guarded update
    async fn locked_counts(&mut self, showtime_id: &str) -> AppResult<Option<(i32, i32)>> {
        let counts = sqlx::query_as::<_, (i32, i32)>(
            r#"
            SELECT available_seats, total_seats
            FROM showtime
            WHERE showtime_id = ?
            FOR UPDATE
            "#,
        )
        .bind(showtime_id)
        .fetch_optional(&mut *self.tx)
        .await?;

        Ok(counts)
    }
}

#[async_trait]
impl BookingTransaction for MySqlTransaction {
    async fn pricing_snapshot(&mut self, showtime_id: &str) -> AppResult<Option<PricingSnapshot>> {
        let snapshot = sqlx::query_as::<_, PricingSnapshot>(
            "SELECT price_per_seat, start_time FROM showtime WHERE showtime_id = ?",
        )
        .bind(showtime_id)
        .fetch_optional(&mut *self.tx)
        .await?;

        Ok(snapshot)
    }

    async fn try_reserve(&mut self, showtime_id: &str, seats: i32) -> AppResult<ReserveOutcome> {
        if seats <= 0 {
            return Err(AppError::InvalidInput(
                "seats should be a positive integer".into(),
            ));
        }

        // test-and-set in one statement: the guard is evaluated on the locked row
        let result = sqlx::query(
            r#"
            UPDATE showtime
            SET available_seats = available_seats - ?
            WHERE showtime_id = ? AND available_seats >= ?
            "#,
        )
        .bind(seats)
        .bind(showtime_id)
        .bind(seats)
        .execute(&mut *self.tx)
        .await?;

        let counts = self.locked_counts(showtime_id).await?;
        let outcome = match (result.rows_affected(), counts) {
            (_, None) => ReserveOutcome::ShowtimeNotFound,
            (0, Some((available, _))) => ReserveOutcome::Insufficient { available },
            (_, Some((remaining, _))) => ReserveOutcome::Reserved { remaining },
        };

        Ok(outcome)
    }

    async fn release(&mut self, showtime_id: &str, seats: i32) -> AppResult<i32> {
        if seats <= 0 {
            return Err(AppError::InvalidInput(
                "released seats should be a positive integer".into(),
            ));
        }

        let result = sqlx::query(
            r#"
            UPDATE showtime
            SET available_seats = available_seats + ?
            WHERE showtime_id = ? AND available_seats + ? <= total_seats
            "#,
        )
        .bind(seats)
        .bind(showtime_id)
        .bind(seats)
        .execute(&mut *self.tx)
        .await?;

        match (result.rows_affected(), self.locked_counts(showtime_id).await?) {
            (_, None) => Err(AppError::ShowtimeNotFound(showtime_id.to_string())),
            (0, Some((available, total))) => {
                tracing::error!(
                    showtime_id,
                    seats,
                    available,
                    total,
                    "release would exceed original capacity"
                );
                Err(AppError::BookkeepingFault(format!(
                    "releasing {} seats on showtime {} would exceed capacity {} (available {})",
                    seats, showtime_id, total, available
                )))
            }
            (_, Some((available, _))) => Ok(available),
        }
    }

    async fn insert_reservation(&mut self, reservation: &Reservation) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO reservation
            (reservation_id, user_id, showtime_id, seat_count, total_price, reservation_date)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&reservation.reservation_id)
        .bind(reservation.user_id)
        .bind(&reservation.showtime_id)
        .bind(reservation.seat_count)
        .bind(reservation.total_price)
        .bind(reservation.reservation_date)
        .execute(&mut *self.tx)
        .await
        .map_err(|e| match AppError::from(e) {
            AppError::DuplicateId(_) => AppError::DuplicateId(reservation.reservation_id.clone()),
            other => other,
        })?;

        Ok(())
    }

    async fn find_reservation_for_update(
        &mut self,
        reservation_id: &str,
    ) -> AppResult<Option<Reservation>> {
        let query = format!(
            "SELECT {} FROM reservation WHERE reservation_id = ? FOR UPDATE",
            RESERVATION_COLUMNS
        );
        let reservation = sqlx::query_as::<_, Reservation>(&query)
            .bind(reservation_id)
            .fetch_optional(&mut *self.tx)
            .await?;

        Ok(reservation)
    }

    async fn delete_reservation(&mut self, reservation_id: &str) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM reservation WHERE reservation_id = ?")
            .bind(reservation_id)
            .execute(&mut *self.tx)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::ReservationNotFound(reservation_id.to_string()));
        }

        Ok(())
    }

    async fn commit(self: Box<Self>) -> AppResult<()> {
        self.tx.commit().await?;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> AppResult<()> {
        self.tx.rollback().await?;
        Ok(())
    }
}
