use crate::models::showtime::{
    NewShowtimeRequest, Showtime, ShowtimeAndMovie, UpdateShowtimeRequest,
};
use crate::utils::error::{AppError, AppResult};
use rust_decimal::Decimal;
use sqlx::MySqlPool;
use uuid::Uuid;

const SHOWTIME_COLUMNS: &str = "showtime_id, movie_id, start_time, end_time, venue, \
     price_per_seat, total_seats, available_seats";

/// Showtime catalog management. Seat counts are written once at creation;
/// afterwards only the booking coordinators move them.
pub struct ShowtimeService {
    pool: MySqlPool,
}

impl ShowtimeService {
    pub fn new(pool: MySqlPool) -> Self {
        ShowtimeService { pool }
    }

    pub async fn add_showtime(&self, request: NewShowtimeRequest) -> AppResult<Showtime> {
        if request.end_time <= request.start_time {
            return Err(AppError::InvalidInput(
                "end_time must be after start_time".into(),
            ));
        }
        if request.price_per_seat < Decimal::ZERO {
            return Err(AppError::InvalidInput(
                "price_per_seat should not be negative".into(),
            ));
        }

        let movie = sqlx::query("SELECT movie_id FROM movie WHERE movie_id = ?")
            .bind(&request.movie_id)
            .fetch_optional(&self.pool)
            .await?;
        if movie.is_none() {
            return Err(AppError::NotFound(format!("Movie {}", request.movie_id)));
        }

        let showtime_id = Uuid::new_v4().to_string();
        sqlx::query(
            r#"
            INSERT INTO showtime
            (showtime_id, movie_id, start_time, end_time, venue, price_per_seat,
                total_seats, available_seats)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&showtime_id)
        .bind(&request.movie_id)
        .bind(request.start_time)
        .bind(request.end_time)
        .bind(&request.venue)
        .bind(request.price_per_seat)
        .bind(request.total_seats)
        .bind(request.total_seats)
        .execute(&self.pool)
        .await?;

        tracing::info!(%showtime_id, movie_id = %request.movie_id, total_seats = request.total_seats, "showtime added");
        self.get_showtime(&showtime_id).await
    }

    pub async fn get_showtime(&self, showtime_id: &str) -> AppResult<Showtime> {
        let query = format!("SELECT {} FROM showtime WHERE showtime_id = ?", SHOWTIME_COLUMNS);
        sqlx::query_as::<_, Showtime>(&query)
            .bind(showtime_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::ShowtimeNotFound(showtime_id.to_string()))
    }

    // Partial update of schedule, venue and price
    pub async fn update_showtime(
        &self,
        showtime_id: &str,
        request: UpdateShowtimeRequest,
    ) -> AppResult<Showtime> {
        if request.start_time.is_none()
            && request.end_time.is_none()
            && request.venue.is_none()
            && request.price_per_seat.is_none()
        {
            return Err(AppError::InvalidInput("no fields to update".into()));
        }

        let mut tx = self.pool.begin().await?;

        let query = format!(
            "SELECT {} FROM showtime WHERE showtime_id = ? FOR UPDATE",
            SHOWTIME_COLUMNS
        );
        let current = sqlx::query_as::<_, Showtime>(&query)
            .bind(showtime_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| AppError::ShowtimeNotFound(showtime_id.to_string()))?;

        let start_time = request.start_time.unwrap_or(current.start_time);
        let end_time = request.end_time.unwrap_or(current.end_time);
        let venue = request.venue.unwrap_or(current.venue);
        let price_per_seat = request.price_per_seat.unwrap_or(current.price_per_seat);

        if end_time <= start_time {
            return Err(AppError::InvalidInput(
                "end_time must be after start_time".into(),
            ));
        }
        if price_per_seat < Decimal::ZERO {
            return Err(AppError::InvalidInput(
                "price_per_seat should not be negative".into(),
            ));
        }

        sqlx::query(
            r#"
            UPDATE showtime
            SET start_time = ?, end_time = ?, venue = ?, price_per_seat = ?
            WHERE showtime_id = ?
            "#,
        )
        .bind(start_time)
        .bind(end_time)
        .bind(&venue)
        .bind(price_per_seat)
        .bind(showtime_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        self.get_showtime(showtime_id).await
    }

    // Reservations for the showtime go with it (ON DELETE CASCADE)
    pub async fn delete_showtime(&self, showtime_id: &str) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM showtime WHERE showtime_id = ?")
            .bind(showtime_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::ShowtimeNotFound(showtime_id.to_string()));
        }

        tracing::info!(showtime_id, "showtime deleted");
        Ok(())
    }

    pub async fn showtimes_for_movie(&self, movie_id: &str) -> AppResult<Vec<ShowtimeAndMovie>> {
        if movie_id.is_empty() {
            return Err(AppError::InvalidInput(
                "need movie_id to query showtimes".into(),
            ));
        }

        let showtimes = sqlx::query_as::<_, ShowtimeAndMovie>(
            r#"
            SELECT
                s.showtime_id,
                s.start_time,
                s.end_time,
                s.venue,
                s.price_per_seat,
                s.available_seats,
                m.movie_id,
                m.title,
                m.genre,
                m.director,
                m.poster_image
            FROM showtime s
            JOIN movie m ON s.movie_id = m.movie_id
            WHERE s.movie_id = ?
            ORDER BY s.start_time
            "#,
        )
        .bind(movie_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(showtimes)
    }
}
