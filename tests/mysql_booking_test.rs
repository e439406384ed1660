use async_trait::async_trait;
use chrono::{Duration, NaiveDate, Utc};
use movie_booking_system::{
    config::{AuthConfig, BookingConfig},
    models::{
        movie::NewMovieRequest,
        reservation::ReservationScope,
        showtime::{NewShowtimeRequest, UpdateShowtimeRequest},
        user::{Role, UserLoginRequest, UserRegistrationRequest},
    },
    services::{
        booking_service::BookingService, movie_service::MovieService,
        showtime_service::ShowtimeService, user_service::UserService,
    },
    store::{BookingStore, BookingTransaction, MySqlStore},
    utils::error::AppError,
};
use rust_decimal::Decimal;
use sqlx::mysql::MySqlPool;
use std::sync::Arc;
use test_context::{test_context, AsyncTestContext};
use tokio::task::JoinSet;

mod common {
    pub mod test_utils;
}
use common::test_utils::TestDb;
use ctor::dtor;

struct MySqlContext {
    pool: MySqlPool,
    booking_service: BookingService,
    movie_service: MovieService,
    showtime_service: ShowtimeService,
    user_service: UserService,
}

#[dtor]
fn cleanup() {
    if let Err(e) = TestDb::cleanup_database_sync() {
        eprintln!("Failed to cleanup test database: {}", e);
    }
}

fn auth_config() -> AuthConfig {
    AuthConfig {
        access_secret: "test_access_secret".to_string(),
        refresh_secret: "test_refresh_secret".to_string(),
        access_token_ttl: chrono::Duration::minutes(15),
        refresh_token_ttl: chrono::Duration::days(7),
    }
}

#[async_trait]
impl AsyncTestContext for MySqlContext {
    async fn setup() -> Self {
        let pool = TestDb::get_instance(file!())
            .await
            .expect("Failed to get test database instance");

        let booking_service = BookingService::new(
            Arc::new(MySqlStore::new(pool.clone())),
            BookingConfig::default(),
        );

        MySqlContext {
            booking_service,
            movie_service: MovieService::new(pool.clone()),
            showtime_service: ShowtimeService::new(pool.clone()),
            user_service: UserService::new(pool.clone(), auth_config()),
            pool,
        }
    }

    async fn teardown(self) {}
}

async fn seed_showtime(ctx: &MySqlContext, seats: i32, price: Decimal) -> Result<String, AppError> {
    let movie = ctx
        .movie_service
        .add_movie(NewMovieRequest {
            title: "Test Movie".to_string(),
            description: "A movie for tests".to_string(),
            genre: "Drama".to_string(),
            duration_minutes: 120,
            director: "Someone".to_string(),
            poster_image: "poster.png".to_string(),
            release_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
        })
        .await?;

    let start_time = Utc::now() + Duration::days(3);
    let showtime = ctx
        .showtime_service
        .add_showtime(NewShowtimeRequest {
            movie_id: movie.movie_id,
            start_time,
            end_time: start_time + Duration::hours(2),
            venue: "Hall 1".to_string(),
            price_per_seat: price,
            total_seats: seats,
        })
        .await?;

    Ok(showtime.showtime_id)
}

async fn held_seats(pool: &MySqlPool, showtime_id: &str) -> Result<i64, AppError> {
    let held: i64 = sqlx::query_scalar(
        "SELECT CAST(COALESCE(SUM(seat_count), 0) AS SIGNED) FROM reservation WHERE showtime_id = ?",
    )
    .bind(showtime_id)
    .fetch_one(pool)
    .await?;

    Ok(held)
}

#[test_context(MySqlContext)]
#[tokio::test]
#[ignore = "requires ADMIN_DATABASE_URL"]
async fn test_book_and_cancel_round_trip(ctx: &MySqlContext) -> Result<(), AppError> {
    let showtime_id = seed_showtime(ctx, 5, Decimal::new(1000, 2)).await?;

    let reservation = ctx.booking_service.book(1, &showtime_id, 3).await?;
    assert_eq!(reservation.total_price, Decimal::new(3000, 2));
    assert_eq!(ctx.booking_service.availability(&showtime_id).await?.available_seats, 2);

    let err = ctx.booking_service.book(2, &showtime_id, 3).await.unwrap_err();
    assert_eq!(
        err,
        AppError::InsufficientSeats {
            requested: 3,
            available: 2
        }
    );

    let cancelled = ctx.booking_service.cancel(&reservation.reservation_id).await?;
    assert_eq!(cancelled.seat_count, 3);
    assert_eq!(ctx.booking_service.availability(&showtime_id).await?.available_seats, 5);

    let err = ctx
        .booking_service
        .cancel(&reservation.reservation_id)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::ReservationNotFound(_)));
    assert_eq!(ctx.booking_service.availability(&showtime_id).await?.available_seats, 5);

    Ok(())
}

#[test_context(MySqlContext)]
#[tokio::test]
#[ignore = "requires ADMIN_DATABASE_URL"]
async fn test_concurrent_bookings_never_oversell(ctx: &MySqlContext) -> Result<(), AppError> {
    let showtime_id = seed_showtime(ctx, 5, Decimal::new(1250, 2)).await?;

    let mut tasks = JoinSet::new();
    for user_id in 1..=20 {
        let service = ctx.booking_service.clone();
        let showtime_id = showtime_id.clone();
        tasks.spawn(async move { service.book(user_id, &showtime_id, 1).await });
    }

    let mut booked = 0;
    let mut rejected = 0;
    while let Some(result) = tasks.join_next().await {
        match result.expect("booking task panicked") {
            Ok(_) => booked += 1,
            Err(AppError::InsufficientSeats { .. }) => rejected += 1,
            Err(e) => panic!("unexpected booking error: {}", e),
        }
    }

    assert_eq!(booked, 5);
    assert_eq!(rejected, 15);
    assert_eq!(ctx.booking_service.availability(&showtime_id).await?.available_seats, 0);
    assert_eq!(held_seats(&ctx.pool, &showtime_id).await?, 5);

    Ok(())
}

#[test_context(MySqlContext)]
#[tokio::test]
#[ignore = "requires ADMIN_DATABASE_URL"]
async fn test_concurrent_cancels_release_once(ctx: &MySqlContext) -> Result<(), AppError> {
    let showtime_id = seed_showtime(ctx, 4, Decimal::new(800, 2)).await?;
    let reservation = ctx.booking_service.book(7, &showtime_id, 4).await?;

    let mut tasks = JoinSet::new();
    for _ in 0..6 {
        let service = ctx.booking_service.clone();
        let reservation_id = reservation.reservation_id.clone();
        tasks.spawn(async move { service.cancel(&reservation_id).await });
    }

    let mut released = 0;
    while let Some(result) = tasks.join_next().await {
        match result.expect("cancel task panicked") {
            Ok(_) => released += 1,
            Err(AppError::ReservationNotFound(_)) => {}
            Err(e) => panic!("unexpected cancel error: {}", e),
        }
    }

    assert_eq!(released, 1);
    assert_eq!(ctx.booking_service.availability(&showtime_id).await?.available_seats, 4);

    Ok(())
}

#[test_context(MySqlContext)]
#[tokio::test]
#[ignore = "requires ADMIN_DATABASE_URL"]
async fn test_upcoming_reservations_for_user(ctx: &MySqlContext) -> Result<(), AppError> {
    let showtime_id = seed_showtime(ctx, 10, Decimal::new(500, 2)).await?;
    let user_id = 4242;

    ctx.booking_service.book(user_id, &showtime_id, 2).await?;
    ctx.booking_service.book(user_id, &showtime_id, 1).await?;

    let upcoming = ctx
        .booking_service
        .list_reservations(ReservationScope::Upcoming {
            user_id,
            now: Utc::now(),
        })
        .await?;
    assert_eq!(upcoming.len(), 2);
    assert!(upcoming.iter().all(|r| r.user_id == user_id));

    let later = ctx
        .booking_service
        .list_reservations(ReservationScope::Upcoming {
            user_id,
            now: Utc::now() + Duration::days(30),
        })
        .await?;
    assert!(later.is_empty());

    Ok(())
}

#[test_context(MySqlContext)]
#[tokio::test]
#[ignore = "requires ADMIN_DATABASE_URL"]
async fn test_update_showtime_keeps_inventory(ctx: &MySqlContext) -> Result<(), AppError> {
    let showtime_id = seed_showtime(ctx, 6, Decimal::new(900, 2)).await?;
    ctx.booking_service.book(1, &showtime_id, 2).await?;

    let updated = ctx
        .showtime_service
        .update_showtime(
            &showtime_id,
            UpdateShowtimeRequest {
                venue: Some("Hall 2".to_string()),
                price_per_seat: Some(Decimal::new(1100, 2)),
                ..Default::default()
            },
        )
        .await?;

    assert_eq!(updated.venue, "Hall 2");
    assert_eq!(updated.price_per_seat, Decimal::new(1100, 2));
    assert_eq!(updated.total_seats, 6);
    assert_eq!(updated.available_seats, 4);

    let err = ctx
        .showtime_service
        .update_showtime(
            &showtime_id,
            UpdateShowtimeRequest {
                end_time: Some(updated.start_time - Duration::hours(1)),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::InvalidInput(_)));

    ctx.showtime_service.delete_showtime(&showtime_id).await?;
    let err = ctx.booking_service.availability(&showtime_id).await.unwrap_err();
    assert!(matches!(err, AppError::ShowtimeNotFound(_)));

    Ok(())
}

#[test_context(MySqlContext)]
#[tokio::test]
#[ignore = "requires ADMIN_DATABASE_URL"]
async fn test_register_login_and_promote(ctx: &MySqlContext) -> Result<(), AppError> {
    let email = format!("user_{}@example.com", uuid::Uuid::new_v4().simple());
    let user_id = ctx
        .user_service
        .register_user(UserRegistrationRequest {
            name: "Test User".to_string(),
            email: email.clone(),
            password: "test_password123".to_string(),
        })
        .await?;
    assert!(user_id > 0);

    let duplicate = ctx
        .user_service
        .register_user(UserRegistrationRequest {
            name: "Other User".to_string(),
            email: email.clone(),
            password: "another_password".to_string(),
        })
        .await
        .unwrap_err();
    assert!(matches!(duplicate, AppError::Conflict(_)));

    let login = ctx
        .user_service
        .login_user(UserLoginRequest {
            email: email.clone(),
            password: "test_password123".to_string(),
        })
        .await?;
    assert_eq!(login.user_id, user_id);
    assert_eq!(login.role, Role::User);

    let wrong = ctx
        .user_service
        .login_user(UserLoginRequest {
            email: email.clone(),
            password: "wrong_password".to_string(),
        })
        .await
        .unwrap_err();
    assert!(matches!(wrong, AppError::AuthError(_)));

    ctx.user_service.promote_to_admin(user_id).await?;
    let refreshed = ctx.user_service.refresh(&login.refresh_token).await?;
    assert_eq!(refreshed.role, Role::Admin);

    let again = ctx.user_service.promote_to_admin(user_id).await.unwrap_err();
    assert!(matches!(again, AppError::Conflict(_)));

    Ok(())
}

#[test_context(MySqlContext)]
#[tokio::test]
#[ignore = "requires ADMIN_DATABASE_URL"]
async fn test_concurrent_last_seat(ctx: &MySqlContext) -> Result<(), AppError> {
    let showtime_id = seed_showtime(ctx, 1, Decimal::new(1500, 2)).await?;

    let mut tasks = JoinSet::new();
    for user_id in 1..=2 {
        let service = ctx.booking_service.clone();
        let showtime_id = showtime_id.clone();
        tasks.spawn(async move { service.book(user_id, &showtime_id, 1).await });
    }

    let mut booked = 0;
    let mut sold_out = 0;
    while let Some(result) = tasks.join_next().await {
        match result.expect("booking task panicked") {
            Ok(_) => booked += 1,
            Err(AppError::InsufficientSeats { available, .. }) => {
                assert_eq!(available, 0);
                sold_out += 1;
            }
            Err(e) => panic!("unexpected booking error: {}", e),
        }
    }

    assert_eq!(booked, 1);
    assert_eq!(sold_out, 1);
    assert_eq!(ctx.booking_service.availability(&showtime_id).await?.available_seats, 0);
    assert_eq!(held_seats(&ctx.pool, &showtime_id).await?, 1);

    Ok(())
}

#[test_context(MySqlContext)]
#[tokio::test]
#[ignore = "requires ADMIN_DATABASE_URL"]
async fn test_unknown_showtime_is_not_found(ctx: &MySqlContext) -> Result<(), AppError> {
    let showtime_id = seed_showtime(ctx, 3, Decimal::new(700, 2)).await?;
    let missing = uuid::Uuid::new_v4().to_string();

    let err = ctx.booking_service.book(1, &missing, 1).await.unwrap_err();
    assert!(matches!(err, AppError::ShowtimeNotFound(_)));

    let err = ctx.booking_service.availability(&missing).await.unwrap_err();
    assert!(matches!(err, AppError::ShowtimeNotFound(_)));

    assert_eq!(ctx.booking_service.availability(&showtime_id).await?.available_seats, 3);
    assert_eq!(held_seats(&ctx.pool, &missing).await?, 0);

    Ok(())
}

#[test_context(MySqlContext)]
#[tokio::test]
#[ignore = "requires ADMIN_DATABASE_URL"]
async fn test_release_beyond_capacity_is_a_fault(ctx: &MySqlContext) -> Result<(), AppError> {
    let showtime_id = seed_showtime(ctx, 3, Decimal::new(1000, 2)).await?;
    let store = MySqlStore::new(ctx.pool.clone());

    let mut tx = store.begin().await?;
    let err = tx.release(&showtime_id, 1).await.unwrap_err();
    assert!(matches!(err, AppError::BookkeepingFault(_)));
    tx.rollback().await?;

    // within capacity the bounded release goes through
    let reservation = ctx.booking_service.book(1, &showtime_id, 2).await?;
    let mut tx = store.begin().await?;
    assert_eq!(tx.release(&showtime_id, 2).await?, 3);
    assert!(matches!(
        tx.release(&showtime_id, 1).await,
        Err(AppError::BookkeepingFault(_))
    ));
    tx.rollback().await?;

    let inventory = store.inventory(&showtime_id).await?.expect("showtime should exist");
    assert_eq!(inventory.available_seats, 1);
    assert_eq!(inventory.total_seats, 3);

    ctx.booking_service.cancel(&reservation.reservation_id).await?;
    assert_eq!(ctx.booking_service.availability(&showtime_id).await?.available_seats, 3);

    Ok(())
}
