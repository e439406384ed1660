use crate::models::reservation::{
    BookingRequest, CancellationResponse, Reservation, ReservationListResponse, ReservationScope,
};
use crate::models::user::PromoteRequest;
use crate::services::booking_service::BookingService;
use crate::services::user_service::UserService;
use crate::utils::error::AppError;
use crate::utils::jwt::{AdminUser, AuthenticatedUser};
use rocket::serde::json::Json;
use rocket::State;
use rocket_okapi::openapi;
use validator::Validate;

/// Book seats on a showtime
#[openapi(tag = "Reservations")]
#[post("/reservations", format = "json", data = "<request>")]
pub async fn book_seats(
    request: Json<BookingRequest>,
    auth: AuthenticatedUser,
    booking_service: &State<BookingService>,
) -> Result<Json<Reservation>, AppError> {
    let request = request.into_inner();
    request.validate()?;

    let reservation = booking_service
        .book(auth.user_id, &request.showtime_id, request.seats)
        .await?;
    Ok(Json(reservation))
}

/// Cancel a reservation and release its seats
#[openapi(tag = "Reservations")]
#[delete("/reservations/<reservation_id>")]
pub async fn cancel_reservation(
    reservation_id: String,
    auth: AuthenticatedUser,
    booking_service: &State<BookingService>,
) -> Result<Json<CancellationResponse>, AppError> {
    let reservation = if auth.is_admin() {
        booking_service.cancel(&reservation_id).await?
    } else {
        booking_service
            .cancel_for_user(auth.user_id, &reservation_id)
            .await?
    };

    Ok(Json(CancellationResponse {
        reservation_id: reservation.reservation_id,
        released_seats: reservation.seat_count,
        status: "cancelled".to_string(),
    }))
}

/// Reservations of the caller for showtimes that have not started yet
#[openapi(tag = "Reservations")]
#[get("/reservations/upcoming")]
pub async fn upcoming_reservations(
    auth: AuthenticatedUser,
    booking_service: &State<BookingService>,
) -> Result<Json<ReservationListResponse>, AppError> {
    let reservations = booking_service
        .list_reservations(ReservationScope::Upcoming {
            user_id: auth.user_id,
            now: chrono::Utc::now(),
        })
        .await?;
    Ok(Json(ReservationListResponse { reservations }))
}

/// All reservations of the caller
#[openapi(tag = "Reservations")]
#[get("/reservations")]
pub async fn my_reservations(
    auth: AuthenticatedUser,
    booking_service: &State<BookingService>,
) -> Result<Json<ReservationListResponse>, AppError> {
    let reservations = booking_service
        .list_reservations(ReservationScope::User(auth.user_id))
        .await?;
    Ok(Json(ReservationListResponse { reservations }))
}

/// Every reservation in the system
#[openapi(tag = "Admin")]
#[get("/admin/reservations")]
pub async fn all_reservations(
    _admin: AdminUser,
    booking_service: &State<BookingService>,
) -> Result<Json<ReservationListResponse>, AppError> {
    let reservations = booking_service
        .list_reservations(ReservationScope::All)
        .await?;
    Ok(Json(ReservationListResponse { reservations }))
}

/// Reservations of one user
#[openapi(tag = "Admin")]
#[get("/admin/users/<user_id>/reservations")]
pub async fn user_reservations(
    user_id: i32,
    _admin: AdminUser,
    booking_service: &State<BookingService>,
) -> Result<Json<ReservationListResponse>, AppError> {
    let reservations = booking_service
        .list_reservations(ReservationScope::User(user_id))
        .await?;
    Ok(Json(ReservationListResponse { reservations }))
}

/// Reservations on one showtime
#[openapi(tag = "Admin")]
#[get("/admin/showtimes/<showtime_id>/reservations")]
pub async fn showtime_reservations(
    showtime_id: String,
    _admin: AdminUser,
    booking_service: &State<BookingService>,
) -> Result<Json<ReservationListResponse>, AppError> {
    let reservations = booking_service
        .list_reservations(ReservationScope::Showtime(showtime_id))
        .await?;
    Ok(Json(ReservationListResponse { reservations }))
}

/// Grant the admin role to a user
#[openapi(tag = "Admin")]
#[post("/admin/promote", format = "json", data = "<request>")]
pub async fn promote(
    request: Json<PromoteRequest>,
    _admin: AdminUser,
    user_service: &State<UserService>,
) -> Result<Json<PromoteRequest>, AppError> {
    let request = request.into_inner();
    user_service.promote_to_admin(request.user_id).await?;
    Ok(Json(request))
}
