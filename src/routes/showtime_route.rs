use crate::models::showtime::{NewShowtimeRequest, SeatsAndPrice, Showtime, UpdateShowtimeRequest};
use crate::services::booking_service::BookingService;
use crate::services::showtime_service::ShowtimeService;
use crate::utils::error::AppError;
use crate::utils::jwt::{AdminUser, AuthenticatedUser};
use rocket::serde::json::Json;
use rocket::State;
use rocket_okapi::openapi;
use validator::Validate;

/// Seats left and price per seat. A sold out showtime reports zero seats.
#[openapi(tag = "Showtimes")]
#[get("/showtimes/<showtime_id>/seats")]
pub async fn get_available_seats(
    showtime_id: String,
    _auth: AuthenticatedUser,
    booking_service: &State<BookingService>,
) -> Result<Json<SeatsAndPrice>, AppError> {
    Ok(Json(booking_service.availability(&showtime_id).await?))
}

/// Add a showtime; all of its seats start available
#[openapi(tag = "Admin")]
#[post("/admin/showtimes", format = "json", data = "<request>")]
pub async fn add_showtime(
    request: Json<NewShowtimeRequest>,
    _admin: AdminUser,
    showtime_service: &State<ShowtimeService>,
) -> Result<Json<Showtime>, AppError> {
    let request = request.into_inner();
    request.validate()?;
    Ok(Json(showtime_service.add_showtime(request).await?))
}

/// Update schedule, venue or price of a showtime
#[openapi(tag = "Admin")]
#[patch("/admin/showtimes/<showtime_id>", format = "json", data = "<request>")]
pub async fn update_showtime(
    showtime_id: String,
    request: Json<UpdateShowtimeRequest>,
    _admin: AdminUser,
    showtime_service: &State<ShowtimeService>,
) -> Result<Json<Showtime>, AppError> {
    Ok(Json(
        showtime_service
            .update_showtime(&showtime_id, request.into_inner())
            .await?,
    ))
}

/// Delete a showtime with its reservations
#[openapi(tag = "Admin")]
#[delete("/admin/showtimes/<showtime_id>")]
pub async fn delete_showtime(
    showtime_id: String,
    _admin: AdminUser,
    showtime_service: &State<ShowtimeService>,
) -> Result<Json<Showtime>, AppError> {
    let showtime = showtime_service.get_showtime(&showtime_id).await?;
    showtime_service.delete_showtime(&showtime_id).await?;
    Ok(Json(showtime))
}
