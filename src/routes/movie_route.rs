use crate::models::movie::{Movie, MovieListResponse, NewMovieRequest, UpdateMovieRequest};
use crate::models::showtime::ShowtimeAndMovie;
use crate::services::movie_service::MovieService;
use crate::services::showtime_service::ShowtimeService;
use crate::utils::error::AppError;
use crate::utils::jwt::{AdminUser, AuthenticatedUser};
use rocket::serde::json::Json;
use rocket::State;
use rocket_okapi::openapi;
use validator::Validate;

/// List all movies
#[openapi(tag = "Movies")]
#[get("/movies")]
pub async fn list_movies(
    _auth: AuthenticatedUser,
    movie_service: &State<MovieService>,
) -> Result<Json<MovieListResponse>, AppError> {
    let movies = movie_service.list_movies().await?;
    Ok(Json(MovieListResponse { movies }))
}

/// Get one movie
#[openapi(tag = "Movies")]
#[get("/movies/<movie_id>")]
pub async fn get_movie(
    movie_id: String,
    _auth: AuthenticatedUser,
    movie_service: &State<MovieService>,
) -> Result<Json<Movie>, AppError> {
    Ok(Json(movie_service.get_movie(&movie_id).await?))
}

/// Showtimes of a movie, joined with the movie's details
#[openapi(tag = "Movies")]
#[get("/movies/<movie_id>/showtimes")]
pub async fn movie_showtimes(
    movie_id: String,
    _auth: AuthenticatedUser,
    showtime_service: &State<ShowtimeService>,
) -> Result<Json<Vec<ShowtimeAndMovie>>, AppError> {
    Ok(Json(showtime_service.showtimes_for_movie(&movie_id).await?))
}

/// Add a movie
#[openapi(tag = "Admin")]
#[post("/admin/movies", format = "json", data = "<request>")]
pub async fn add_movie(
    request: Json<NewMovieRequest>,
    _admin: AdminUser,
    movie_service: &State<MovieService>,
) -> Result<Json<Movie>, AppError> {
    let request = request.into_inner();
    request.validate()?;
    Ok(Json(movie_service.add_movie(request).await?))
}

/// Update the provided fields of a movie
#[openapi(tag = "Admin")]
#[patch("/admin/movies/<movie_id>", format = "json", data = "<request>")]
pub async fn update_movie(
    movie_id: String,
    request: Json<UpdateMovieRequest>,
    _admin: AdminUser,
    movie_service: &State<MovieService>,
) -> Result<Json<Movie>, AppError> {
    Ok(Json(
        movie_service
            .update_movie(&movie_id, request.into_inner())
            .await?,
    ))
}

/// Delete a movie with its showtimes and reservations
#[openapi(tag = "Admin")]
#[delete("/admin/movies/<movie_id>")]
pub async fn delete_movie(
    movie_id: String,
    _admin: AdminUser,
    movie_service: &State<MovieService>,
) -> Result<Json<Movie>, AppError> {
    let movie = movie_service.get_movie(&movie_id).await?;
    movie_service.delete_movie(&movie_id).await?;
    Ok(Json(movie))
}
