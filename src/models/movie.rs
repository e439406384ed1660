use chrono::NaiveDate;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use validator::Validate;

#[derive(Debug, Clone, Serialize, JsonSchema, sqlx::FromRow)]
pub struct Movie {
    pub movie_id: String,
    pub title: String,
    pub description: String,
    pub genre: String,
    pub duration_minutes: i32,
    pub director: String,
    pub poster_image: String,
    pub release_date: NaiveDate,
}

#[derive(Debug, Clone, Deserialize, JsonSchema, Validate)]
pub struct NewMovieRequest {
    #[validate(length(min = 1, message = "title is required"))]
    pub title: String,
    pub description: String,
    pub genre: String,
    #[validate(range(min = 1, message = "duration should be a positive number of minutes"))]
    pub duration_minutes: i32,
    pub director: String,
    pub poster_image: String,
    pub release_date: NaiveDate,
}

#[derive(Debug, Clone, Default, Deserialize, JsonSchema)]
pub struct UpdateMovieRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub genre: Option<String>,
    pub duration_minutes: Option<i32>,
    pub director: Option<String>,
    pub poster_image: Option<String>,
    pub release_date: Option<NaiveDate>,
}

#[derive(Debug, Serialize, JsonSchema)]
pub struct MovieListResponse {
    pub movies: Vec<Movie>,
}
