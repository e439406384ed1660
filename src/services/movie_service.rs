use crate::models::movie::{Movie, NewMovieRequest, UpdateMovieRequest};
use crate::utils::error::{AppError, AppResult};
use sqlx::{MySql, MySqlPool, QueryBuilder};
use uuid::Uuid;

const MOVIE_COLUMNS: &str = "movie_id, title, description, genre, duration_minutes, director, \
     poster_image, release_date";

pub struct MovieService {
    pool: MySqlPool,
}

impl MovieService {
    pub fn new(pool: MySqlPool) -> Self {
        MovieService { pool }
    }

    pub async fn add_movie(&self, request: NewMovieRequest) -> AppResult<Movie> {
        let movie_id = Uuid::new_v4().to_string();

        sqlx::query(
            r#"
            INSERT INTO movie
            (movie_id, title, description, genre, duration_minutes, director, poster_image,
                release_date)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&movie_id)
        .bind(&request.title)
        .bind(&request.description)
        .bind(&request.genre)
        .bind(request.duration_minutes)
        .bind(&request.director)
        .bind(&request.poster_image)
        .bind(request.release_date)
        .execute(&self.pool)
        .await?;

        self.get_movie(&movie_id).await
    }

    pub async fn get_movie(&self, movie_id: &str) -> AppResult<Movie> {
        let query = format!("SELECT {} FROM movie WHERE movie_id = ?", MOVIE_COLUMNS);
        sqlx::query_as::<_, Movie>(&query)
            .bind(movie_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Movie {}", movie_id)))
    }

    pub async fn list_movies(&self) -> AppResult<Vec<Movie>> {
        let query = format!("SELECT {} FROM movie ORDER BY release_date DESC", MOVIE_COLUMNS);
        let movies = sqlx::query_as::<_, Movie>(&query)
            .fetch_all(&self.pool)
            .await?;

        Ok(movies)
    }

    // Only the provided fields are written
    pub async fn update_movie(&self, movie_id: &str, request: UpdateMovieRequest) -> AppResult<Movie> {
        self.get_movie(movie_id).await?;

        let mut builder = QueryBuilder::<MySql>::new("UPDATE movie SET ");
        let mut changed = 0;
        {
            let mut fields = builder.separated(", ");
            if let Some(title) = request.title {
                fields.push("title = ").push_bind_unseparated(title);
                changed += 1;
            }
            if let Some(description) = request.description {
                fields.push("description = ").push_bind_unseparated(description);
                changed += 1;
            }
            if let Some(genre) = request.genre {
                fields.push("genre = ").push_bind_unseparated(genre);
                changed += 1;
            }
            if let Some(duration) = request.duration_minutes {
                if duration <= 0 {
                    return Err(AppError::InvalidInput(
                        "duration should be a positive number of minutes".into(),
                    ));
                }
                fields.push("duration_minutes = ").push_bind_unseparated(duration);
                changed += 1;
            }
            if let Some(director) = request.director {
                fields.push("director = ").push_bind_unseparated(director);
                changed += 1;
            }
            if let Some(poster_image) = request.poster_image {
                fields.push("poster_image = ").push_bind_unseparated(poster_image);
                changed += 1;
            }
            if let Some(release_date) = request.release_date {
                fields.push("release_date = ").push_bind_unseparated(release_date);
                changed += 1;
            }
        }

        if changed == 0 {
            return Err(AppError::InvalidInput("no fields to update".into()));
        }

        builder.push(" WHERE movie_id = ").push_bind(movie_id);
        builder.build().execute(&self.pool).await?;

        self.get_movie(movie_id).await
    }

    // Showtimes and their reservations go with the movie
    pub async fn delete_movie(&self, movie_id: &str) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM movie WHERE movie_id = ?")
            .bind(movie_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Movie {}", movie_id)));
        }

        tracing::info!(movie_id, "movie deleted");
        Ok(())
    }
}
