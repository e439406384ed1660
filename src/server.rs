use crate::config::Config;
use crate::routes;
use crate::services::booking_service::BookingService;
use crate::services::movie_service::MovieService;
use crate::services::showtime_service::ShowtimeService;
use crate::services::user_service::UserService;
use crate::store::MySqlStore;
use rocket::fairing::AdHoc;
use rocket::{Build, Rocket};
use rocket_okapi::openapi_get_routes;
use rocket_okapi::swagger_ui::{make_swagger_ui, SwaggerUIConfig};
use sqlx::MySqlPool;
use std::sync::Arc;

fn swagger_ui() -> SwaggerUIConfig {
    SwaggerUIConfig {
        url: "/api/openapi.json".to_string(),
        ..Default::default()
    }
}

/// Wire services over one pool and mount every route.
pub fn build(config: Config, pool: MySqlPool) -> Rocket<Build> {
    let store = Arc::new(MySqlStore::new(pool.clone()));
    let booking_service = BookingService::new(store, config.booking.clone());
    let user_service = UserService::new(pool.clone(), config.auth.clone());
    let movie_service = MovieService::new(pool.clone());
    let showtime_service = ShowtimeService::new(pool);

    rocket::build()
        .manage(config.auth)
        .manage(booking_service)
        .manage(user_service)
        .manage(movie_service)
        .manage(showtime_service)
        .mount(
            "/api",
            openapi_get_routes![
                routes::account_route::signup,
                routes::account_route::login,
                routes::account_route::refresh,
                routes::movie_route::list_movies,
                routes::movie_route::get_movie,
                routes::movie_route::movie_showtimes,
                routes::movie_route::add_movie,
                routes::movie_route::update_movie,
                routes::movie_route::delete_movie,
                routes::showtime_route::get_available_seats,
                routes::showtime_route::add_showtime,
                routes::showtime_route::update_showtime,
                routes::showtime_route::delete_showtime,
                routes::reservation_route::book_seats,
                routes::reservation_route::cancel_reservation,
                routes::reservation_route::upcoming_reservations,
                routes::reservation_route::my_reservations,
                routes::reservation_route::all_reservations,
                routes::reservation_route::user_reservations,
                routes::reservation_route::showtime_reservations,
                routes::reservation_route::promote,
            ],
        )
        .mount("/swagger", make_swagger_ui(&swagger_ui()))
        .attach(AdHoc::on_response("CORS", |_, res| {
            Box::pin(async move {
                res.set_header(rocket::http::Header::new(
                    "Access-Control-Allow-Origin",
                    "*",
                ));
            })
        }))
}
