pub mod account_route;
pub mod movie_route;
pub mod reservation_route;
pub mod showtime_route;
