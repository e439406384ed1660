pub mod movie;
pub mod reservation;
pub mod showtime;
pub mod user;
