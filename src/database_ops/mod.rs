pub mod db;
pub mod movies;
pub mod postgrest;
pub mod tmdb;
