pub mod credits;
pub mod movie;
