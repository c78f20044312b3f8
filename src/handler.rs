pub mod auth;
pub mod category;
pub mod comment;
pub mod donation;
pub mod project;
pub mod rating;
pub mod report;
pub mod users;
