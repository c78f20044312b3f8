pub mod funding;
pub mod password;
pub mod slugify;
pub mod token;
