use sqlx::{Pool, Postgres};

pub mod scheduler;

mod user;
pub use user::UserExt;

mod category;
pub use category::CategoryExt;

mod project;
pub use project::ProjectExt;

mod donation;
pub use donation::DonationExt;

mod comment;
pub use comment::CommentExt;

mod rating;
pub use rating::RatingExt;

mod report;
pub use report::ReportExt;

#[derive(Debug, Clone)]
pub struct DBClient {
    pool: Pool<Postgres>,
}
impl DBClient {
    pub fn new(pool: Pool<Postgres>) -> Self {
        DBClient { pool }
    }
}
