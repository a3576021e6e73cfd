mod articles;
mod users;

pub use articles::{clamp_limit, ArticleService, IngestReport, DEFAULT_LIMIT, MAX_LIMIT};
pub use users::UserService;
