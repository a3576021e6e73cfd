mod article;
mod user;

pub use article::{normalize_timestamp, zero_timestamp, Article};
pub use user::{TagsUpdate, User};
