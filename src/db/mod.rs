mod documents;
mod repository;
mod schema;

pub use documents::DocumentDb;
pub use repository::{
    ArticleRepository, DocumentArticleRepository, DocumentUserRepository, UserRepository,
};
pub use schema::{ARTICLES, USERS};
