mod qiita;
mod zenn;

use async_trait::async_trait;

use crate::error::Result;
use crate::models::Article;

pub use qiita::QiitaFetcher;
pub use zenn::ZennFetcher;

/// One external content platform.
#[async_trait]
pub trait ArticleSource: Send + Sync {
    /// Platform name, stored as the `source` of every article it returns.
    fn name(&self) -> &'static str;

    /// Articles for `tag`, already normalized. An empty tag means unfiltered.
    async fn fetch(&self, tag: &str) -> Result<Vec<Article>>;
}
