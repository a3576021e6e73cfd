use std::sync::Arc;

use crate::db::UserRepository;
use crate::error::Result;
use crate::models::User;

pub struct UserService {
    repo: Arc<dyn UserRepository>,
}

impl UserService {
    pub fn new(repo: Arc<dyn UserRepository>) -> Self {
        Self { repo }
    }

    pub async fn get_user(&self, user_id: &str) -> Result<Option<User>> {
        self.repo.get(user_id).await
    }

    pub async fn set_user_tags(&self, user_id: &str, tags: Vec<String>) -> Result<User> {
        self.repo.set_tags(user_id, tags).await
    }
}
