//! Ownership rules for mutating actions.
//!
//! Authentication is handled by the [`CurrentUser`] extractor; once a handler
//! has a user and has loaded its target, it asks here whether the user may
//! change it. Reactions and gifts have no owner check: any signed-in user may
//! like, dislike or send a gift.

use crate::db::models::{Comment, Post, Profile};
use crate::error::{AppError, AppResult};
use crate::extractors::CurrentUser;

/// An entity that belongs to exactly one user.
pub trait Owned {
    fn owner_id(&self) -> i64;
}

impl Owned for Post {
    fn owner_id(&self) -> i64 {
        self.author_id
    }
}

impl Owned for Comment {
    fn owner_id(&self) -> i64 {
        self.author_id
    }
}

impl Owned for Profile {
    fn owner_id(&self) -> i64 {
        self.user_id
    }
}

pub fn is_owner<T: Owned>(user: &CurrentUser, target: &T) -> bool {
    user.id == target.owner_id()
}

/// `Forbidden` unless `user` owns `target`.
pub fn ensure_owner<T: Owned>(user: &CurrentUser, target: &T) -> AppResult<()> {
    if is_owner(user, target) {
        Ok(())
    } else {
        tracing::warn!(
            user_id = user.id,
            owner_id = target.owner_id(),
            "Rejected change to another user's {}",
            std::any::type_name::<T>().rsplit("::").next().unwrap_or("entity")
        );
        Err(AppError::Forbidden)
    }
}
