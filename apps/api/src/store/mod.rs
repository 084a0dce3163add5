//! Persistence seam for questions and users.
//!
//! `PgStore` is the production backend; `MemoryStore` implements the same
//! contract in process for tests and database-less local runs. Handlers only
//! ever see `Arc<dyn QuestionStore>`.

pub mod memory;
pub mod postgres;

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::analytics::models::GroupCount;
use crate::analytics::query::{DateWindow, QuestionFilter};
use crate::models::question::{NewQuestion, Question, Subject};
use crate::models::user::{NewUser, User};

pub use memory::MemoryStore;
pub use postgres::PgStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Query exceeded {0:?}")]
    Timeout(Duration),

    #[error("Store unavailable")]
    Unavailable,
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Which slice of the question collection a listing covers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Listing {
    /// Questions asked by this uid, newest first.
    Mine(String),
    /// Everyone else's questions (all questions when `exclude` is `None`),
    /// most upvoted first, then newest.
    Community { exclude: Option<String> },
    /// Popular questions: upvotes >= 5 or ask count >= 3.
    Featured,
}

pub const FEATURED_MIN_UPVOTES: i32 = 5;
pub const FEATURED_MIN_ASK_COUNT: i32 = 3;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingQuery {
    pub listing: Listing,
    pub subject: Option<Subject>,
    pub limit: i64,
    pub skip: i64,
}

#[async_trait]
pub trait QuestionStore: Send + Sync {
    /// Cheap connectivity probe.
    async fn ping(&self) -> StoreResult<()>;

    /// Students whose last activity falls inside `window`.
    async fn count_active_students(&self, window: &DateWindow) -> StoreResult<i64>;

    /// Mean accuracy rating over rated questions matching `filter`.
    async fn average_accuracy(&self, filter: &QuestionFilter) -> StoreResult<Option<f64>>;

    /// Per-topic question counts (topic present), ranked, at most `limit` groups.
    async fn topic_counts(&self, filter: &QuestionFilter, limit: i64)
        -> StoreResult<Vec<GroupCount>>;

    /// Per-subject question counts, ranked, unlimited.
    async fn subject_counts(&self, filter: &QuestionFilter) -> StoreResult<Vec<GroupCount>>;

    /// Questions ranked by ask count, at most `limit`.
    async fn top_questions(&self, filter: &QuestionFilter, limit: i64)
        -> StoreResult<Vec<Question>>;

    async fn insert_question(&self, question: NewQuestion) -> StoreResult<Question>;

    /// Records a student submission. When the same (non-anonymous) user has
    /// already asked the same text under the same subject, that question's ask
    /// count is incremented in place and its answer refreshed; otherwise a new
    /// question is inserted.
    async fn record_submission(&self, question: NewQuestion) -> StoreResult<Question>;

    /// Increments upvotes; `None` when no such question exists.
    async fn upvote(&self, id: Uuid) -> StoreResult<Option<Question>>;

    async fn list_questions(&self, query: &ListingQuery) -> StoreResult<Vec<Question>>;

    async fn question_count(&self) -> StoreResult<i64>;

    async fn insert_user(&self, user: NewUser) -> StoreResult<User>;
}
