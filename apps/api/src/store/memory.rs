use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::analytics::aggregate::{group_counts, mean_rating, top_by_ask_count};
use crate::analytics::models::GroupCount;
use crate::analytics::query::{DateWindow, QuestionFilter};
use crate::models::question::{NewQuestion, Question};
use crate::models::user::{NewUser, User, UserRole};
use crate::store::{
    Listing, ListingQuery, QuestionStore, StoreError, StoreResult, FEATURED_MIN_ASK_COUNT,
    FEATURED_MIN_UPVOTES,
};

#[derive(Default)]
struct Tables {
    /// Kept in insertion order.
    questions: Vec<Question>,
    users: Vec<User>,
    next_seq: i64,
}

/// In-process store with the same ordering and filtering rules as `PgStore`.
///
/// In tests, `set_available(false)` makes every call fail with
/// `StoreError::Unavailable` and `with_latency` delays every call, which is how
/// query timeouts are exercised.
pub struct MemoryStore {
    tables: RwLock<Tables>,
    available: AtomicBool,
    latency: Duration,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            tables: RwLock::new(Tables::default()),
            available: AtomicBool::new(true),
            latency: Duration::ZERO,
        }
    }

    #[cfg(test)]
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    #[cfg(test)]
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    async fn enter(&self) -> StoreResult<()> {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        if self.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(StoreError::Unavailable)
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

fn to_limit(limit: i64) -> usize {
    usize::try_from(limit).unwrap_or(0)
}

#[async_trait]
impl QuestionStore for MemoryStore {
    async fn ping(&self) -> StoreResult<()> {
        self.enter().await
    }

    async fn count_active_students(&self, window: &DateWindow) -> StoreResult<i64> {
        self.enter().await?;
        let tables = self.tables.read().await;
        let count = tables
            .users
            .iter()
            .filter(|u| u.role == UserRole::Student && window.contains(u.last_active))
            .count();
        Ok(count as i64)
    }

    async fn average_accuracy(&self, filter: &QuestionFilter) -> StoreResult<Option<f64>> {
        self.enter().await?;
        let tables = self.tables.read().await;
        Ok(mean_rating(
            tables
                .questions
                .iter()
                .filter(|q| filter.matches(q))
                .filter_map(|q| q.accuracy_rating),
        ))
    }

    async fn topic_counts(
        &self,
        filter: &QuestionFilter,
        limit: i64,
    ) -> StoreResult<Vec<GroupCount>> {
        self.enter().await?;
        let tables = self.tables.read().await;
        let mut groups = group_counts(
            tables
                .questions
                .iter()
                .filter(|q| filter.matches(q))
                .filter_map(|q| q.topic.as_deref()),
        );
        groups.truncate(to_limit(limit));
        Ok(groups)
    }

    async fn subject_counts(&self, filter: &QuestionFilter) -> StoreResult<Vec<GroupCount>> {
        self.enter().await?;
        let tables = self.tables.read().await;
        Ok(group_counts(
            tables
                .questions
                .iter()
                .filter(|q| filter.matches(q))
                .map(|q| q.subject.as_str()),
        ))
    }

    async fn top_questions(
        &self,
        filter: &QuestionFilter,
        limit: i64,
    ) -> StoreResult<Vec<Question>> {
        self.enter().await?;
        let tables = self.tables.read().await;
        Ok(top_by_ask_count(
            tables.questions.iter().filter(|q| filter.matches(q)),
            to_limit(limit),
        ))
    }

    async fn insert_question(&self, q: NewQuestion) -> StoreResult<Question> {
        self.enter().await?;
        let mut tables = self.tables.write().await;
        tables.next_seq += 1;
        let now = Utc::now();
        let question = Question {
            id: Uuid::new_v4(),
            seq: tables.next_seq,
            text: q.text,
            subject: q.subject,
            topic: q.topic,
            answer: q.answer,
            ask_count: q.ask_count,
            upvotes: q.upvotes,
            accuracy_rating: q.accuracy_rating,
            asked_by: q.asked_by,
            asked_at: now,
            created_at: now,
        };
        tables.questions.push(question.clone());
        Ok(question)
    }

    async fn record_submission(&self, q: NewQuestion) -> StoreResult<Question> {
        self.enter().await?;
        if let Some(asked_by) = &q.asked_by {
            let mut tables = self.tables.write().await;
            let existing = tables.questions.iter_mut().find(|e| {
                e.asked_by.as_deref() == Some(asked_by.as_str())
                    && e.subject == q.subject
                    && e.text == q.text
            });
            if let Some(existing) = existing {
                existing.ask_count += 1;
                existing.asked_at = Utc::now();
                if q.answer.is_some() {
                    existing.answer = q.answer.clone();
                }
                if q.topic.is_some() {
                    existing.topic = q.topic.clone();
                }
                return Ok(existing.clone());
            }
        }
        self.insert_question(q).await
    }

    async fn upvote(&self, id: Uuid) -> StoreResult<Option<Question>> {
        self.enter().await?;
        let mut tables = self.tables.write().await;
        Ok(tables.questions.iter_mut().find(|q| q.id == id).map(|q| {
            q.upvotes += 1;
            q.clone()
        }))
    }

    async fn list_questions(&self, query: &ListingQuery) -> StoreResult<Vec<Question>> {
        self.enter().await?;
        let tables = self.tables.read().await;
        let mut selected: Vec<&Question> = tables
            .questions
            .iter()
            .filter(|q| query.subject.map_or(true, |s| q.subject == s))
            .filter(|q| match &query.listing {
                Listing::Mine(uid) => q.asked_by.as_deref() == Some(uid.as_str()),
                Listing::Community { exclude } => {
                    exclude.is_none() || q.asked_by.as_deref() != exclude.as_deref()
                }
                Listing::Featured => {
                    q.upvotes >= FEATURED_MIN_UPVOTES || q.ask_count >= FEATURED_MIN_ASK_COUNT
                }
            })
            .collect();

        let newest = |a: &&Question, b: &&Question| {
            b.asked_at.cmp(&a.asked_at).then(b.seq.cmp(&a.seq))
        };
        match query.listing {
            Listing::Mine(_) => selected.sort_by(newest),
            Listing::Community { .. } => {
                selected.sort_by(|a, b| b.upvotes.cmp(&a.upvotes).then_with(|| newest(a, b)))
            }
            Listing::Featured => selected.sort_by(|a, b| {
                b.upvotes
                    .cmp(&a.upvotes)
                    .then(b.ask_count.cmp(&a.ask_count))
                    .then_with(|| newest(a, b))
            }),
        }

        Ok(selected
            .into_iter()
            .skip(to_limit(query.skip))
            .take(to_limit(query.limit))
            .cloned()
            .collect())
    }

    async fn question_count(&self) -> StoreResult<i64> {
        self.enter().await?;
        Ok(self.tables.read().await.questions.len() as i64)
    }

    async fn insert_user(&self, u: NewUser) -> StoreResult<User> {
        self.enter().await?;
        let user = User {
            id: Uuid::new_v4(),
            external_id: u.external_id,
            email: u.email,
            role: u.role,
            last_active: u.last_active,
        };
        self.tables.write().await.users.push(user.clone());
        Ok(user)
    }
}
