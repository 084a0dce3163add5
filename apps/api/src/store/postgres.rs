use async_trait::async_trait;
use sqlx::{PgPool, Postgres, QueryBuilder};
use tracing::debug;
use uuid::Uuid;

use crate::analytics::models::GroupCount;
use crate::analytics::query::{DateWindow, QuestionFilter};
use crate::models::question::{NewQuestion, Question};
use crate::models::user::{NewUser, User, UserRole};
use crate::store::{
    Listing, ListingQuery, QuestionStore, StoreResult, FEATURED_MIN_ASK_COUNT,
    FEATURED_MIN_UPVOTES,
};

/// PostgreSQL-backed store.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn filtered(select: &str, filter: &QuestionFilter) -> QueryBuilder<'static, Postgres> {
    let mut qb = QueryBuilder::new(select);
    qb.push(" WHERE TRUE");
    filter.push_conditions(&mut qb);
    qb
}

fn active_students_query(window: &DateWindow) -> QueryBuilder<'static, Postgres> {
    let mut qb = QueryBuilder::new("SELECT COUNT(*) FROM users WHERE role = ");
    qb.push_bind(UserRole::Student);
    window.push_conditions(&mut qb, "last_active");
    qb
}

fn average_accuracy_query(filter: &QuestionFilter) -> QueryBuilder<'static, Postgres> {
    let mut qb = filtered("SELECT AVG(accuracy_rating)::FLOAT8 FROM questions", filter);
    qb.push(" AND accuracy_rating IS NOT NULL");
    qb
}

/// Ties keep insertion order through `MIN(seq)`.
fn topic_counts_query(filter: &QuestionFilter, limit: i64) -> QueryBuilder<'static, Postgres> {
    let mut qb = filtered("SELECT topic AS key, COUNT(*) AS count FROM questions", filter);
    qb.push(" AND topic IS NOT NULL GROUP BY topic ORDER BY count DESC, MIN(seq) ASC LIMIT ")
        .push_bind(limit);
    qb
}

fn subject_counts_query(filter: &QuestionFilter) -> QueryBuilder<'static, Postgres> {
    let mut qb = filtered(
        "SELECT subject::TEXT AS key, COUNT(*) AS count FROM questions",
        filter,
    );
    qb.push(" GROUP BY subject ORDER BY count DESC, MIN(seq) ASC");
    qb
}

fn top_questions_query(filter: &QuestionFilter, limit: i64) -> QueryBuilder<'static, Postgres> {
    let mut qb = filtered("SELECT * FROM questions", filter);
    qb.push(" ORDER BY ask_count DESC, seq ASC LIMIT ")
        .push_bind(limit);
    qb
}

fn listing_query(query: &ListingQuery) -> QueryBuilder<'static, Postgres> {
    let mut qb = QueryBuilder::<Postgres>::new("SELECT * FROM questions WHERE TRUE");
    let order = match &query.listing {
        Listing::Mine(uid) => {
            qb.push(" AND asked_by = ").push_bind(uid.clone());
            " ORDER BY asked_at DESC, seq DESC"
        }
        Listing::Community { exclude } => {
            // IS DISTINCT FROM keeps anonymous (NULL asker) questions.
            if let Some(uid) = exclude {
                qb.push(" AND asked_by IS DISTINCT FROM ").push_bind(uid.clone());
            }
            " ORDER BY upvotes DESC, asked_at DESC, seq DESC"
        }
        Listing::Featured => {
            qb.push(" AND (upvotes >= ")
                .push_bind(FEATURED_MIN_UPVOTES)
                .push(" OR ask_count >= ")
                .push_bind(FEATURED_MIN_ASK_COUNT)
                .push(")");
            " ORDER BY upvotes DESC, ask_count DESC, asked_at DESC, seq DESC"
        }
    };
    if let Some(subject) = query.subject {
        qb.push(" AND subject = ").push_bind(subject);
    }
    qb.push(order)
        .push(" LIMIT ")
        .push_bind(query.limit)
        .push(" OFFSET ")
        .push_bind(query.skip);
    qb
}

#[async_trait]
impl QuestionStore for PgStore {
    async fn ping(&self) -> StoreResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    async fn count_active_students(&self, window: &DateWindow) -> StoreResult<i64> {
        Ok(active_students_query(window)
            .build_query_scalar::<i64>()
            .fetch_one(&self.pool)
            .await?)
    }

    async fn average_accuracy(&self, filter: &QuestionFilter) -> StoreResult<Option<f64>> {
        Ok(average_accuracy_query(filter)
            .build_query_scalar::<Option<f64>>()
            .fetch_one(&self.pool)
            .await?)
    }

    async fn topic_counts(
        &self,
        filter: &QuestionFilter,
        limit: i64,
    ) -> StoreResult<Vec<GroupCount>> {
        let mut qb = topic_counts_query(filter, limit);
        debug!(sql = qb.sql(), "topic_counts");
        Ok(qb.build_query_as::<GroupCount>().fetch_all(&self.pool).await?)
    }

    async fn subject_counts(&self, filter: &QuestionFilter) -> StoreResult<Vec<GroupCount>> {
        let mut qb = subject_counts_query(filter);
        debug!(sql = qb.sql(), "subject_counts");
        Ok(qb.build_query_as::<GroupCount>().fetch_all(&self.pool).await?)
    }

    async fn top_questions(
        &self,
        filter: &QuestionFilter,
        limit: i64,
    ) -> StoreResult<Vec<Question>> {
        Ok(top_questions_query(filter, limit)
            .build_query_as::<Question>()
            .fetch_all(&self.pool)
            .await?)
    }

    async fn insert_question(&self, q: NewQuestion) -> StoreResult<Question> {
        Ok(sqlx::query_as::<_, Question>(
            r#"
            INSERT INTO questions
                (id, text, subject, topic, answer, ask_count, upvotes, accuracy_rating, asked_by)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&q.text)
        .bind(q.subject)
        .bind(&q.topic)
        .bind(&q.answer)
        .bind(q.ask_count)
        .bind(q.upvotes)
        .bind(q.accuracy_rating)
        .bind(&q.asked_by)
        .fetch_one(&self.pool)
        .await?)
    }

    async fn record_submission(&self, q: NewQuestion) -> StoreResult<Question> {
        if let Some(asked_by) = &q.asked_by {
            // Single-statement increment: concurrent repeats cannot lose updates.
            let repeated: Option<Question> = sqlx::query_as(
                r#"
                UPDATE questions
                SET ask_count = ask_count + 1,
                    answer = COALESCE($1, answer),
                    topic = COALESCE($2, topic),
                    asked_at = NOW()
                WHERE id = (
                    SELECT id FROM questions
                    WHERE asked_by = $3 AND subject = $4 AND text = $5
                    ORDER BY seq ASC
                    LIMIT 1
                )
                RETURNING *
                "#,
            )
            .bind(&q.answer)
            .bind(&q.topic)
            .bind(asked_by)
            .bind(q.subject)
            .bind(&q.text)
            .fetch_optional(&self.pool)
            .await?;

            if let Some(question) = repeated {
                debug!(
                    "Repeat submission of question {} (ask_count={})",
                    question.id, question.ask_count
                );
                return Ok(question);
            }
        }
        self.insert_question(q).await
    }

    async fn upvote(&self, id: Uuid) -> StoreResult<Option<Question>> {
        Ok(sqlx::query_as::<_, Question>(
            "UPDATE questions SET upvotes = upvotes + 1 WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?)
    }

    async fn list_questions(&self, query: &ListingQuery) -> StoreResult<Vec<Question>> {
        Ok(listing_query(query)
            .build_query_as::<Question>()
            .fetch_all(&self.pool)
            .await?)
    }

    async fn question_count(&self) -> StoreResult<i64> {
        Ok(sqlx::query_scalar("SELECT COUNT(*) FROM questions")
            .fetch_one(&self.pool)
            .await?)
    }

    async fn insert_user(&self, u: NewUser) -> StoreResult<User> {
        Ok(sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (id, external_id, email, role, last_active)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&u.external_id)
        .bind(&u.email)
        .bind(u.role)
        .bind(u.last_active)
        .fetch_one(&self.pool)
        .await?)
    }
}
