//! Axum route handlers for the student question API.

use axum::{extract::State, http::StatusCode, Json};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{error, info};
use uuid::Uuid;

use crate::auth::{AuthUser, MaybeUser};
use crate::errors::AppError;
use crate::extract::{ValidJson, ValidPath, ValidQuery};
use crate::models::question::{NewQuestion, Question, Subject};
use crate::store::Listing;
use crate::student::answer::generate_answer;
use crate::student::validation::{ListingParams, SubmitQuestionRequest};
use crate::state::AppState;

// ────────────────────────────────────────────────────────────────────────────
// Response types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitQuestionResponse {
    pub success: bool,
    pub question: String,
    pub answer: String,
    pub subject: Subject,
    pub topic: Option<String>,
    /// `None` when the answer was generated but could not be persisted.
    pub question_id: Option<Uuid>,
    pub timestamp: DateTime<Utc>,
}

/// A question as shown in the student listings.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionView {
    pub id: Uuid,
    pub text: String,
    pub subject: Subject,
    pub topic: Option<String>,
    pub answer: Option<String>,
    pub asked_at: DateTime<Utc>,
    pub ask_count: i32,
    pub upvotes: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub asked_by: Option<String>,
}

impl QuestionView {
    fn new(q: Question, asked_by: Option<String>) -> Self {
        Self {
            id: q.id,
            text: q.text,
            subject: q.subject,
            topic: q.topic,
            answer: q.answer,
            asked_at: q.asked_at,
            ask_count: q.ask_count,
            upvotes: q.upvotes,
            asked_by,
        }
    }

    /// Listing view without the asker.
    fn private(q: Question) -> Self {
        Self::new(q, None)
    }

    /// Listing view with the asker anonymised.
    fn anonymised(q: Question) -> Self {
        let asked_by = q.asked_by.as_ref().map(|_| "community".to_string());
        Self::new(q, asked_by)
    }
}

#[derive(Debug, Serialize)]
pub struct QuestionListResponse {
    pub success: bool,
    pub questions: Vec<QuestionView>,
    pub count: usize,
}

impl QuestionListResponse {
    fn new(questions: Vec<QuestionView>) -> Self {
        Self {
            success: true,
            count: questions.len(),
            questions,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpvoteResponse {
    pub success: bool,
    pub question_id: Uuid,
    pub upvotes: i32,
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// POST /api/student/question
///
/// Generates an answer and persists the question. A persistence failure is
/// logged and the answer is still returned, with `questionId: null`.
pub async fn handle_submit_question(
    State(state): State<AppState>,
    MaybeUser(user): MaybeUser,
    ValidJson(request): ValidJson<SubmitQuestionRequest>,
) -> Result<(StatusCode, Json<SubmitQuestionResponse>), AppError> {
    let valid = request.validate()?;

    let answer = generate_answer(
        state.llm.as_ref(),
        valid.subject,
        &valid.text,
        valid.topic.as_deref(),
    )
    .await?;

    let submission = NewQuestion::submitted(
        valid.text.clone(),
        valid.subject,
        valid.topic.clone(),
        answer.clone(),
        user.map(|u| u.uid),
    );

    let (question_id, timestamp) = match state.store.record_submission(submission).await {
        Ok(saved) => {
            info!(
                "Saved question {} ({}, ask_count={})",
                saved.id, saved.subject, saved.ask_count
            );
            (Some(saved.id), saved.asked_at)
        }
        Err(e) => {
            error!("Failed to persist question, returning answer anyway: {e}");
            (None, Utc::now())
        }
    };

    Ok((
        StatusCode::CREATED,
        Json(SubmitQuestionResponse {
            success: true,
            question: valid.text,
            answer,
            subject: valid.subject,
            topic: valid.topic,
            question_id,
            timestamp,
        }),
    ))
}

/// POST /api/student/question/:id/upvote
pub async fn handle_upvote(
    State(state): State<AppState>,
    ValidPath(id): ValidPath<Uuid>,
) -> Result<Json<UpvoteResponse>, AppError> {
    let question = state
        .store
        .upvote(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Question {id} not found")))?;
    Ok(Json(UpvoteResponse {
        success: true,
        question_id: question.id,
        upvotes: question.upvotes,
    }))
}

/// GET /api/student/questions/my
pub async fn handle_my_questions(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    ValidQuery(params): ValidQuery<ListingParams>,
) -> Result<Json<QuestionListResponse>, AppError> {
    let query = params.into_query(Listing::Mine(user.uid))?;
    let questions = state.store.list_questions(&query).await?;
    Ok(Json(QuestionListResponse::new(
        questions.into_iter().map(QuestionView::private).collect(),
    )))
}

/// GET /api/student/questions/community
pub async fn handle_community_questions(
    State(state): State<AppState>,
    MaybeUser(user): MaybeUser,
    ValidQuery(params): ValidQuery<ListingParams>,
) -> Result<Json<QuestionListResponse>, AppError> {
    let query = params.into_query(Listing::Community {
        exclude: user.map(|u| u.uid),
    })?;
    let questions = state.store.list_questions(&query).await?;
    Ok(Json(QuestionListResponse::new(
        questions.into_iter().map(QuestionView::anonymised).collect(),
    )))
}

/// GET /api/student/questions/featured
pub async fn handle_featured_questions(
    State(state): State<AppState>,
    ValidQuery(params): ValidQuery<ListingParams>,
) -> Result<Json<QuestionListResponse>, AppError> {
    let query = params.into_query(Listing::Featured)?;
    let questions = state.store.list_questions(&query).await?;
    Ok(Json(QuestionListResponse::new(
        questions.into_iter().map(QuestionView::private).collect(),
    )))
}
