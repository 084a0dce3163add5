//! Request schemas for the student endpoints, validated at the boundary.

use serde::Deserialize;

use crate::errors::AppError;
use crate::models::question::Subject;
use crate::store::{Listing, ListingQuery};

pub const MAX_QUESTION_CHARS: usize = 2000;
pub const MAX_TOPIC_CHARS: usize = 100;
pub const DEFAULT_PAGE_SIZE: i64 = 50;
pub const MAX_PAGE_SIZE: i64 = 100;

/// POST /api/student/question body. `question` and `text` are aliases;
/// `question` wins when both are sent.
#[derive(Debug, Default, Deserialize)]
pub struct SubmitQuestionRequest {
    pub question: Option<String>,
    pub text: Option<String>,
    pub subject: Option<String>,
    pub topic: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ValidQuestion {
    pub text: String,
    pub subject: Subject,
    pub topic: Option<String>,
}

impl SubmitQuestionRequest {
    pub fn validate(self) -> Result<ValidQuestion, AppError> {
        let text = self
            .question
            .or(self.text)
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .ok_or_else(|| AppError::Validation("Question text is required".to_string()))?;
        if text.chars().count() > MAX_QUESTION_CHARS {
            return Err(AppError::Validation(format!(
                "Question text must be at most {MAX_QUESTION_CHARS} characters"
            )));
        }

        let subject = self
            .subject
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .ok_or_else(|| AppError::Validation("Subject is required".to_string()))?;
        let subject = subject
            .parse::<Subject>()
            .map_err(|e| AppError::Validation(e.to_string()))?;

        let topic = self
            .topic
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty());
        if let Some(topic) = &topic {
            if topic.chars().count() > MAX_TOPIC_CHARS {
                return Err(AppError::Validation(format!(
                    "Topic must be at most {MAX_TOPIC_CHARS} characters"
                )));
            }
        }

        Ok(ValidQuestion {
            text,
            subject,
            topic,
        })
    }
}

/// Query string for the question listings.
#[derive(Debug, Default, Deserialize)]
pub struct ListingParams {
    pub subject: Option<String>,
    pub limit: Option<i64>,
    pub skip: Option<i64>,
}

impl ListingParams {
    pub fn into_query(self, listing: Listing) -> Result<ListingQuery, AppError> {
        let subject = match self.subject.as_deref().map(str::trim) {
            None | Some("") | Some("all") => None,
            Some(s) => Some(
                s.parse::<Subject>()
                    .map_err(|e| AppError::Validation(e.to_string()))?,
            ),
        };
        let limit = self.limit.unwrap_or(DEFAULT_PAGE_SIZE);
        if limit < 1 {
            return Err(AppError::Validation("limit must be at least 1".to_string()));
        }
        let skip = self.skip.unwrap_or(0);
        if skip < 0 {
            return Err(AppError::Validation("skip must not be negative".to_string()));
        }
        Ok(ListingQuery {
            listing,
            subject,
            limit: limit.min(MAX_PAGE_SIZE),
            skip,
        })
    }
}
