use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Fixed classification of a homework question. Doubles as the analytics "category".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "subject")]
pub enum Subject {
    Math,
    Science,
    English,
    History,
    Other,
}

impl Subject {
    pub const ALL: [Subject; 5] = [
        Subject::Math,
        Subject::Science,
        Subject::English,
        Subject::History,
        Subject::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Subject::Math => "Math",
            Subject::Science => "Science",
            Subject::English => "English",
            Subject::History => "History",
            Subject::Other => "Other",
        }
    }

    /// Comma-separated list of accepted values, used in validation messages.
    pub fn valid_values() -> String {
        Self::ALL
            .iter()
            .map(Subject::as_str)
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl fmt::Display for Subject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownSubject(pub String);

impl fmt::Display for UnknownSubject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Subject must be one of: {} (got '{}')",
            Subject::valid_values(),
            self.0
        )
    }
}

impl FromStr for Subject {
    type Err = UnknownSubject;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Subject::ALL
            .into_iter()
            .find(|subject| subject.as_str() == s)
            .ok_or_else(|| UnknownSubject(s.to_string()))
    }
}

/// A persisted question/answer pair.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    pub id: Uuid,
    /// Insertion order, used to break ties in rankings.
    #[serde(skip)]
    pub seq: i64,
    pub text: String,
    pub subject: Subject,
    pub topic: Option<String>,
    pub answer: Option<String>,
    pub ask_count: i32,
    pub upvotes: i32,
    pub accuracy_rating: Option<i32>,
    pub asked_by: Option<String>,
    pub asked_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

/// Insert payload for a question.
#[derive(Debug, Clone)]
pub struct NewQuestion {
    pub text: String,
    pub subject: Subject,
    pub topic: Option<String>,
    pub answer: Option<String>,
    pub ask_count: i32,
    pub upvotes: i32,
    pub accuracy_rating: Option<i32>,
    pub asked_by: Option<String>,
}

impl NewQuestion {
    /// A first-time student submission: asked once, no upvotes, unrated.
    pub fn submitted(
        text: String,
        subject: Subject,
        topic: Option<String>,
        answer: String,
        asked_by: Option<String>,
    ) -> Self {
        Self {
            text,
            subject,
            topic,
            answer: Some(answer),
            ask_count: 1,
            upvotes: 0,
            accuracy_rating: None,
            asked_by,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subject_parses_exact_names_only() {
        assert_eq!("Math".parse::<Subject>(), Ok(Subject::Math));
        assert_eq!("Other".parse::<Subject>(), Ok(Subject::Other));
        assert!("math".parse::<Subject>().is_err());
        assert!("InvalidSubject".parse::<Subject>().is_err());
    }

    #[test]
    fn test_unknown_subject_message_names_valid_values() {
        let err = "Geography".parse::<Subject>().unwrap_err();
        let message = err.to_string();
        for subject in Subject::ALL {
            assert!(message.contains(subject.as_str()), "missing {subject}");
        }
    }

    #[test]
    fn test_subject_serializes_as_name() {
        let json = serde_json::to_string(&Subject::Science).unwrap();
        assert_eq!(json, "\"Science\"");
    }
}
