use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::models::question::{Question, Subject};

/// One group of a grouped count, e.g. a topic or a subject name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct GroupCount {
    pub key: String,
    pub count: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StruggleTopic {
    pub topic: String,
    pub student_count: i64,
}

/// GET /api/analytics/usage-trends response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageTrends {
    pub active_students: i64,
    pub avg_accuracy: i64,
    pub common_struggles: Vec<StruggleTopic>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryCount {
    pub name: String,
    pub count: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TopQuestion {
    pub text: String,
    pub ask_count: i32,
    pub upvotes: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject: Option<Subject>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub topic: Option<String>,
}

impl From<Question> for TopQuestion {
    fn from(q: Question) -> Self {
        Self {
            text: q.text,
            ask_count: q.ask_count,
            upvotes: q.upvotes,
            subject: Some(q.subject),
            topic: q.topic,
        }
    }
}

/// GET /api/analytics/system-dashboard response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemDashboard {
    pub category_distribution: Vec<CategoryCount>,
    pub top_questions: Vec<TopQuestion>,
}

impl From<GroupCount> for StruggleTopic {
    fn from(g: GroupCount) -> Self {
        Self {
            topic: g.key,
            student_count: g.count,
        }
    }
}

impl From<GroupCount> for CategoryCount {
    fn from(g: GroupCount) -> Self {
        Self {
            name: g.key,
            count: g.count,
        }
    }
}
