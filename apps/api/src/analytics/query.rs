//! Query Builder: turns dashboard filter parameters into a typed question filter.
//!
//! A `QuestionFilter` has two renderings that must agree: `push_conditions`
//! appends parameterised SQL to a `QueryBuilder`, and `matches` evaluates the
//! same predicate against an in-memory `Question`. Absent filters mean "no
//! constraint"; present filters combine with AND.

use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
use serde::Deserialize;
use sqlx::{Postgres, QueryBuilder};

use crate::errors::AppError;
use crate::models::question::{Question, Subject};

/// Result cap for ranked lists without a search term.
pub const DEFAULT_RESULT_LIMIT: i64 = 5;
/// Result cap under an active search, leaving the caller room to narrow further.
pub const SEARCH_RESULT_LIMIT: i64 = 20;
/// Activity window used for active-student counts when no date range is given.
pub const DEFAULT_ACTIVITY_WINDOW_HOURS: i64 = 24;
const MAX_SEARCH_LEN: usize = 200;

/// Raw query-string parameters shared by the analytics endpoints.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsParams {
    pub date_range: Option<String>,
    pub category: Option<String>,
    pub search: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateRange {
    Last7Days,
    Last30Days,
    All,
    Custom {
        start: DateTime<Utc>,
        end: Option<DateTime<Utc>>,
    },
}

impl DateRange {
    /// The inclusive time window this range covers, relative to `now`.
    pub fn window(&self, now: DateTime<Utc>) -> DateWindow {
        match *self {
            DateRange::Last7Days => DateWindow::since(now - Duration::days(7)),
            DateRange::Last30Days => DateWindow::since(now - Duration::days(30)),
            DateRange::All => DateWindow::unbounded(),
            DateRange::Custom { start, end } => DateWindow {
                start: Some(start),
                end,
            },
        }
    }
}

/// Inclusive time window; `None` on either side means unbounded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DateWindow {
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
}

impl DateWindow {
    pub fn unbounded() -> Self {
        Self::default()
    }

    pub fn since(start: DateTime<Utc>) -> Self {
        Self {
            start: Some(start),
            end: None,
        }
    }

    pub fn contains(&self, ts: DateTime<Utc>) -> bool {
        self.start.map_or(true, |start| ts >= start) && self.end.map_or(true, |end| ts <= end)
    }

    /// Appends `AND column >= $n [AND column <= $m]` for the bounded sides.
    pub fn push_conditions(&self, qb: &mut QueryBuilder<'_, Postgres>, column: &str) {
        if let Some(start) = self.start {
            qb.push(format!(" AND {column} >= ")).push_bind(start);
        }
        if let Some(end) = self.end {
            qb.push(format!(" AND {column} <= ")).push_bind(end);
        }
    }
}

/// Predicate over question documents.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QuestionFilter {
    pub window: DateWindow,
    pub subject: Option<Subject>,
    /// Trimmed, non-empty search term.
    pub search: Option<String>,
}

impl QuestionFilter {
    /// A filter with only the date predicate of `self`.
    pub fn date_only(&self) -> Self {
        Self {
            window: self.window,
            ..Self::default()
        }
    }

    pub fn result_limit(&self) -> i64 {
        if self.search.is_some() {
            SEARCH_RESULT_LIMIT
        } else {
            DEFAULT_RESULT_LIMIT
        }
    }

    pub fn matches(&self, question: &Question) -> bool {
        if !self.window.contains(question.created_at) {
            return false;
        }
        if let Some(subject) = self.subject {
            if question.subject != subject {
                return false;
            }
        }
        if let Some(search) = &self.search {
            let needle = search.to_lowercase();
            let in_topic = question
                .topic
                .as_deref()
                .is_some_and(|t| t.to_lowercase().contains(&needle));
            let in_text = question.text.to_lowercase().contains(&needle);
            if !in_topic && !in_text {
                return false;
            }
        }
        true
    }

    /// Appends the predicate as `AND ...` clauses. The caller must already have
    /// pushed a `WHERE` (e.g. `WHERE TRUE`).
    pub fn push_conditions(&self, qb: &mut QueryBuilder<'_, Postgres>) {
        self.window.push_conditions(qb, "created_at");
        if let Some(subject) = self.subject {
            qb.push(" AND subject = ").push_bind(subject);
        }
        if let Some(search) = &self.search {
            let pattern = like_pattern(search);
            qb.push(" AND (topic ILIKE ")
                .push_bind(pattern.clone())
                .push(" OR text ILIKE ")
                .push_bind(pattern)
                .push(")");
        }
    }
}

/// Resolved analytics filter: the question predicate plus the user-activity
/// window used for active-student counts.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalyticsFilter {
    pub questions: QuestionFilter,
    pub activity: DateWindow,
}

impl AnalyticsParams {
    pub fn into_filter(self, now: DateTime<Utc>) -> Result<AnalyticsFilter, AppError> {
        let range = parse_date_range(
            non_empty(self.date_range.as_deref()),
            non_empty(self.start_date.as_deref()),
            non_empty(self.end_date.as_deref()),
        )?;

        let subject = match non_empty(self.category.as_deref()) {
            None => None,
            Some(c) if c.eq_ignore_ascii_case("all") => None,
            Some(c) => Some(c.parse::<Subject>().map_err(|_| {
                AppError::Validation(format!(
                    "category must be 'all' or one of: {}",
                    Subject::valid_values()
                ))
            })?),
        };

        let search = non_empty(self.search.as_deref()).map(str::to_string);
        if let Some(s) = &search {
            if s.chars().count() > MAX_SEARCH_LEN {
                return Err(AppError::Validation(format!(
                    "search must be at most {MAX_SEARCH_LEN} characters"
                )));
            }
        }

        let (window, activity) = match range {
            Some(range) => {
                let window = range.window(now);
                (window, window)
            }
            None => (
                DateWindow::unbounded(),
                DateWindow::since(now - Duration::hours(DEFAULT_ACTIVITY_WINDOW_HOURS)),
            ),
        };

        Ok(AnalyticsFilter {
            questions: QuestionFilter {
                window,
                subject,
                search,
            },
            activity,
        })
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

fn parse_date_range(
    range: Option<&str>,
    start: Option<&str>,
    end: Option<&str>,
) -> Result<Option<DateRange>, AppError> {
    let Some(range) = range else {
        return Ok(None);
    };
    let parsed = match range {
        "7days" => DateRange::Last7Days,
        "30days" => DateRange::Last30Days,
        "all" => DateRange::All,
        "custom" => {
            let start = start
                .ok_or_else(|| {
                    AppError::Validation("dateRange=custom requires startDate".to_string())
                })
                .and_then(|s| parse_bound(s, false))?;
            let end = end.map(|e| parse_bound(e, true)).transpose()?;
            if let Some(end) = end {
                if end < start {
                    return Err(AppError::Validation(
                        "endDate must not be before startDate".to_string(),
                    ));
                }
            }
            DateRange::Custom { start, end }
        }
        other => {
            return Err(AppError::Validation(format!(
                "dateRange must be one of: 7days, 30days, all, custom (got '{other}')"
            )))
        }
    };
    Ok(Some(parsed))
}

/// Accepts RFC 3339 timestamps or plain `YYYY-MM-DD` dates. A plain date used
/// as an upper bound covers the whole day.
fn parse_bound(value: &str, end_of_day: bool) -> Result<DateTime<Utc>, AppError> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(value) {
        return Ok(ts.with_timezone(&Utc));
    }
    let invalid = || AppError::Validation(format!("invalid date '{value}'"));
    let date = NaiveDate::parse_from_str(value, "%Y-%m-%d").map_err(|_| invalid())?;
    let naive = if end_of_day {
        date.and_hms_milli_opt(23, 59, 59, 999)
    } else {
        date.and_hms_opt(0, 0, 0)
    }
    .ok_or_else(invalid)?;
    Ok(Utc.from_utc_datetime(&naive))
}

/// `%term%` with LIKE metacharacters escaped (backslash is Postgres' default escape).
pub fn like_pattern(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len() + 2);
    escaped.push('%');
    for c in term.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    escaped
}
