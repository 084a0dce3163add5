//! Live-or-fallback composition of the analytics queries.
//!
//! Every request takes exactly one of two paths: all live queries succeed
//! within `QUERY_TIMEOUT`, or the canned fixture is returned. Nothing is
//! remembered between requests and nothing is retried.

use std::future::Future;
use std::time::Duration;

use tracing::warn;

use crate::analytics::aggregate::accuracy_percent;
use crate::analytics::fallback::{self, FALLBACK_FIXTURE_VERSION};
use crate::analytics::models::{SystemDashboard, UsageTrends};
use crate::analytics::query::AnalyticsFilter;
use crate::store::{QuestionStore, StoreError, StoreResult};

/// Budget for each individual store query.
pub const QUERY_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataSource {
    Live,
    Fallback,
}

impl DataSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            DataSource::Live => "live",
            DataSource::Fallback => "fallback",
        }
    }
}

/// A payload tagged with where it came from.
#[derive(Debug, Clone, PartialEq)]
pub struct Sourced<T> {
    pub data: T,
    pub source: DataSource,
}

async fn bounded<T>(query: impl Future<Output = StoreResult<T>>) -> StoreResult<T> {
    tokio::time::timeout(QUERY_TIMEOUT, query)
        .await
        .map_err(|_| StoreError::Timeout(QUERY_TIMEOUT))?
}

fn or_fallback<T>(
    result: StoreResult<T>,
    endpoint: &str,
    fallback: impl FnOnce() -> T,
) -> Sourced<T> {
    match result {
        Ok(data) => Sourced {
            data,
            source: DataSource::Live,
        },
        Err(e) => {
            warn!(
                "{endpoint} query failed, serving fallback fixture v{FALLBACK_FIXTURE_VERSION}: {e}"
            );
            Sourced {
                data: fallback(),
                source: DataSource::Fallback,
            }
        }
    }
}

pub async fn live_usage_trends(
    store: &dyn QuestionStore,
    filter: &AnalyticsFilter,
) -> StoreResult<UsageTrends> {
    let questions = &filter.questions;
    let dated = questions.date_only();
    let (active_students, mean, struggles) = tokio::try_join!(
        bounded(store.count_active_students(&filter.activity)),
        bounded(store.average_accuracy(&dated)),
        bounded(store.topic_counts(questions, questions.result_limit())),
    )?;

    Ok(UsageTrends {
        active_students,
        avg_accuracy: accuracy_percent(mean),
        common_struggles: struggles.into_iter().map(Into::into).collect(),
    })
}

pub async fn live_system_dashboard(
    store: &dyn QuestionStore,
    filter: &AnalyticsFilter,
) -> StoreResult<SystemDashboard> {
    let questions = &filter.questions;
    let (categories, top) = tokio::try_join!(
        bounded(store.subject_counts(questions)),
        bounded(store.top_questions(questions, questions.result_limit())),
    )?;

    Ok(SystemDashboard {
        category_distribution: categories.into_iter().map(Into::into).collect(),
        top_questions: top.into_iter().map(Into::into).collect(),
    })
}

pub async fn usage_trends(
    store: &dyn QuestionStore,
    filter: &AnalyticsFilter,
) -> Sourced<UsageTrends> {
    or_fallback(
        live_usage_trends(store, filter).await,
        "usage-trends",
        fallback::usage_trends,
    )
}

pub async fn system_dashboard(
    store: &dyn QuestionStore,
    filter: &AnalyticsFilter,
) -> Sourced<SystemDashboard> {
    or_fallback(
        live_system_dashboard(store, filter).await,
        "system-dashboard",
        fallback::system_dashboard,
    )
}
