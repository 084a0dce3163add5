//! In-process aggregation primitives.
//!
//! These mirror the grouped SQL queries in `store::postgres` and back the
//! in-memory store. Ordering rule everywhere: count descending, ties broken by
//! first appearance in insertion order.

use std::collections::HashMap;

use crate::analytics::models::GroupCount;
use crate::models::question::Question;

/// Counts occurrences of each key, sorted by count descending. Keys with equal
/// counts keep the order in which they were first seen.
pub fn group_counts<'a, I>(keys: I) -> Vec<GroupCount>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut index: HashMap<&str, usize> = HashMap::new();
    let mut groups: Vec<GroupCount> = Vec::new();
    for key in keys {
        match index.get(key) {
            Some(&i) => groups[i].count += 1,
            None => {
                index.insert(key, groups.len());
                groups.push(GroupCount {
                    key: key.to_string(),
                    count: 1,
                });
            }
        }
    }
    // sort_by is stable, so first-seen order survives among ties
    groups.sort_by(|a, b| b.count.cmp(&a.count));
    groups
}

/// Questions ranked by ask count descending, insertion order on ties, truncated to `limit`.
/// `questions` must already be in insertion order.
pub fn top_by_ask_count<'a, I>(questions: I, limit: usize) -> Vec<Question>
where
    I: IntoIterator<Item = &'a Question>,
{
    let mut ranked: Vec<&Question> = questions.into_iter().collect();
    ranked.sort_by(|a, b| b.ask_count.cmp(&a.ask_count));
    ranked.into_iter().take(limit).cloned().collect()
}

/// Mean of the present ratings, or `None` when there are none.
pub fn mean_rating<I>(ratings: I) -> Option<f64>
where
    I: IntoIterator<Item = i32>,
{
    let (sum, n) = ratings
        .into_iter()
        .fold((0i64, 0i64), |(sum, n), r| (sum + i64::from(r), n + 1));
    (n > 0).then(|| sum as f64 / n as f64)
}

/// Rounds a mean rating into the reported 0–100 integer. No ratings reports 0.
pub fn accuracy_percent(mean: Option<f64>) -> i64 {
    match mean {
        Some(m) if m.is_finite() => (m.round() as i64).clamp(0, 100),
        _ => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::question::Subject;
    use chrono::Utc;
    use uuid::Uuid;

    fn question(seq: i64, ask_count: i32) -> Question {
        Question {
            id: Uuid::new_v4(),
            seq,
            text: format!("q{seq}"),
            subject: Subject::Math,
            topic: None,
            answer: None,
            ask_count,
            upvotes: 0,
            accuracy_rating: None,
            asked_by: None,
            asked_at: Utc::now(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_group_counts_exact_and_sorted() {
        let groups = group_counts(["Algebra", "Biology", "Algebra", "Grammar", "Algebra", "Biology"]);
        assert_eq!(
            groups,
            vec![
                GroupCount { key: "Algebra".into(), count: 3 },
                GroupCount { key: "Biology".into(), count: 2 },
                GroupCount { key: "Grammar".into(), count: 1 },
            ]
        );
    }

    #[test]
    fn test_group_counts_ties_keep_first_seen_order() {
        let groups = group_counts(["Grammar", "Algebra", "Biology", "Algebra", "Grammar"]);
        let keys: Vec<_> = groups.iter().map(|g| g.key.as_str()).collect();
        assert_eq!(keys, vec!["Grammar", "Algebra", "Biology"]);
    }

    #[test]
    fn test_group_counts_empty() {
        assert!(group_counts(std::iter::empty()).is_empty());
    }

    #[test]
    fn test_top_by_ask_count_stable_and_limited() {
        let qs = vec![question(1, 3), question(2, 9), question(3, 3), question(4, 1)];
        let top = top_by_ask_count(&qs, 3);
        let seqs: Vec<_> = top.iter().map(|q| q.seq).collect();
        assert_eq!(seqs, vec![2, 1, 3]);
    }

    #[test]
    fn test_mean_rating_none_without_ratings() {
        assert_eq!(mean_rating(std::iter::empty()), None);
        assert_eq!(accuracy_percent(None), 0);
    }

    #[test]
    fn test_accuracy_percent_rounds_and_clamps() {
        assert_eq!(accuracy_percent(mean_rating([85, 92, 88])), 88);
        assert_eq!(accuracy_percent(Some(84.5)), 85);
        assert_eq!(accuracy_percent(Some(140.0)), 100);
        assert_eq!(accuracy_percent(Some(-3.0)), 0);
        assert_eq!(accuracy_percent(Some(f64::NAN)), 0);
    }
}
