use tracing::debug;

use crate::llm_client::{Completer, LlmError};
use crate::models::question::Subject;
use crate::student::prompts::{build_question_prompt, HOMEWORK_SYSTEM};

pub const MAX_ANSWER_WORDS: usize = 200;

/// Asks the completer for an answer and enforces the word limit.
pub async fn generate_answer(
    llm: &dyn Completer,
    subject: Subject,
    text: &str,
    topic: Option<&str>,
) -> Result<String, LlmError> {
    let prompt = build_question_prompt(subject, text, topic);
    let raw = llm.complete(HOMEWORK_SYSTEM, &prompt).await?;
    let answer = truncate_words(raw.trim(), MAX_ANSWER_WORDS);
    debug!("Generated {} word answer", word_count(&answer));
    Ok(answer)
}

pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}

/// Keeps the first `max` words, appending `...` when anything was cut.
/// Whitespace is normalised only when truncation happens.
pub fn truncate_words(text: &str, max: usize) -> String {
    if word_count(text) <= max {
        return text.to_string();
    }
    let mut kept = text.split_whitespace().take(max).collect::<Vec<_>>().join(" ");
    kept.push_str("...");
    kept
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    struct Echo(String);

    #[async_trait]
    impl Completer for Echo {
        async fn complete(&self, _system: &str, _prompt: &str) -> Result<String, LlmError> {
            Ok(self.0.clone())
        }
    }

    #[test]
    fn test_truncate_words_under_limit_untouched() {
        assert_eq!(truncate_words("a  b\nc", 3), "a  b\nc");
    }

    #[test]
    fn test_truncate_words_over_limit() {
        assert_eq!(truncate_words("one two three four", 2), "one two...");
    }

    #[tokio::test]
    async fn test_generate_answer_caps_word_count() {
        let long = vec!["word"; 250].join(" ");
        let answer = generate_answer(&Echo(long), Subject::English, "q", None)
            .await
            .unwrap();
        assert_eq!(word_count(&answer), MAX_ANSWER_WORDS);
        assert!(answer.ends_with("..."));
    }
}
