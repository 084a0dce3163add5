use crate::models::question::Subject;
use crate::student::answer::MAX_ANSWER_WORDS;

pub const HOMEWORK_SYSTEM: &str = "You are a helpful homework assistant. \
    Provide clear, concise educational responses. \
    Always limit your responses to 200 words maximum.";

/// Builds the user prompt for a homework question.
pub fn build_question_prompt(subject: Subject, text: &str, topic: Option<&str>) -> String {
    let mut prompt = format!(
        "You are a helpful homework assistant. Please provide a clear, concise answer to the \
         following {subject} question. Keep your response to a maximum of {MAX_ANSWER_WORDS} words.\n\n\
         Question: {text}\n"
    );
    if let Some(topic) = topic {
        prompt.push_str(&format!("Topic: {topic}\n"));
    }
    prompt.push_str("\nProvide a helpful, educational response:");
    prompt
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_includes_subject_and_optional_topic() {
        let prompt = build_question_prompt(Subject::Math, "What is 2+2?", Some("Arithmetic"));
        assert!(prompt.contains("following Math question"));
        assert!(prompt.contains("Question: What is 2+2?"));
        assert!(prompt.contains("Topic: Arithmetic"));

        let prompt = build_question_prompt(Subject::History, "Who won?", None);
        assert!(!prompt.contains("Topic:"));
    }
}
