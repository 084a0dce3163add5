pub mod answer;
pub mod handlers;
pub mod prompts;
pub mod validation;
