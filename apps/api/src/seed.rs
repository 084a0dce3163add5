//! Demo dataset for local development (`SEED_DEMO_DATA=true`).

use chrono::{Duration, Utc};
use tracing::info;

use crate::models::question::{NewQuestion, Subject};
use crate::models::user::{NewUser, UserRole};
use crate::store::{QuestionStore, StoreResult};

/// Hours since last activity for each demo student.
const STUDENT_LAST_ACTIVE_HOURS: [i64; 8] = [2, 5, 12, 18, 20, 3, 1, 23];

struct DemoQuestion {
    text: &'static str,
    subject: Subject,
    topic: &'static str,
    ask_count: i32,
    upvotes: i32,
    accuracy_rating: i32,
    student: usize,
    answer: &'static str,
}

const DEMO_QUESTIONS: [DemoQuestion; 12] = [
    DemoQuestion {
        text: "How do I solve quadratic equations?",
        subject: Subject::Math,
        topic: "Algebra",
        ask_count: 150,
        upvotes: 45,
        accuracy_rating: 85,
        student: 0,
        answer: "To solve quadratic equations, use the quadratic formula: x = (-b ± √(b²-4ac)) / 2a",
    },
    DemoQuestion {
        text: "What is the powerhouse of the cell?",
        subject: Subject::Science,
        topic: "Biology",
        ask_count: 200,
        upvotes: 60,
        accuracy_rating: 92,
        student: 1,
        answer: "The powerhouse of the cell is the mitochondrion, which produces ATP energy.",
    },
    DemoQuestion {
        text: "Explain the main causes of WWI",
        subject: Subject::History,
        topic: "World War I",
        ask_count: 180,
        upvotes: 55,
        accuracy_rating: 88,
        student: 2,
        answer: "The main causes of WWI were militarism, alliances, imperialism, and nationalism (MAIN).",
    },
    DemoQuestion {
        text: "What is a verb?",
        subject: Subject::English,
        topic: "Grammar",
        ask_count: 120,
        upvotes: 35,
        accuracy_rating: 95,
        student: 3,
        answer: "A verb is a word that describes an action, occurrence, or state of being.",
    },
    DemoQuestion {
        text: "What are Calculus Derivatives?",
        subject: Subject::Math,
        topic: "Calculus Derivatives",
        ask_count: 250,
        upvotes: 75,
        accuracy_rating: 78,
        student: 4,
        answer: "A derivative represents the rate of change of a function with respect to its variable.",
    },
    DemoQuestion {
        text: "Define Organic Chemistry",
        subject: Subject::Science,
        topic: "Organic Chemistry",
        ask_count: 170,
        upvotes: 50,
        accuracy_rating: 82,
        student: 5,
        answer: "Organic chemistry is the study of carbon-containing compounds and their reactions.",
    },
    DemoQuestion {
        text: "How do I find the area of a circle?",
        subject: Subject::Math,
        topic: "Geometry",
        ask_count: 140,
        upvotes: 40,
        accuracy_rating: 90,
        student: 6,
        answer: "The area of a circle is calculated using the formula: A = πr², where r is the radius.",
    },
    DemoQuestion {
        text: "What is photosynthesis?",
        subject: Subject::Science,
        topic: "Biology",
        ask_count: 190,
        upvotes: 58,
        accuracy_rating: 87,
        student: 7,
        answer: "Photosynthesis is the process by which plants convert light energy into chemical energy.",
    },
    DemoQuestion {
        text: "Explain the structure of an essay",
        subject: Subject::English,
        topic: "Writing",
        ask_count: 130,
        upvotes: 38,
        accuracy_rating: 91,
        student: 0,
        answer: "An essay typically has an introduction, body paragraphs, and a conclusion.",
    },
    DemoQuestion {
        text: "What caused the American Civil War?",
        subject: Subject::History,
        topic: "American History",
        ask_count: 160,
        upvotes: 48,
        accuracy_rating: 86,
        student: 1,
        answer: "The American Civil War was primarily caused by disputes over slavery and states rights.",
    },
    DemoQuestion {
        text: "How do I integrate by parts?",
        subject: Subject::Math,
        topic: "Calculus Derivatives",
        ask_count: 220,
        upvotes: 68,
        accuracy_rating: 75,
        student: 2,
        answer: "Integration by parts uses the formula: ∫u dv = uv - ∫v du",
    },
    DemoQuestion {
        text: "What is the periodic table?",
        subject: Subject::Science,
        topic: "Chemistry",
        ask_count: 145,
        upvotes: 42,
        accuracy_rating: 93,
        student: 3,
        answer: "The periodic table organizes chemical elements by atomic number and properties.",
    },
];

/// Inserts the demo students and questions unless questions already exist.
/// Returns `true` when data was inserted.
pub async fn seed_demo_data(store: &dyn QuestionStore) -> StoreResult<bool> {
    if store.question_count().await? > 0 {
        info!("Questions already present, skipping demo seed");
        return Ok(false);
    }

    let now = Utc::now();
    let mut uids = Vec::with_capacity(STUDENT_LAST_ACTIVE_HOURS.len());
    for (i, hours) in STUDENT_LAST_ACTIVE_HOURS.iter().enumerate() {
        let uid = format!("demo-student-{}", i + 1);
        store
            .insert_user(NewUser {
                external_id: Some(uid.clone()),
                email: format!("student{}@example.com", i + 1),
                role: UserRole::Student,
                last_active: now - Duration::hours(*hours),
            })
            .await?;
        uids.push(uid);
    }

    for demo in &DEMO_QUESTIONS {
        store
            .insert_question(NewQuestion {
                text: demo.text.to_string(),
                subject: demo.subject,
                topic: Some(demo.topic.to_string()),
                answer: Some(demo.answer.to_string()),
                ask_count: demo.ask_count,
                upvotes: demo.upvotes,
                accuracy_rating: Some(demo.accuracy_rating),
                asked_by: uids.get(demo.student).cloned(),
            })
            .await?;
    }

    info!(
        "Seeded {} students and {} questions",
        uids.len(),
        DEMO_QUESTIONS.len()
    );
    Ok(true)
}
