//! Turns free-form model output into validated question drafts.

use once_cell::sync::Lazy;
use quizforge_core::types::{CorrectAnswer, Difficulty, QuestionType};
use quizforge_core::validation::check_question_shape;
use regex::Regex;
use serde_json::{Map, Value};

static JSON_SPAN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)(\[.*\]|\{.*\})").expect("valid regex"));

/// A question the model produced, normalized and checked but not yet stored.
#[derive(Debug, Clone, PartialEq)]
pub struct QuestionDraft {
    pub question_text: String,
    pub question_type: QuestionType,
    pub options: Vec<String>,
    pub correct_answer: CorrectAnswer,
    pub explanation: Option<String>,
    /// Only set when the model named a difficulty we recognise
    pub difficulty: Option<Difficulty>,
}

/// Extracts the raw question objects from a model reply.
///
/// The whole reply is tried as JSON first. Failing that, the widest span from
/// the first bracket or brace to the last matching one is tried. A single
/// object becomes a one-item list. Anything else yields no questions.
pub fn parse_questions(text: &str) -> Vec<Value> {
    let value = serde_json::from_str::<Value>(text.trim()).ok().or_else(|| {
        JSON_SPAN
            .find(text)
            .and_then(|m| serde_json::from_str::<Value>(m.as_str()).ok())
    });

    match value {
        Some(Value::Array(items)) => items,
        Some(obj @ Value::Object(_)) => vec![obj],
        _ => Vec::new(),
    }
}

/// Normalizes one raw question and checks it, returning the reason when it is unusable.
pub fn repair(raw: &Value) -> Result<QuestionDraft, String> {
    let obj = raw
        .as_object()
        .ok_or_else(|| "Question is not a JSON object".to_string())?;

    let question_text = obj
        .get("question_text")
        .or_else(|| obj.get("question"))
        .ok_or_else(|| "Missing field: question_text".to_string())
        .and_then(|v| scalar_text(v).ok_or_else(|| "question_text must be a string".to_string()))?;

    for field in ["question_type", "options", "correct_answer", "explanation"] {
        if !obj.contains_key(field) {
            return Err(format!("Missing field: {}", field));
        }
    }

    let raw_type = obj["question_type"]
        .as_str()
        .ok_or_else(|| "question_type must be a string".to_string())?;
    let question_type = QuestionType::normalize(raw_type)
        .ok_or_else(|| format!("Unknown question type: {}", raw_type))?;

    let options = match &obj["options"] {
        Value::Array(items) => items
            .iter()
            .map(|o| scalar_text(o).ok_or_else(|| "options must be strings".to_string()))
            .collect::<Result<Vec<_>, _>>()?,
        Value::Null if question_type == QuestionType::FillInTheBlank => Vec::new(),
        _ => return Err("options must be a list".into()),
    };

    let correct_answer = answer_for(question_type, &obj["correct_answer"])?;
    let explanation = scalar_text(&obj["explanation"]).filter(|e| !e.is_empty());
    let difficulty = difficulty_of(obj);

    check_question_shape(&question_text, question_type, &options, &correct_answer)?;

    Ok(QuestionDraft {
        question_text,
        question_type,
        options,
        correct_answer,
        explanation,
        difficulty,
    })
}

fn answer_for(question_type: QuestionType, value: &Value) -> Result<CorrectAnswer, String> {
    if question_type == QuestionType::MultipleAnswer {
        let items = match value {
            Value::Array(items) => items.clone(),
            // models sometimes quote the list: "['a', 'b']"
            Value::String(s) => match serde_json::from_str::<Value>(&s.replace('\'', "\"")) {
                Ok(Value::Array(items)) => items,
                _ => return Err("MultipleAnswer correct_answer must be a list".into()),
            },
            _ => return Err("MultipleAnswer correct_answer must be a list".into()),
        };
        let answers = items
            .iter()
            .map(|a| scalar_text(a).ok_or_else(|| "correct_answer items must be strings".to_string()))
            .collect::<Result<Vec<_>, _>>()?;
        return Ok(CorrectAnswer::Multiple(answers));
    }

    match value {
        Value::Array(items) if items.len() == 1 => scalar_text(&items[0])
            .map(CorrectAnswer::Single)
            .ok_or_else(|| "correct_answer must be a string".into()),
        Value::Array(_) => Err(format!(
            "{} questions take a single correct answer",
            question_type
        )),
        other => scalar_text(other)
            .map(CorrectAnswer::Single)
            .ok_or_else(|| "correct_answer must be a string".into()),
    }
}

/// Strings are trimmed; numbers and booleans are written out.
fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(true) => Some("True".into()),
        Value::Bool(false) => Some("False".into()),
        _ => None,
    }
}

fn difficulty_of(obj: &Map<String, Value>) -> Option<Difficulty> {
    obj.get("difficulty")
        .and_then(Value::as_str)
        .and_then(|d| d.parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_plain_array_and_single_object() {
        assert_eq!(parse_questions(r#"[{"a":1},{"a":2}]"#).len(), 2);
        assert_eq!(parse_questions(r#"  {"a":1}  "#).len(), 1);
    }

    #[test]
    fn finds_json_inside_chatter() {
        let reply = "Sure! Here are your questions:\n```json\n[{\"q\": \"x\"}]\n```\nGood luck.";
        assert_eq!(parse_questions(reply).len(), 1);
    }

    #[test]
    fn garbage_yields_nothing() {
        assert!(parse_questions("I cannot help with that.").is_empty());
        assert!(parse_questions("[not json]").is_empty());
        assert!(parse_questions("42").is_empty());
    }

    #[test]
    fn repairs_loose_mcq() {
        let raw = json!({
            "question": "2 + 2 = ?",
            "question_type": "multiple choice",
            "options": ["3", "4", "5", 6],
            "correct_answer": ["4"],
            "explanation": "Basic addition.",
            "difficulty": "easy"
        });
        let draft = repair(&raw).unwrap();
        assert_eq!(draft.question_text, "2 + 2 = ?");
        assert_eq!(draft.question_type, QuestionType::Mcq);
        assert_eq!(draft.options[3], "6");
        assert_eq!(draft.correct_answer, CorrectAnswer::Single("4".into()));
        assert_eq!(draft.difficulty, Some(Difficulty::Easy));
    }

    #[test]
    fn multiple_answer_accepts_quoted_list() {
        let raw = json!({
            "question_text": "Which are primes?",
            "question_type": "Multiple Answer",
            "options": ["2", "3", "4", "9"],
            "correct_answer": "['2', '3']",
            "explanation": "4 and 9 are composite."
        });
        let draft = repair(&raw).unwrap();
        assert_eq!(draft.question_type, QuestionType::MultipleAnswer);
        assert_eq!(
            draft.correct_answer,
            CorrectAnswer::Multiple(vec!["2".into(), "3".into()])
        );
    }

    #[test]
    fn true_false_booleans_become_words() {
        let raw = json!({
            "question_text": "The sun is a star.",
            "question_type": "true or false",
            "options": ["True", "False"],
            "correct_answer": true,
            "explanation": "It is."
        });
        assert_eq!(
            repair(&raw).unwrap().correct_answer,
            CorrectAnswer::Single("True".into())
        );
    }

    #[test]
    fn rejections_carry_a_reason() {
        let missing = json!({"question_text": "x", "question_type": "MCQ", "options": []});
        assert_eq!(repair(&missing).unwrap_err(), "Missing field: correct_answer");

        let essay = json!({
            "question_text": "Discuss.",
            "question_type": "essay",
            "options": [],
            "correct_answer": "",
            "explanation": ""
        });
        assert_eq!(repair(&essay).unwrap_err(), "Unknown question type: essay");

        let two_answers = json!({
            "question_text": "Pick one",
            "question_type": "MCQ",
            "options": ["a", "b", "c", "d"],
            "correct_answer": ["a", "b"],
            "explanation": ""
        });
        assert!(repair(&two_answers).unwrap_err().contains("single correct answer"));

        let off_list = json!({
            "question_text": "Pick one",
            "question_type": "MCQ",
            "options": ["a", "b", "c", "d"],
            "correct_answer": "e",
            "explanation": ""
        });
        assert!(repair(&off_list).unwrap_err().contains("not one of the options"));
        assert!(repair(&json!("just text")).is_err());
    }
}
