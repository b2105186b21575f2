use quizforge_core::types::{Difficulty, QuestionType, TopicPath};
use serde::Serialize;
use std::collections::BTreeMap;
use thiserror::Error;
use utoipa::ToSchema;

pub const DEFAULT_GENERATION_PROMPT: &str = r#"You are an expert in creating educational questions for students. Generate {num_questions} questions on the topic "{topic}" under the unit "{unit}" of the course "{course}" in the subject "{subject}" following the curriculum "{curriculum}".

- Topic Description: {topic_description}
- Question Types: {question_types}
- Difficulty: {difficulty}
- Ensure the questions align with the curriculum standards.
- Provide detailed explanations for correct and incorrect answers.
- Do NOT repeat previously generated questions.
- Use LaTeX format for mathematical expressions and equations, e.g., use \frac{{a}}{{b}} for fractions, x^2 for exponents, etc.
- Format: JSON array with each question having: question_type, question_text, options, correct_answer, and explanation.
- For MCQ (Multiple Choice Questions), ALWAYS provide exactly 4 options with exactly one correct answer.
- For MultipleAnswer questions, provide 4-5 options with 2-3 correct answers as an array.
- For True/False questions, provide options as ["True", "False"] and the correct answer as one of these.
- For Fill-in-the-blank questions, provide the question with a blank (represented by ________) and a single correct answer.
- Return ONLY the JSON array with no additional text."#;

pub const REGENERATION_PROMPT: &str = r#"You are an expert in creating educational questions. Please regenerate a different question on the topic "{topic}" under the unit "{unit}" of the course "{course}" in the subject "{subject}" following the curriculum "{curriculum}".

- Topic Description: {topic_description}
- Question Type: {question_type}
- Difficulty: {difficulty}
- Ensure the question aligns with the curriculum standards.
- Provide a detailed explanation for correct and incorrect answers.
- Create a question that is different from this previous question: "{previous_question}"
- Use LaTeX format for mathematical expressions and equations if needed.
- Format your response as a JSON object with these fields: question_type, question_text, options, correct_answer, and explanation.
- For MCQ, provide exactly 4 options with one correct answer.
- For MultipleAnswer, provide 4-5 options with 2-3 correct answers as an array.
- For Fill-in-the-blank, provide the question with a blank (represented by ________) and a single correct answer.
- For True/False, provide options as ["True", "False"] and the correct answer as one of these.
- Return ONLY the JSON object with no additional text."#;

pub const STANDARDS_BASED_PROMPT: &str = r#"You are an expert in creating educational questions aligned with specific educational standards. Generate {num_questions} questions on the topic "{topic}" that align with the following educational standards and objectives:

Standards: {standards}
Learning Objectives: {objectives}

- Question Types: {question_types}
- Difficulty: {difficulty}
- Provide detailed explanations that reference the specific standard or objective being assessed.
- Use clear, grade-appropriate language for {grade_level} students.
- Use LaTeX format for mathematical expressions and equations if needed.
- Format: JSON array with each question having: question_type, question_text, options, correct_answer, explanation, and aligned_standard.
- For MCQ, provide exactly 4 options with one correct answer.
- For MultipleAnswer, provide 4-5 options with 2-3 correct answers as an array.
- For Fill-in-the-blank, provide the question with a blank (represented by ________) and a single correct answer.
- Return ONLY the JSON array with no additional text."#;

pub const MATH_PROMPT: &str = r#"You are an expert mathematics educator. Generate {num_questions} mathematics questions on the topic "{topic}" for {grade_level} students.

- Question Types: {question_types}
- Difficulty: {difficulty}
- Include a mix of conceptual understanding, procedural fluency, and application problems.
- For computational problems, provide step-by-step solutions in the explanation.
- All mathematical expressions must be in LaTeX format.
- Format: JSON array with each question having: question_type, question_text, options, correct_answer, explanation, and solution_steps.
- For MCQ, provide exactly 4 options with one correct answer.
- For MultipleAnswer, provide 4-5 options with 2-3 correct answers as an array.
- Include common misconceptions as distractors in the options.
- Return ONLY the JSON array with no additional text."#;

pub const LANGUAGE_ARTS_PROMPT: &str = r#"You are an expert language arts educator. Generate {num_questions} questions on the topic "{topic}" for {grade_level} students.

- Question Types: {question_types}
- Difficulty: {difficulty}
- Include questions that assess reading comprehension, vocabulary, grammar, and critical thinking.
- For reading comprehension questions, include a short passage (3-5 sentences) followed by questions.
- Format: JSON array with each question having: question_type, question_text, options, correct_answer, explanation, and skill_assessed.
- For grammar questions, provide clear explanations of the grammatical rules in the explanation.
- Return ONLY the JSON array with no additional text."#;

pub const SCIENCE_PROMPT: &str = r#"You are an expert science educator. Generate {num_questions} science questions on the topic "{topic}" for {grade_level} students.

- Question Types: {question_types}
- Difficulty: {difficulty}
- Include a mix of factual recall, conceptual understanding, and application questions.
- For experimental design questions, include proper scientific method terminology.
- Format: JSON array with each question having: question_type, question_text, options, correct_answer, explanation, and science_domain (e.g., biology, chemistry, physics).
- For MCQ, provide exactly 4 options with one correct answer.
- Return ONLY the JSON array with no additional text."#;

pub const HISTORY_PROMPT: &str = r#"You are an expert history and social studies educator. Generate {num_questions} questions on the topic "{topic}" for {grade_level} students.

- Question Types: {question_types}
- Difficulty: {difficulty}
- Include questions that assess factual knowledge, chronological understanding, and historical analysis.
- Include primary source analysis where appropriate.
- Format: JSON array with each question having: question_type, question_text, options, correct_answer, explanation, and historical_period.
- For MCQ, provide exactly 4 options with one correct answer.
- Return ONLY the JSON array with no additional text."#;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PromptError {
    #[error("Prompt template references unknown placeholder '{{{0}}}'")]
    UnknownPlaceholder(String),

    #[error("Prompt template has an unclosed '{{' at byte {0}")]
    Unclosed(usize),
}

/// A built-in template as listed by the API.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct BuiltinTemplate {
    pub name: &'static str,
    pub description: &'static str,
    pub template: &'static str,
}

const BUILTINS: [BuiltinTemplate; 7] = [
    BuiltinTemplate {
        name: "default",
        description: "General question generation for any topic",
        template: DEFAULT_GENERATION_PROMPT,
    },
    BuiltinTemplate {
        name: "regeneration",
        description: "Replace a single existing question",
        template: REGENERATION_PROMPT,
    },
    BuiltinTemplate {
        name: "standards",
        description: "Questions aligned with named standards and objectives",
        template: STANDARDS_BASED_PROMPT,
    },
    BuiltinTemplate {
        name: "math",
        description: "Mathematics",
        template: MATH_PROMPT,
    },
    BuiltinTemplate {
        name: "language_arts",
        description: "English and language arts",
        template: LANGUAGE_ARTS_PROMPT,
    },
    BuiltinTemplate {
        name: "science",
        description: "Science",
        template: SCIENCE_PROMPT,
    },
    BuiltinTemplate {
        name: "history",
        description: "History and social studies",
        template: HISTORY_PROMPT,
    },
];

pub fn builtin_templates() -> Vec<BuiltinTemplate> {
    BUILTINS.to_vec()
}

/// Picks a subject-flavoured built-in by keyword, falling back to the default one.
pub fn subject_template(subject: &str) -> &'static BuiltinTemplate {
    const SUBJECTS: [(&[&str], &str); 4] = [
        (&["math", "algebra", "geometry", "calculus", "statistics"], "math"),
        (
            &["english", "language", "literature", "reading", "writing"],
            "language_arts",
        ),
        (
            &["science", "biology", "chemistry", "physics", "earth"],
            "science",
        ),
        (
            &["history", "social studies", "geography", "civics"],
            "history",
        ),
    ];

    let subject = subject.to_lowercase();
    let name = SUBJECTS
        .iter()
        .find(|(terms, _)| terms.iter().any(|t| subject.contains(t)))
        .map_or("default", |(_, name)| *name);
    BUILTINS
        .iter()
        .find(|t| t.name == name)
        .unwrap_or(&BUILTINS[0])
}

/// Named values substituted into a template.
#[derive(Debug, Clone, Default)]
pub struct PromptContext {
    values: BTreeMap<String, String>,
}

impl PromptContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(mut self, key: &str, value: impl ToString) -> Self {
        self.values.insert(key.to_string(), value.to_string());
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    /// Names of every level above and including the topic.
    pub fn for_topic(path: &TopicPath) -> Self {
        Self::new()
            .set("topic", &path.topic.entry.name)
            .set(
                "topic_description",
                path.topic.entry.description.as_deref().unwrap_or_default(),
            )
            .set("unit", &path.unit.entry.name)
            .set("course", &path.course.entry.name)
            .set("subject", &path.subject.entry.name)
            .set("curriculum", &path.curriculum.entry.name)
    }

    pub fn for_generation(
        path: &TopicPath,
        num_questions: usize,
        question_types: &[QuestionType],
        difficulty: Difficulty,
    ) -> Self {
        let types = question_types
            .iter()
            .map(|t| t.as_str())
            .collect::<Vec<_>>()
            .join(", ");
        Self::for_topic(path)
            .set("num_questions", num_questions)
            .set("question_types", types)
            .set("difficulty", difficulty)
    }
}

/// Fills `{name}` placeholders from the context. `{{` and `}}` produce literal braces.
pub fn render(template: &str, ctx: &PromptContext) -> Result<String, PromptError> {
    let mut out = String::with_capacity(template.len() + 256);
    let mut rest = template;
    let mut offset = 0;

    while let Some(pos) = rest.find(['{', '}']) {
        out.push_str(&rest[..pos]);
        let tail = &rest[pos..];

        if tail.starts_with("{{") {
            out.push('{');
            rest = &tail[2..];
            offset += pos + 2;
        } else if tail.starts_with("}}") {
            out.push('}');
            rest = &tail[2..];
            offset += pos + 2;
        } else if tail.starts_with('}') {
            // stray closing brace, kept as written
            out.push('}');
            rest = &tail[1..];
            offset += pos + 1;
        } else {
            let close = tail.find('}').ok_or(PromptError::Unclosed(offset + pos))?;
            let name = &tail[1..close];
            let value = ctx
                .get(name.trim())
                .ok_or_else(|| PromptError::UnknownPlaceholder(name.to_string()))?;
            out.push_str(value);
            rest = &tail[close + 1..];
            offset += pos + close + 1;
        }
    }
    out.push_str(rest);
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_placeholders_and_escapes() {
        let ctx = PromptContext::new().set("topic", "Fractions").set("num_questions", 3);
        let out = render("Write {num_questions} on {topic}: \\frac{{a}}{{b}}", &ctx).unwrap();
        assert_eq!(out, "Write 3 on Fractions: \\frac{a}{b}");
    }

    #[test]
    fn unknown_placeholder_is_named() {
        let err = render("Hello {student_name}", &PromptContext::new()).unwrap_err();
        assert_eq!(err, PromptError::UnknownPlaceholder("student_name".into()));
        assert!(err.to_string().contains("{student_name}"));
    }

    #[test]
    fn unclosed_brace_is_rejected() {
        let err = render("oops {topic", &PromptContext::new().set("topic", "x")).unwrap_err();
        assert_eq!(err, PromptError::Unclosed(5));
    }

    #[test]
    fn subject_keywords_pick_templates() {
        assert_eq!(subject_template("Pre-Algebra").template, MATH_PROMPT);
        assert_eq!(subject_template("English Literature").template, LANGUAGE_ARTS_PROMPT);
        assert_eq!(subject_template("Earth Sciences").name, "science");
        assert_eq!(subject_template("World History").template, HISTORY_PROMPT);
        assert_eq!(subject_template("Music").template, DEFAULT_GENERATION_PROMPT);
    }

    #[test]
    fn default_template_renders_with_generation_context() {
        let ctx = PromptContext::new()
            .set("num_questions", 2)
            .set("topic", "Linear equations")
            .set("topic_description", "")
            .set("unit", "Equations")
            .set("course", "Algebra I")
            .set("subject", "Mathematics")
            .set("curriculum", "CBSE")
            .set("question_types", "MCQ, True/False")
            .set("difficulty", Difficulty::Hard);
        let out = render(DEFAULT_GENERATION_PROMPT, &ctx).unwrap();
        assert!(out.starts_with("You are an expert in creating educational questions for students. Generate 2 questions"));
        assert!(out.contains("- Question Types: MCQ, True/False"));
        assert!(out.contains("\\frac{a}{b}"));
    }

    #[test]
    fn builtins_are_listed() {
        let names: Vec<_> = builtin_templates().iter().map(|t| t.name).collect();
        assert_eq!(names.len(), 7);
        assert!(names.contains(&"regeneration"));
    }
}
