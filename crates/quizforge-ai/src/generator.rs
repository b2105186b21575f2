use chrono::Utc;
use quizforge_core::config_manager::LLMConfig;
use quizforge_core::text::content_hash;
use quizforge_core::types::{Difficulty, Question, QuestionType, TopicPath};
use quizforge_core::{CatalogService, Database, PromptService, QuizError};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::llm_provider::{GenerationConfig, LLMProvider, Message};
use crate::parse::{parse_questions, repair, QuestionDraft};
use crate::prompt::{render, PromptContext, PromptError, DEFAULT_GENERATION_PROMPT};

pub const MAX_QUESTIONS_PER_REQUEST: usize = 20;

const SYSTEM_PROMPT: &str = "You are an expert in creating educational assessment questions.";
const FORMAT_REMINDER: &str = "\n\nPlease provide exactly 1 question in valid JSON format with fields: question_type, question_text, options, correct_answer, and explanation.";
const DIVERSITY_REMINDER: &str =
    "\n\nPlease provide a completely different question than previously generated ones.";

#[derive(Error, Debug)]
pub enum GenerationError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Catalog(String),

    #[error(transparent)]
    Prompt(#[from] PromptError),

    #[error("Error generating questions: {0}")]
    Llm(anyhow::Error),

    #[error("Failed to generate any valid questions")]
    NoValidQuestions,

    #[error("Failed to generate a valid question after multiple attempts")]
    EmptyResponse,

    #[error("Generated question is invalid or incomplete")]
    InvalidQuestion(String),

    #[error(transparent)]
    Core(#[from] QuizError),
}

pub type GenerationResult<T> = std::result::Result<T, GenerationError>;

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct GenerationRequest {
    pub topic_id: Uuid,
    #[serde(default = "default_num_questions")]
    pub num_questions: usize,
    pub question_types: Vec<QuestionType>,
    pub difficulty: Difficulty,
    /// Template text with `{placeholder}` fields; overrides the stored default
    #[serde(default)]
    pub custom_prompt: Option<String>,
    /// Fills `{grade_level}` in the subject templates
    #[serde(default)]
    pub grade_level: Option<String>,
    /// Fills `{standards}` in the standards template
    #[serde(default)]
    pub standards: Option<String>,
}

fn default_num_questions() -> usize {
    5
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct RegenerationRequest {
    pub question_id: Uuid,
    /// Sent to the model as written
    #[serde(default)]
    pub with_custom_prompt: Option<String>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct GenerationReport {
    pub questions: Vec<Question>,
    pub requested: usize,
    pub duplicates_skipped: usize,
    pub invalid_skipped: usize,
}

/// Drives a language model to produce questions for a topic and files them in the bank.
pub struct QuestionGenerator {
    db: Database,
    catalog: CatalogService,
    prompts: PromptService,
    llm: Arc<dyn LLMProvider>,
    config: GenerationConfig,
}

impl QuestionGenerator {
    pub fn new(db: Database, llm: Arc<dyn LLMProvider>) -> Self {
        Self {
            catalog: CatalogService::new(db.clone()),
            prompts: PromptService::new(db.clone()),
            db,
            llm,
            config: GenerationConfig::default(),
        }
    }

    pub fn with_llm_config(mut self, config: &LLMConfig) -> Self {
        self.config.temperature = config.temperature;
        self.config.max_tokens = Some(config.max_tokens);
        self
    }

    pub fn provider(&self) -> &Arc<dyn LLMProvider> {
        &self.llm
    }

    pub async fn generate(
        &self,
        request: &GenerationRequest,
        actor: Option<Uuid>,
    ) -> GenerationResult<GenerationReport> {
        if !(1..=MAX_QUESTIONS_PER_REQUEST).contains(&request.num_questions) {
            return Err(GenerationError::Validation(format!(
                "num_questions must be between 1 and {}",
                MAX_QUESTIONS_PER_REQUEST
            )));
        }
        if request.question_types.is_empty() {
            return Err(GenerationError::Validation(
                "At least one question type is required".into(),
            ));
        }

        let path = self.topic_path(request.topic_id).await?;
        let template = match &request.custom_prompt {
            Some(custom) if !custom.trim().is_empty() => custom.clone(),
            _ => self.stored_or_builtin_template().await?,
        };
        let mut ctx = PromptContext::for_generation(
            &path,
            request.num_questions,
            &request.question_types,
            request.difficulty,
        );
        if let Some(grade) = &request.grade_level {
            ctx = ctx.set("grade_level", grade);
        }
        if let Some(standards) = &request.standards {
            ctx = ctx.set("standards", standards);
        }
        let prompt = render(&template, &ctx)?;

        info!(
            topic_id = %request.topic_id,
            requested = request.num_questions,
            model = self.llm.model_name(),
            "Generating questions"
        );

        let mut raw = parse_questions(&self.call(&prompt).await?);
        if raw.len() < request.num_questions {
            warn!(
                received = raw.len(),
                requested = request.num_questions,
                "Model returned too few questions, retrying"
            );
            let retry = format!(
                "{}\n\nYou did not provide enough questions. Please generate exactly {} questions in the requested format.",
                prompt, request.num_questions
            );
            raw = parse_questions(&self.call(&retry).await?);
        }

        let mut invalid_skipped = 0;
        let mut drafts = Vec::new();
        for item in raw.iter().take(request.num_questions) {
            match repair(item) {
                Ok(draft) => drafts.push(draft),
                Err(reason) => {
                    debug!(%reason, "Discarding generated question");
                    invalid_skipped += 1;
                }
            }
        }

        let _guard = self.db.write_guard().await;
        let mut seen: HashSet<String> = self
            .db
            .questions()
            .all()
            .await?
            .into_iter()
            .filter_map(|q| q.content_hash)
            .collect();

        let mut duplicates_skipped = 0;
        let mut questions = Vec::new();
        for draft in drafts {
            let question = self.to_question(draft, &path, request.difficulty, actor, &prompt);
            let hash = question.content_hash.clone().unwrap_or_default();
            if !seen.insert(hash) {
                duplicates_skipped += 1;
                continue;
            }
            self.db.questions().insert(&question).await?;
            questions.push(question);
        }

        if questions.is_empty() {
            warn!(
                invalid_skipped,
                duplicates_skipped, "No usable questions in model output"
            );
            return Err(GenerationError::NoValidQuestions);
        }

        info!(
            created = questions.len(),
            invalid_skipped, duplicates_skipped, "Stored generated questions"
        );
        Ok(GenerationReport {
            questions,
            requested: request.num_questions,
            duplicates_skipped,
            invalid_skipped,
        })
    }

    /// Replaces an existing question's content with a fresh one from the model.
    pub async fn regenerate(
        &self,
        request: &RegenerationRequest,
        actor: Option<Uuid>,
    ) -> GenerationResult<Question> {
        let mut existing = self
            .db
            .questions()
            .get(request.question_id)
            .await?
            .ok_or_else(|| {
                QuizError::not_found(format!("Question with ID {} not found", request.question_id))
            })?;
        let path = self.topic_path(existing.topic_id).await?;

        let prompt = match (&request.with_custom_prompt, &existing.ai_prompt) {
            (Some(custom), _) if !custom.trim().is_empty() => custom.clone(),
            (_, Some(stored)) if !stored.trim().is_empty() => stored.clone(),
            _ => {
                let template = self.stored_or_builtin_template().await?;
                let ctx = PromptContext::for_generation(
                    &path,
                    1,
                    &[existing.question_type],
                    existing.difficulty,
                );
                render(&template, &ctx)?
            }
        };

        let mut raw = parse_questions(&self.call(&prompt).await?);
        if raw.is_empty() {
            warn!(question_id = %existing.id, "Unparseable regeneration reply, retrying");
            raw = parse_questions(&self.call(&format!("{}{}", prompt, FORMAT_REMINDER)).await?);
        }
        let first = raw.first().ok_or(GenerationError::EmptyResponse)?;
        let mut draft = repair(first).map_err(GenerationError::InvalidQuestion)?;

        // Held from the duplicate check to the save, like the batch insert in `generate`.
        let _guard = self.db.write_guard().await;
        if self.hash_taken(&draft, existing.id).await? {
            debug!(question_id = %existing.id, "Regenerated question duplicates the bank, asking again");
            let retry = parse_questions(
                &self
                    .call(&format!("{}{}", prompt, DIVERSITY_REMINDER))
                    .await?,
            );
            match retry.first().map(repair) {
                Some(Ok(alternative)) => draft = alternative,
                Some(Err(reason)) => {
                    debug!(%reason, "Alternative question is invalid, keeping the first one")
                }
                None => debug!("No alternative question in reply, keeping the first one"),
            }
        }

        let difficulty = draft.difficulty.unwrap_or(existing.difficulty);
        let fresh = self.to_question(draft, &path, difficulty, actor, &prompt);
        existing.question_text = fresh.question_text;
        existing.question_type = fresh.question_type;
        existing.options = fresh.options;
        existing.correct_answer = fresh.correct_answer;
        existing.explanation = fresh.explanation;
        existing.difficulty = fresh.difficulty;
        existing.ai_generated = true;
        existing.ai_model = fresh.ai_model;
        existing.ai_prompt = fresh.ai_prompt;
        existing.content_hash = fresh.content_hash;
        existing.updated_at = Some(Utc::now());

        self.db.questions().save(&existing).await?;
        info!(question_id = %existing.id, "Regenerated question");
        Ok(existing)
    }

    async fn topic_path(&self, topic_id: Uuid) -> GenerationResult<TopicPath> {
        self.catalog.topic_path(topic_id).await.map_err(|e| match e {
            QuizError::NotFound(msg) => GenerationError::Catalog(msg),
            other => GenerationError::Core(other),
        })
    }

    async fn stored_or_builtin_template(&self) -> GenerationResult<String> {
        Ok(self
            .prompts
            .find_default()
            .await?
            .map(|p| p.template)
            .unwrap_or_else(|| DEFAULT_GENERATION_PROMPT.to_string()))
    }

    async fn call(&self, prompt: &str) -> GenerationResult<String> {
        let messages = [Message::system(SYSTEM_PROMPT), Message::user(prompt)];
        let response = self
            .llm
            .generate_chat(&messages, &self.config)
            .await
            .map_err(GenerationError::Llm)?;
        debug!(
            tokens = ?response.total_tokens,
            finish_reason = ?response.finish_reason,
            "Model replied"
        );
        Ok(response.content)
    }

    async fn hash_taken(&self, draft: &QuestionDraft, own_id: Uuid) -> GenerationResult<bool> {
        let hash = content_hash(
            &draft.question_text,
            draft.explanation.as_deref(),
            &draft.options,
        );
        Ok(self
            .db
            .questions()
            .count_where(|q| q.id != own_id && q.content_hash.as_deref() == Some(hash.as_str()))
            .await?
            > 0)
    }

    fn to_question(
        &self,
        draft: QuestionDraft,
        path: &TopicPath,
        difficulty: Difficulty,
        actor: Option<Uuid>,
        prompt: &str,
    ) -> Question {
        let now = Utc::now();
        let hash = content_hash(
            &draft.question_text,
            draft.explanation.as_deref(),
            &draft.options,
        );
        Question {
            id: Uuid::new_v4(),
            question_text: draft.question_text,
            question_type: draft.question_type,
            options: draft.options,
            correct_answer: draft.correct_answer,
            explanation: draft.explanation,
            difficulty: draft.difficulty.unwrap_or(difficulty),
            topic_id: path.topic.entry.id,
            created_by: actor,
            created_at: now,
            updated_at: Some(now),
            ai_generated: true,
            ai_model: Some(self.llm.model_name().to_string()),
            ai_prompt: Some(prompt.to_string()),
            content_hash: Some(hash),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm_provider::{LLMResponse, LLMResult, ProviderCharacteristics};
    use crate::prompt::subject_template;
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use quizforge_core::types::{
        CatalogInput, Course, CorrectAnswer, Curriculum, NewPromptTemplate, Subject, Topic, Unit,
    };
    use serde_json::json;
    use std::collections::VecDeque;

    /// Replies from a fixed script and records every prompt it was sent.
    struct ScriptedLlm {
        replies: Mutex<VecDeque<String>>,
        prompts: Mutex<Vec<String>>,
    }

    impl ScriptedLlm {
        fn new(replies: Vec<String>) -> Arc<Self> {
            Arc::new(Self {
                replies: Mutex::new(replies.into()),
                prompts: Mutex::new(Vec::new()),
            })
        }

        fn prompts(&self) -> Vec<String> {
            self.prompts.lock().clone()
        }
    }

    #[async_trait]
    impl LLMProvider for ScriptedLlm {
        async fn generate_chat(
            &self,
            messages: &[Message],
            _config: &GenerationConfig,
        ) -> LLMResult<LLMResponse> {
            assert_eq!(messages[0].content, SYSTEM_PROMPT);
            self.prompts.lock().push(messages[1].content.clone());
            let content = self
                .replies
                .lock()
                .pop_front()
                .ok_or_else(|| anyhow::anyhow!("script exhausted"))?;
            Ok(LLMResponse {
                content,
                total_tokens: None,
                prompt_tokens: None,
                completion_tokens: None,
                finish_reason: Some("stop".into()),
                model: "scripted".into(),
            })
        }

        async fn is_available(&self) -> bool {
            true
        }

        fn provider_name(&self) -> &str {
            "scripted"
        }

        fn model_name(&self) -> &str {
            "scripted-1"
        }

        fn characteristics(&self) -> ProviderCharacteristics {
            ProviderCharacteristics {
                max_tokens: 8192,
                avg_latency_ms: 0,
                rpm_limit: None,
                supports_streaming: false,
            }
        }
    }

    async fn seed_topic(db: &Database) -> Topic {
        let catalog = CatalogService::new(db.clone());
        let input = |name: &str, parent: Option<&str>| CatalogInput {
            name: name.into(),
            description: Some(format!("{} description", name)),
            slug: None,
            parent: parent.map(str::to_string),
        };
        let _: Curriculum = catalog.create(input("CBSE", None), None).await.unwrap();
        let _: Subject = catalog.create(input("Mathematics", Some("cbse")), None).await.unwrap();
        let _: Course = catalog.create(input("Algebra", Some("mathematics")), None).await.unwrap();
        let _: Unit = catalog.create(input("Equations", Some("algebra")), None).await.unwrap();
        catalog.create(input("Linear", Some("equations")), None).await.unwrap()
    }

    fn mcq(text: &str) -> serde_json::Value {
        json!({
            "question_text": text,
            "question_type": "MCQ",
            "options": ["1", "2", "3", "4"],
            "correct_answer": "2",
            "explanation": "Solve for x."
        })
    }

    fn request(topic_id: Uuid, n: usize) -> GenerationRequest {
        GenerationRequest {
            topic_id,
            num_questions: n,
            question_types: vec![QuestionType::Mcq, QuestionType::TrueFalse],
            difficulty: Difficulty::Hard,
            custom_prompt: None,
            grade_level: None,
            standards: None,
        }
    }

    #[tokio::test]
    async fn subject_template_renders_with_grade_level() {
        let db = Database::in_memory();
        let topic = seed_topic(&db).await;
        let llm = ScriptedLlm::new(vec![json!([mcq("x + 2 = 5")]).to_string()]);
        let generator = QuestionGenerator::new(db, llm.clone());

        let mut req = request(topic.entry.id, 1);
        req.custom_prompt = Some(subject_template("Mathematics").template.to_string());
        let err = generator.generate(&req, None).await.unwrap_err();
        assert!(matches!(err, GenerationError::Prompt(_)));
        assert!(err.to_string().contains("{grade_level}"));

        req.grade_level = Some("Grade 8".into());
        let report = generator.generate(&req, None).await.unwrap();
        assert_eq!(report.questions.len(), 1);
        let prompt = &llm.prompts()[0];
        assert!(prompt.contains("Generate 1 mathematics questions on the topic \"Linear\" for Grade 8 students."));
    }

    #[tokio::test]
    async fn generates_and_stores_valid_questions() {
        let db = Database::in_memory();
        let topic = seed_topic(&db).await;
        let reply = json!([mcq("x + 1 = 3"), mcq("2x = 4"), {"question_text": "broken"}]).to_string();
        let llm = ScriptedLlm::new(vec![reply]);
        let generator = QuestionGenerator::new(db.clone(), llm.clone());

        let report = generator
            .generate(&request(topic.entry.id, 3), None)
            .await
            .unwrap();
        assert_eq!(report.questions.len(), 2);
        assert_eq!(report.invalid_skipped, 1);
        assert_eq!(report.duplicates_skipped, 0);

        let stored = db.questions().all().await.unwrap();
        assert_eq!(stored.len(), 2);
        assert!(stored.iter().all(|q| q.ai_generated && q.difficulty == Difficulty::Hard));
        assert_eq!(stored[0].ai_model.as_deref(), Some("scripted-1"));

        let prompt = &llm.prompts()[0];
        assert!(prompt.contains("Generate 3 questions on the topic \"Linear\""));
        assert!(prompt.contains("- Question Types: MCQ, True/False"));
        assert!(prompt.contains("- Topic Description: Linear description"));
        assert_eq!(stored[0].ai_prompt.as_deref(), Some(prompt.as_str()));
    }

    #[tokio::test]
    async fn retries_once_when_short() {
        let db = Database::in_memory();
        let topic = seed_topic(&db).await;
        let llm = ScriptedLlm::new(vec![
            json!([mcq("only one")]).to_string(),
            json!([mcq("first"), mcq("second")]).to_string(),
        ]);
        let generator = QuestionGenerator::new(db, llm.clone());

        let report = generator.generate(&request(topic.entry.id, 2), None).await.unwrap();
        assert_eq!(report.questions.len(), 2);
        let prompts = llm.prompts();
        assert_eq!(prompts.len(), 2);
        assert!(prompts[1].ends_with(
            "You did not provide enough questions. Please generate exactly 2 questions in the requested format."
        ));
    }

    #[tokio::test]
    async fn skips_duplicates_within_batch_and_bank() {
        let db = Database::in_memory();
        let topic = seed_topic(&db).await;
        let generator = QuestionGenerator::new(
            db.clone(),
            ScriptedLlm::new(vec![
                json!([mcq("same"), mcq("same")]).to_string(),
                json!([mcq("same"), mcq("new")]).to_string(),
            ]),
        );

        let first = generator.generate(&request(topic.entry.id, 2), None).await.unwrap();
        assert_eq!(first.questions.len(), 1);
        assert_eq!(first.duplicates_skipped, 1);

        let second = generator.generate(&request(topic.entry.id, 2), None).await.unwrap();
        assert_eq!(second.questions.len(), 1);
        assert_eq!(second.questions[0].question_text, "new");
        assert_eq!(db.questions().count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn nothing_usable_is_an_error() {
        let db = Database::in_memory();
        let topic = seed_topic(&db).await;
        let generator = QuestionGenerator::new(
            db,
            ScriptedLlm::new(vec!["no".into(), "still no".into()]),
        );
        let err = generator
            .generate(&request(topic.entry.id, 1), None)
            .await
            .unwrap_err();
        assert!(matches!(err, GenerationError::NoValidQuestions));
        assert_eq!(err.to_string(), "Failed to generate any valid questions");
    }

    #[tokio::test]
    async fn rejects_bad_requests_before_calling_the_model() {
        let db = Database::in_memory();
        let topic = seed_topic(&db).await;
        let llm = ScriptedLlm::new(vec![]);
        let generator = QuestionGenerator::new(db, llm.clone());

        let err = generator.generate(&request(topic.entry.id, 21), None).await.unwrap_err();
        assert!(matches!(err, GenerationError::Validation(_)));

        let mut no_types = request(topic.entry.id, 1);
        no_types.question_types.clear();
        assert!(generator.generate(&no_types, None).await.is_err());

        let err = generator.generate(&request(Uuid::new_v4(), 1), None).await.unwrap_err();
        assert!(matches!(err, GenerationError::Catalog(_)));
        assert!(llm.prompts().is_empty());
    }

    #[tokio::test]
    async fn stored_default_template_wins_over_builtin_and_custom_over_both() {
        let db = Database::in_memory();
        let topic = seed_topic(&db).await;
        PromptService::new(db.clone())
            .create(
                NewPromptTemplate {
                    name: "Short".into(),
                    description: None,
                    template: "Give {num_questions} on {topic} ({subject}).".into(),
                    is_default: true,
                },
                None,
            )
            .await
            .unwrap();
        let llm = ScriptedLlm::new(vec![
            json!([mcq("a")]).to_string(),
            json!([mcq("b")]).to_string(),
        ]);
        let generator = QuestionGenerator::new(db, llm.clone());

        generator.generate(&request(topic.entry.id, 1), None).await.unwrap();
        let mut custom = request(topic.entry.id, 1);
        custom.custom_prompt = Some("Custom: {topic} / {unit}".into());
        generator.generate(&custom, None).await.unwrap();

        let prompts = llm.prompts();
        assert_eq!(prompts[0], "Give 1 on Linear (Mathematics).");
        assert_eq!(prompts[1], "Custom: Linear / Equations");
    }

    #[tokio::test]
    async fn unknown_placeholder_in_custom_prompt_fails() {
        let db = Database::in_memory();
        let topic = seed_topic(&db).await;
        let generator = QuestionGenerator::new(db, ScriptedLlm::new(vec![]));
        let mut bad = request(topic.entry.id, 1);
        bad.custom_prompt = Some("About {planet}".into());
        let err = generator.generate(&bad, None).await.unwrap_err();
        assert!(matches!(err, GenerationError::Prompt(PromptError::UnknownPlaceholder(_))));
    }

    #[tokio::test]
    async fn regenerate_replaces_content_in_place() {
        let db = Database::in_memory();
        let topic = seed_topic(&db).await;
        let llm = ScriptedLlm::new(vec![
            json!([mcq("original")]).to_string(),
            "not json".into(),
            json!({
                "question_text": "The sum of angles in a triangle is 180 degrees.",
                "question_type": "True/False",
                "options": ["True", "False"],
                "correct_answer": "True",
                "explanation": "Angle sum property."
            })
            .to_string(),
        ]);
        let generator = QuestionGenerator::new(db.clone(), llm.clone());
        let created = generator.generate(&request(topic.entry.id, 1), None).await.unwrap();
        let id = created.questions[0].id;

        let updated = generator
            .regenerate(
                &RegenerationRequest {
                    question_id: id,
                    with_custom_prompt: None,
                },
                None,
            )
            .await
            .unwrap();
        assert_eq!(updated.id, id);
        assert_eq!(updated.question_type, QuestionType::TrueFalse);
        assert_eq!(updated.correct_answer, CorrectAnswer::Single("True".into()));

        let prompts = llm.prompts();
        // stored prompt is reused, then the format reminder is appended
        assert_eq!(prompts[1], prompts[0]);
        assert!(prompts[2].ends_with(FORMAT_REMINDER));
        assert_eq!(db.questions().count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn regenerate_asks_for_something_different_on_collision() {
        let db = Database::in_memory();
        let topic = seed_topic(&db).await;
        let llm = ScriptedLlm::new(vec![
            json!([mcq("keep"), mcq("target")]).to_string(),
            json!([mcq("keep")]).to_string(),
            json!([mcq("fresh")]).to_string(),
        ]);
        let generator = QuestionGenerator::new(db.clone(), llm.clone());
        let created = generator.generate(&request(topic.entry.id, 2), None).await.unwrap();
        let target = created.questions[1].id;

        let updated = generator
            .regenerate(
                &RegenerationRequest {
                    question_id: target,
                    with_custom_prompt: Some("One more please".into()),
                },
                None,
            )
            .await
            .unwrap();
        assert_eq!(updated.question_text, "fresh");
        let prompts = llm.prompts();
        assert_eq!(prompts[1], "One more please");
        assert_eq!(prompts[2], format!("One more please{}", DIVERSITY_REMINDER));
    }

    #[tokio::test]
    async fn regenerate_reports_empty_and_invalid_replies() {
        let db = Database::in_memory();
        let topic = seed_topic(&db).await;
        let llm = ScriptedLlm::new(vec![
            json!([mcq("seed")]).to_string(),
            "nope".into(),
            "still nope".into(),
            json!({"question_text": "half a question"}).to_string(),
        ]);
        let generator = QuestionGenerator::new(db, llm);
        let id = generator.generate(&request(topic.entry.id, 1), None).await.unwrap().questions[0].id;
        let req = RegenerationRequest {
            question_id: id,
            with_custom_prompt: None,
        };

        let err = generator.regenerate(&req, None).await.unwrap_err();
        assert_eq!(
            err.to_string(),
            "Failed to generate a valid question after multiple attempts"
        );
        let err = generator.regenerate(&req, None).await.unwrap_err();
        assert_eq!(err.to_string(), "Generated question is invalid or incomplete");
    }

    #[tokio::test]
    async fn invalid_alternative_keeps_the_first_reply() {
        let db = Database::in_memory();
        let topic = seed_topic(&db).await;
        let llm = ScriptedLlm::new(vec![
            json!([mcq("keep"), mcq("target")]).to_string(),
            json!([mcq("keep")]).to_string(),
            json!({"question_text": "half a question"}).to_string(),
        ]);
        let generator = QuestionGenerator::new(db.clone(), llm.clone());
        let created = generator.generate(&request(topic.entry.id, 2), None).await.unwrap();
        let target = created.questions[1].id;

        let updated = generator
            .regenerate(
                &RegenerationRequest {
                    question_id: target,
                    with_custom_prompt: Some("Again".into()),
                },
                None,
            )
            .await
            .unwrap();
        assert_eq!(updated.id, target);
        assert_eq!(updated.question_text, "keep");
        assert_eq!(llm.prompts().len(), 3);
        assert_eq!(db.questions().count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn regenerate_waits_for_the_write_guard() {
        let db = Database::in_memory();
        let topic = seed_topic(&db).await;
        let llm = ScriptedLlm::new(vec![
            json!([mcq("seed")]).to_string(),
            json!([mcq("blocked")]).to_string(),
            json!([mcq("after")]).to_string(),
        ]);
        let generator = QuestionGenerator::new(db.clone(), llm);
        let id = generator.generate(&request(topic.entry.id, 1), None).await.unwrap().questions[0].id;
        let req = RegenerationRequest {
            question_id: id,
            with_custom_prompt: None,
        };

        let guard = db.write_guard().await;
        let blocked = tokio::time::timeout(
            std::time::Duration::from_millis(50),
            generator.regenerate(&req, None),
        )
        .await;
        assert!(blocked.is_err());
        assert_eq!(db.questions().get(id).await.unwrap().unwrap().question_text, "seed");
        drop(guard);

        let updated = generator.regenerate(&req, None).await.unwrap();
        assert_eq!(updated.question_text, "after");
    }
}
