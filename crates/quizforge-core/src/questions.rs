use chrono::Utc;
use rand::seq::SliceRandom;
use regex::RegexBuilder;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use tracing::{debug, info};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::catalog::CatalogService;
use crate::store::Database;
use crate::text::{content_hash, tidy, tidy_opt};
use crate::types::{
    CorrectAnswer, Difficulty, NewQuestion, Question, QuestionFilter, QuestionPatch, QuestionType,
    QuizQuestion, TopicPath,
};
use crate::validation::check_question_shape;
use crate::{QuizError, Result};

pub const MAX_PAGE_SIZE: usize = 1000;
pub const MAX_PRACTICE_QUESTIONS: usize = 50;
pub const DEFAULT_SEARCH_LIMIT: usize = 20;

/// Question counts by type, difficulty and origin. Every type and difficulty
/// appears as a key, zero when absent.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct QuestionBreakdown {
    pub by_type: BTreeMap<String, usize>,
    pub by_difficulty: BTreeMap<String, usize>,
    pub ai_generated: usize,
    pub manually_created: usize,
}

impl QuestionBreakdown {
    pub fn from_questions<'a, I>(questions: I) -> Self
    where
        I: IntoIterator<Item = &'a Question>,
    {
        let mut by_type: BTreeMap<String, usize> = QuestionType::ALL
            .iter()
            .map(|t| (t.as_str().to_string(), 0))
            .collect();
        let mut by_difficulty: BTreeMap<String, usize> = Difficulty::ALL
            .iter()
            .map(|d| (d.as_str().to_string(), 0))
            .collect();
        let (mut ai_generated, mut manually_created) = (0, 0);

        for q in questions {
            *by_type.entry(q.question_type.as_str().to_string()).or_default() += 1;
            *by_difficulty.entry(q.difficulty.as_str().to_string()).or_default() += 1;
            if q.ai_generated {
                ai_generated += 1;
            } else {
                manually_created += 1;
            }
        }

        Self {
            by_type,
            by_difficulty,
            ai_generated,
            manually_created,
        }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct QuestionStats {
    pub total_questions: usize,
    #[serde(flatten)]
    pub breakdown: QuestionBreakdown,
    /// Present when stats were requested for a topic whose ancestry is intact.
    pub topic: Option<TopicPath>,
}

/// Id and display name of a related record.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct EntityRef {
    pub id: Uuid,
    pub name: String,
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct QuestionSearch {
    #[serde(default)]
    pub q: Option<String>,
    pub topic_id: Option<Uuid>,
    pub difficulty: Option<Difficulty>,
    pub question_type: Option<QuestionType>,
    pub ai_generated: Option<bool>,
    #[serde(default)]
    pub limit: Option<usize>,
}

impl QuestionSearch {
    pub fn filter(&self) -> QuestionFilter {
        QuestionFilter {
            topic_id: self.topic_id,
            difficulty: self.difficulty,
            question_type: self.question_type,
            ai_generated: self.ai_generated,
        }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct QuestionHit {
    #[serde(flatten)]
    pub question: Question,
    pub topic: Option<EntityRef>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct QuestionSets {
    pub topic: EntityRef,
    pub path: Option<TopicPath>,
    pub total_questions: usize,
    pub by_type: BTreeMap<String, Vec<Question>>,
    pub by_difficulty: BTreeMap<String, Vec<Question>>,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct PracticeRequest {
    pub topic_ids: Vec<Uuid>,
    #[serde(default = "default_practice_count", alias = "question_count")]
    pub count: usize,
    #[serde(default)]
    pub difficulty: Option<Difficulty>,
    #[serde(default)]
    pub question_types: Option<Vec<QuestionType>>,
}

fn default_practice_count() -> usize {
    10
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PracticeQuestion {
    #[serde(flatten)]
    pub question: QuizQuestion,
    pub topic: Option<EntityRef>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct QuizInfo {
    pub created_at: chrono::DateTime<Utc>,
    pub topic_ids: Vec<Uuid>,
    pub topic_names: Vec<String>,
    pub question_count: usize,
    /// "Mixed" when no difficulty was requested.
    pub difficulty: String,
    /// `["All Types"]` when no type filter was requested.
    pub question_types: Vec<String>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PracticeSet {
    pub quiz_info: QuizInfo,
    pub questions: Vec<PracticeQuestion>,
}

/// Group items by a string key, keeping each group in input order.
pub fn group_by<T, F>(items: &[T], key: F) -> BTreeMap<String, Vec<T>>
where
    T: Clone,
    F: Fn(&T) -> &'static str,
{
    let mut groups: BTreeMap<String, Vec<T>> = BTreeMap::new();
    for item in items {
        groups.entry(key(item).to_string()).or_default().push(item.clone());
    }
    groups
}

#[derive(Clone)]
pub struct QuestionService {
    db: Database,
    catalog: CatalogService,
}

impl QuestionService {
    pub fn new(db: Database) -> Self {
        let catalog = CatalogService::new(db.clone());
        Self { db, catalog }
    }

    async fn require_topic(&self, topic_id: Uuid) -> Result<()> {
        match self.db.topics().get(topic_id).await? {
            Some(_) => Ok(()),
            None => Err(QuizError::NotFound(format!(
                "Topic with ID {} not found",
                topic_id
            ))),
        }
    }

    async fn topic_ref(&self, topic_id: Uuid) -> Result<Option<EntityRef>> {
        Ok(self.db.topics().get(topic_id).await?.map(|t| EntityRef {
            id: t.entry.id,
            name: t.entry.name,
        }))
    }

    pub async fn create(&self, input: NewQuestion, actor: Option<Uuid>) -> Result<Question> {
        self.require_topic(input.topic_id).await?;

        let question_text = tidy(&input.question_text);
        let options: Vec<String> = input.options.iter().map(|o| tidy(o)).collect();
        let explanation = tidy_opt(input.explanation).filter(|e| !e.is_empty());
        let correct_answer = tidy_answer(input.correct_answer);

        check_question_shape(
            &question_text,
            input.question_type,
            &options,
            &correct_answer,
        )
        .map_err(QuizError::Validation)?;

        let hash = content_hash(&question_text, explanation.as_deref(), &options);
        let question = Question {
            id: Uuid::new_v4(),
            question_text,
            question_type: input.question_type,
            options,
            correct_answer,
            explanation,
            difficulty: input.difficulty,
            topic_id: input.topic_id,
            created_by: actor,
            created_at: Utc::now(),
            updated_at: None,
            ai_generated: false,
            ai_model: None,
            ai_prompt: None,
            content_hash: Some(hash),
        };
        self.db.questions().insert(&question).await?;
        info!(question_id = %question.id, topic_id = %question.topic_id, "Created question");
        Ok(question)
    }

    pub async fn list(
        &self,
        filter: &QuestionFilter,
        skip: usize,
        limit: usize,
    ) -> Result<Vec<Question>> {
        if limit == 0 || limit > MAX_PAGE_SIZE {
            return Err(QuizError::validation(format!(
                "limit must be between 1 and {}",
                MAX_PAGE_SIZE
            )));
        }
        let items = self.db.questions().find(|q| filter.matches(q)).await?;
        Ok(items.into_iter().skip(skip).take(limit).collect())
    }

    pub async fn get(&self, id: Uuid) -> Result<Question> {
        self.db
            .questions()
            .get(id)
            .await?
            .ok_or_else(|| QuizError::not_found("Question not found"))
    }

    /// Applies a partial edit, re-validating the merged question.
    pub async fn update(&self, id: Uuid, patch: QuestionPatch) -> Result<Question> {
        let mut question = self.get(id).await?;

        if let Some(topic_id) = patch.topic_id {
            self.require_topic(topic_id).await?;
            question.topic_id = topic_id;
        }
        if let Some(text) = patch.question_text {
            question.question_text = tidy(&text);
        }
        if let Some(qt) = patch.question_type {
            question.question_type = qt;
        }
        if let Some(options) = patch.options {
            question.options = options.iter().map(|o| tidy(o)).collect();
        }
        if let Some(answer) = patch.correct_answer {
            question.correct_answer = tidy_answer(answer);
        }
        if patch.explanation.is_some() {
            question.explanation = tidy_opt(patch.explanation).filter(|e| !e.is_empty());
        }
        if let Some(difficulty) = patch.difficulty {
            question.difficulty = difficulty;
        }

        check_question_shape(
            &question.question_text,
            question.question_type,
            &question.options,
            &question.correct_answer,
        )
        .map_err(QuizError::Validation)?;

        question.content_hash = Some(content_hash(
            &question.question_text,
            question.explanation.as_deref(),
            &question.options,
        ));
        question.updated_at = Some(Utc::now());
        self.db.questions().save(&question).await?;
        debug!(question_id = %id, "Updated question");
        Ok(question)
    }

    pub async fn delete(&self, id: Uuid) -> Result<()> {
        if self.db.questions().delete(id).await? {
            info!(question_id = %id, "Deleted question");
            Ok(())
        } else {
            Err(QuizError::not_found("Question not found"))
        }
    }

    /// Deletes every listed question that exists; returns how many were removed.
    pub async fn batch_delete(&self, ids: &[Uuid]) -> Result<usize> {
        if ids.is_empty() {
            return Err(QuizError::validation("No question IDs provided"));
        }
        let mut deleted = 0;
        for id in ids {
            if self.db.questions().delete(*id).await? {
                deleted += 1;
            }
        }
        if deleted == 0 {
            return Err(QuizError::not_found("No questions found with the provided IDs"));
        }
        info!(requested = ids.len(), deleted, "Batch deleted questions");
        Ok(deleted)
    }

    /// Case-insensitive literal match over question text and explanation.
    pub async fn search(&self, search: &QuestionSearch) -> Result<Vec<QuestionHit>> {
        let limit = search.limit.unwrap_or(DEFAULT_SEARCH_LIMIT).clamp(1, MAX_PAGE_SIZE);
        let pattern = match search.q.as_deref().map(str::trim).filter(|q| !q.is_empty()) {
            Some(q) => Some(
                RegexBuilder::new(&regex::escape(q))
                    .case_insensitive(true)
                    .build()
                    .map_err(|e| QuizError::validation(e.to_string()))?,
            ),
            None => None,
        };

        let filter = search.filter();
        let matches = self
            .db
            .questions()
            .find(|q| {
                filter.matches(q)
                    && pattern.as_ref().map_or(true, |re| {
                        re.is_match(&q.question_text)
                            || q.explanation.as_deref().is_some_and(|e| re.is_match(e))
                    })
            })
            .await?;

        let mut hits = Vec::new();
        for question in matches.into_iter().take(limit) {
            let topic = self.topic_ref(question.topic_id).await?;
            hits.push(QuestionHit { question, topic });
        }
        Ok(hits)
    }

    pub async fn stats(&self, topic_id: Option<Uuid>) -> Result<QuestionStats> {
        let questions = self
            .db
            .questions()
            .find(|q| topic_id.map_or(true, |t| q.topic_id == t))
            .await?;

        // A broken ancestry just leaves the topic block out.
        let topic = match topic_id {
            Some(id) => self.catalog.topic_path(id).await.ok(),
            None => None,
        };

        Ok(QuestionStats {
            total_questions: questions.len(),
            breakdown: QuestionBreakdown::from_questions(&questions),
            topic,
        })
    }

    pub async fn sets_by_topic(&self, topic_id: Uuid, limit: usize) -> Result<QuestionSets> {
        let topic = self.topic_ref(topic_id).await?.ok_or_else(|| {
            QuizError::NotFound(format!("Topic with ID {} not found", topic_id))
        })?;
        let questions: Vec<Question> = self
            .db
            .questions()
            .find(|q| q.topic_id == topic_id)
            .await?
            .into_iter()
            .take(limit)
            .collect();

        Ok(QuestionSets {
            path: self.catalog.topic_path(topic_id).await.ok(),
            topic,
            total_questions: questions.len(),
            by_type: group_by(&questions, |q: &Question| q.question_type.as_str()),
            by_difficulty: group_by(&questions, |q: &Question| q.difficulty.as_str()),
        })
    }

    /// Random sample from the given topics, answers stripped.
    pub async fn practice_set(&self, request: &PracticeRequest) -> Result<PracticeSet> {
        if request.topic_ids.is_empty() {
            return Err(QuizError::validation("At least one topic is required"));
        }
        if request.count == 0 || request.count > MAX_PRACTICE_QUESTIONS {
            return Err(QuizError::validation(format!(
                "count must be between 1 and {}",
                MAX_PRACTICE_QUESTIONS
            )));
        }

        let topics: HashSet<Uuid> = request.topic_ids.iter().copied().collect();
        let types = request.question_types.as_deref().filter(|t| !t.is_empty());
        let mut pool = self
            .db
            .questions()
            .find(|q| {
                topics.contains(&q.topic_id)
                    && request.difficulty.map_or(true, |d| q.difficulty == d)
                    && types.map_or(true, |t| t.contains(&q.question_type))
            })
            .await?;

        pool.shuffle(&mut rand::rng());
        pool.truncate(request.count);

        let mut questions = Vec::with_capacity(pool.len());
        for q in &pool {
            questions.push(PracticeQuestion {
                question: QuizQuestion::from(q),
                topic: self.topic_ref(q.topic_id).await?,
            });
        }

        let mut topic_names = Vec::new();
        for id in &request.topic_ids {
            if let Some(t) = self.topic_ref(*id).await? {
                topic_names.push(t.name);
            }
        }

        Ok(PracticeSet {
            quiz_info: QuizInfo {
                created_at: Utc::now(),
                topic_ids: request.topic_ids.clone(),
                topic_names,
                question_count: questions.len(),
                difficulty: request
                    .difficulty
                    .map_or_else(|| "Mixed".to_string(), |d| d.to_string()),
                question_types: match types {
                    Some(t) => t.iter().map(|qt| qt.to_string()).collect(),
                    None => vec!["All Types".to_string()],
                },
            },
            questions,
        })
    }
}

fn tidy_answer(answer: CorrectAnswer) -> CorrectAnswer {
    match answer {
        CorrectAnswer::Single(a) => CorrectAnswer::Single(tidy(&a)),
        CorrectAnswer::Multiple(items) => {
            CorrectAnswer::Multiple(items.iter().map(|a| tidy(a)).collect())
        }
    }
}
