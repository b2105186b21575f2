use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::store::{Collection, Document};

// -------- Users --------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    Admin,
    Teacher,
    Student,
}

impl UserRole {
    pub const ALL: [UserRole; 3] = [UserRole::Admin, UserRole::Teacher, UserRole::Student];

    pub fn as_str(self) -> &'static str {
        match self {
            UserRole::Admin => "admin",
            UserRole::Teacher => "teacher",
            UserRole::Student => "student",
        }
    }

    /// Teachers inherit student access, admins inherit everything.
    pub fn satisfies(self, required: UserRole) -> bool {
        match required {
            UserRole::Student => true,
            UserRole::Teacher => matches!(self, UserRole::Teacher | UserRole::Admin),
            UserRole::Admin => self == UserRole::Admin,
        }
    }
}

impl fmt::Display for UserRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub full_name: String,
    pub role: UserRole,
    pub is_active: bool,
    pub hashed_password: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl User {
    pub fn profile(&self) -> UserProfile {
        UserProfile {
            id: self.id,
            email: self.email.clone(),
            full_name: self.full_name.clone(),
            role: self.role,
            is_active: self.is_active,
            created_at: self.created_at,
        }
    }
}

impl Document for User {
    const COLLECTION: Collection = Collection::Users;
    fn id(&self) -> Uuid {
        self.id
    }
}

/// Public view of a user, never carries the password hash.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UserProfile {
    pub id: Uuid,
    pub email: String,
    pub full_name: String,
    pub role: UserRole,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct NewUser {
    pub email: String,
    pub full_name: String,
    #[serde(default = "default_role")]
    pub role: UserRole,
    pub password: String,
}

fn default_role() -> UserRole {
    UserRole::Student
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct UserPatch {
    pub full_name: Option<String>,
    pub email: Option<String>,
    pub is_active: Option<bool>,
}

// -------- Catalog --------

/// The five levels of the curriculum hierarchy, outermost first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Curriculum,
    Subject,
    Course,
    Unit,
    Topic,
}

impl Level {
    pub const ALL: [Level; 5] = [
        Level::Curriculum,
        Level::Subject,
        Level::Course,
        Level::Unit,
        Level::Topic,
    ];

    pub fn collection(self) -> Collection {
        match self {
            Level::Curriculum => Collection::Curriculum,
            Level::Subject => Collection::Subjects,
            Level::Course => Collection::Courses,
            Level::Unit => Collection::Units,
            Level::Topic => Collection::Topics,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Level::Curriculum => "Curriculum",
            Level::Subject => "Subject",
            Level::Course => "Course",
            Level::Unit => "Unit",
            Level::Topic => "Topic",
        }
    }

    pub fn parent(self) -> Option<Level> {
        match self {
            Level::Curriculum => None,
            Level::Subject => Some(Level::Curriculum),
            Level::Course => Some(Level::Subject),
            Level::Unit => Some(Level::Course),
            Level::Topic => Some(Level::Unit),
        }
    }

    pub fn child(self) -> Option<Level> {
        match self {
            Level::Curriculum => Some(Level::Subject),
            Level::Subject => Some(Level::Course),
            Level::Course => Some(Level::Unit),
            Level::Unit => Some(Level::Topic),
            Level::Topic => None,
        }
    }

    /// Name of the field that references the parent, e.g. `curriculum_id` on a subject.
    pub fn parent_field(self) -> Option<&'static str> {
        match self {
            Level::Curriculum => None,
            Level::Subject => Some("curriculum_id"),
            Level::Course => Some("subject_id"),
            Level::Unit => Some("course_id"),
            Level::Topic => Some("unit_id"),
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Fields shared by every catalog level.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CatalogEntry {
    pub id: Uuid,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default)]
    pub created_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl CatalogEntry {
    pub fn new(name: String, description: Option<String>, created_by: Option<Uuid>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name,
            description,
            slug: None,
            created_by,
            created_at: Utc::now(),
            updated_at: None,
        }
    }
}

/// A document stored at one level of the catalog.
pub trait CatalogRecord: Document {
    const LEVEL: Level;

    fn entry(&self) -> &CatalogEntry;
    fn entry_mut(&mut self) -> &mut CatalogEntry;
    fn parent_id(&self) -> Option<Uuid>;
    fn set_parent_id(&mut self, parent: Uuid);
    fn from_parts(entry: CatalogEntry, parent: Option<Uuid>) -> Self;
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Curriculum {
    #[serde(flatten)]
    pub entry: CatalogEntry,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Subject {
    #[serde(flatten)]
    pub entry: CatalogEntry,
    pub curriculum_id: Uuid,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Course {
    #[serde(flatten)]
    pub entry: CatalogEntry,
    pub subject_id: Uuid,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Unit {
    #[serde(flatten)]
    pub entry: CatalogEntry,
    pub course_id: Uuid,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Topic {
    #[serde(flatten)]
    pub entry: CatalogEntry,
    pub unit_id: Uuid,
}

impl Document for Curriculum {
    const COLLECTION: Collection = Collection::Curriculum;
    fn id(&self) -> Uuid {
        self.entry.id
    }
}

impl CatalogRecord for Curriculum {
    const LEVEL: Level = Level::Curriculum;

    fn entry(&self) -> &CatalogEntry {
        &self.entry
    }
    fn entry_mut(&mut self) -> &mut CatalogEntry {
        &mut self.entry
    }
    fn parent_id(&self) -> Option<Uuid> {
        None
    }
    fn set_parent_id(&mut self, _parent: Uuid) {}
    fn from_parts(entry: CatalogEntry, _parent: Option<Uuid>) -> Self {
        Self { entry }
    }
}

// Subjects, courses, units and topics differ only in the name of their parent field.
macro_rules! child_record {
    ($ty:ident, $collection:ident, $level:ident, $field:ident) => {
        impl Document for $ty {
            const COLLECTION: Collection = Collection::$collection;
            fn id(&self) -> Uuid {
                self.entry.id
            }
        }

        impl CatalogRecord for $ty {
            const LEVEL: Level = Level::$level;

            fn entry(&self) -> &CatalogEntry {
                &self.entry
            }
            fn entry_mut(&mut self) -> &mut CatalogEntry {
                &mut self.entry
            }
            fn parent_id(&self) -> Option<Uuid> {
                Some(self.$field)
            }
            fn set_parent_id(&mut self, parent: Uuid) {
                self.$field = parent;
            }
            fn from_parts(entry: CatalogEntry, parent: Option<Uuid>) -> Self {
                Self {
                    entry,
                    $field: parent.unwrap_or_default(),
                }
            }
        }
    };
}

child_record!(Subject, Subjects, Subject, curriculum_id);
child_record!(Course, Courses, Course, subject_id);
child_record!(Unit, Units, Unit, course_id);
child_record!(Topic, Topics, Topic, unit_id);

/// Create payload for any catalog level. The parent may be an id or a slug and
/// is accepted under the level's own field name (`curriculum_id`, `subject_id`, ...).
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct CatalogInput {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(
        default,
        alias = "curriculum_id",
        alias = "subject_id",
        alias = "course_id",
        alias = "unit_id"
    )]
    pub parent: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct CatalogPatch {
    pub name: Option<String>,
    pub description: Option<String>,
    pub slug: Option<String>,
    #[serde(
        default,
        alias = "curriculum_id",
        alias = "subject_id",
        alias = "course_id",
        alias = "unit_id"
    )]
    pub parent: Option<String>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct UnitTree {
    #[serde(flatten)]
    pub unit: Unit,
    pub topics: Vec<Topic>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct CourseTree {
    #[serde(flatten)]
    pub course: Course,
    pub units: Vec<UnitTree>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct SubjectTree {
    #[serde(flatten)]
    pub subject: Subject,
    pub courses: Vec<CourseTree>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct CurriculumTree {
    #[serde(flatten)]
    pub curriculum: Curriculum,
    pub subjects: Vec<SubjectTree>,
}

/// A topic together with every ancestor, used to build prompts and breadcrumbs.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct TopicPath {
    pub topic: Topic,
    pub unit: Unit,
    pub course: Course,
    pub subject: Subject,
    pub curriculum: Curriculum,
}

// -------- Questions --------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, ToSchema)]
pub enum QuestionType {
    #[serde(rename = "MCQ")]
    Mcq,
    #[serde(rename = "MultipleAnswer")]
    MultipleAnswer,
    #[serde(rename = "True/False")]
    TrueFalse,
    #[serde(rename = "Fill-in-the-blank")]
    FillInTheBlank,
}

impl QuestionType {
    pub const ALL: [QuestionType; 4] = [
        QuestionType::Mcq,
        QuestionType::MultipleAnswer,
        QuestionType::TrueFalse,
        QuestionType::FillInTheBlank,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            QuestionType::Mcq => "MCQ",
            QuestionType::MultipleAnswer => "MultipleAnswer",
            QuestionType::TrueFalse => "True/False",
            QuestionType::FillInTheBlank => "Fill-in-the-blank",
        }
    }

    /// Maps the loose spellings language models produce onto a canonical type.
    pub fn normalize(raw: &str) -> Option<Self> {
        if let Ok(exact) = raw.parse() {
            return Some(exact);
        }
        let lower = raw.trim().to_lowercase();
        if lower == "mcq" || lower == "multiple choice" {
            Some(QuestionType::Mcq)
        } else if lower.contains("multiple") && lower.contains("answer") {
            Some(QuestionType::MultipleAnswer)
        } else if lower.contains("true") && lower.contains("false") {
            Some(QuestionType::TrueFalse)
        } else if lower.contains("fill") && lower.contains("blank") {
            Some(QuestionType::FillInTheBlank)
        } else {
            None
        }
    }
}

impl fmt::Display for QuestionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for QuestionType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        QuestionType::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| format!("unknown question type: {s}"))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, ToSchema)]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
    Mixed,
}

impl Difficulty {
    pub const ALL: [Difficulty; 4] = [
        Difficulty::Easy,
        Difficulty::Medium,
        Difficulty::Hard,
        Difficulty::Mixed,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Difficulty::Easy => "Easy",
            Difficulty::Medium => "Medium",
            Difficulty::Hard => "Hard",
            Difficulty::Mixed => "Mixed",
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Difficulty {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Difficulty::ALL
            .into_iter()
            .find(|d| d.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown difficulty: {s}"))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(untagged)]
pub enum CorrectAnswer {
    Single(String),
    Multiple(Vec<String>),
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Question {
    pub id: Uuid,
    pub question_text: String,
    pub question_type: QuestionType,
    #[serde(default)]
    pub options: Vec<String>,
    pub correct_answer: CorrectAnswer,
    #[serde(default)]
    pub explanation: Option<String>,
    pub difficulty: Difficulty,
    pub topic_id: Uuid,
    #[serde(default)]
    pub created_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub ai_generated: bool,
    #[serde(default)]
    pub ai_model: Option<String>,
    #[serde(default)]
    pub ai_prompt: Option<String>,
    #[serde(default)]
    pub content_hash: Option<String>,
}

impl Document for Question {
    const COLLECTION: Collection = Collection::Questions;
    fn id(&self) -> Uuid {
        self.id
    }
}

/// The learner-facing part of a question: no answer, no explanation.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct QuizQuestion {
    pub id: Uuid,
    pub question_text: String,
    pub question_type: QuestionType,
    pub options: Vec<String>,
    pub difficulty: Difficulty,
    pub topic_id: Uuid,
}

impl From<&Question> for QuizQuestion {
    fn from(q: &Question) -> Self {
        Self {
            id: q.id,
            question_text: q.question_text.clone(),
            question_type: q.question_type,
            options: q.options.clone(),
            difficulty: q.difficulty,
            topic_id: q.topic_id,
        }
    }
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct NewQuestion {
    pub question_text: String,
    pub question_type: QuestionType,
    #[serde(default)]
    pub options: Vec<String>,
    pub correct_answer: CorrectAnswer,
    #[serde(default)]
    pub explanation: Option<String>,
    #[serde(default = "default_difficulty")]
    pub difficulty: Difficulty,
    pub topic_id: Uuid,
}

fn default_difficulty() -> Difficulty {
    Difficulty::Medium
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct QuestionPatch {
    pub question_text: Option<String>,
    pub question_type: Option<QuestionType>,
    pub options: Option<Vec<String>>,
    pub correct_answer: Option<CorrectAnswer>,
    pub explanation: Option<String>,
    pub difficulty: Option<Difficulty>,
    pub topic_id: Option<Uuid>,
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct QuestionFilter {
    pub topic_id: Option<Uuid>,
    pub difficulty: Option<Difficulty>,
    pub question_type: Option<QuestionType>,
    pub ai_generated: Option<bool>,
}

impl QuestionFilter {
    pub fn matches(&self, q: &Question) -> bool {
        self.topic_id.map_or(true, |t| q.topic_id == t)
            && self.difficulty.map_or(true, |d| q.difficulty == d)
            && self.question_type.map_or(true, |t| q.question_type == t)
            && self.ai_generated.map_or(true, |a| q.ai_generated == a)
    }
}

// -------- Prompt templates --------

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PromptTemplate {
    pub id: Uuid,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub template: String,
    #[serde(default)]
    pub is_default: bool,
    #[serde(default)]
    pub created_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Document for PromptTemplate {
    const COLLECTION: Collection = Collection::Prompts;
    fn id(&self) -> Uuid {
        self.id
    }
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct NewPromptTemplate {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub template: String,
    #[serde(default)]
    pub is_default: bool,
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct PromptTemplatePatch {
    pub name: Option<String>,
    pub description: Option<String>,
    pub template: Option<String>,
    pub is_default: Option<bool>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn question_type_uses_wire_spellings() {
        let json = serde_json::to_string(&QuestionType::TrueFalse).unwrap();
        assert_eq!(json, "\"True/False\"");
        let parsed: QuestionType = serde_json::from_str("\"Fill-in-the-blank\"").unwrap();
        assert_eq!(parsed, QuestionType::FillInTheBlank);
    }

    #[test]
    fn question_type_normalizes_loose_names() {
        assert_eq!(QuestionType::normalize("multiple choice"), Some(QuestionType::Mcq));
        assert_eq!(QuestionType::normalize("mcq"), Some(QuestionType::Mcq));
        assert_eq!(
            QuestionType::normalize("Multiple Answer"),
            Some(QuestionType::MultipleAnswer)
        );
        assert_eq!(QuestionType::normalize("true or false"), Some(QuestionType::TrueFalse));
        assert_eq!(
            QuestionType::normalize("fill in the blank"),
            Some(QuestionType::FillInTheBlank)
        );
        assert_eq!(QuestionType::normalize("essay"), None);
    }

    #[test]
    fn subject_serializes_parent_under_its_own_field() {
        let subject = Subject::from_parts(
            CatalogEntry::new("Physics".into(), None, None),
            Some(Uuid::nil()),
        );
        let value = serde_json::to_value(&subject).unwrap();
        assert_eq!(value["name"], "Physics");
        assert_eq!(value["curriculum_id"], Uuid::nil().to_string());
        let back: Subject = serde_json::from_value(value).unwrap();
        assert_eq!(back.parent_id(), Some(Uuid::nil()));
    }

    #[test]
    fn catalog_input_accepts_level_specific_parent_field() {
        let input: CatalogInput =
            serde_json::from_str(r#"{"name":"Algebra","course_id":"algebra-1"}"#).unwrap();
        assert_eq!(input.parent.as_deref(), Some("algebra-1"));
    }

    #[test]
    fn role_hierarchy() {
        assert!(UserRole::Admin.satisfies(UserRole::Teacher));
        assert!(UserRole::Teacher.satisfies(UserRole::Student));
        assert!(!UserRole::Student.satisfies(UserRole::Teacher));
        assert!(!UserRole::Teacher.satisfies(UserRole::Admin));
    }
}
