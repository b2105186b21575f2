//! Read-only aggregates for the teacher, student and admin home screens.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::Serialize;
use std::cmp::Reverse;
use std::collections::{BTreeMap, HashMap, HashSet};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::catalog::CatalogService;
use crate::questions::{group_by, EntityRef, QuestionBreakdown};
use crate::store::{Collection, Database};
use crate::types::{
    CatalogEntry, Difficulty, Question, QuestionType, QuizQuestion, Topic, TopicPath, Unit,
    UserProfile, UserRole,
};
use crate::{QuizError, Result};

pub const RECENT_ACTIVITY_DAYS: i64 = 30;
pub const MAX_ACTIVITY_DAYS: i64 = 365;

// -------- Shapes --------

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct UnitRef {
    pub id: Uuid,
    pub name: String,
    pub course: Option<EntityRef>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct TopicWithUnit {
    pub id: Uuid,
    pub name: String,
    pub unit: Option<UnitRef>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ActivityItem {
    pub id: Uuid,
    pub activity_type: String,
    pub question_type: QuestionType,
    pub difficulty: Difficulty,
    pub ai_generated: bool,
    pub timestamp: DateTime<Utc>,
    pub topic: Option<TopicWithUnit>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct RecentQuestion {
    pub id: Uuid,
    pub question_text: String,
    pub question_type: QuestionType,
    pub difficulty: Difficulty,
    pub ai_generated: bool,
    pub created_at: DateTime<Utc>,
    pub topic: Option<EntityRef>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct TopicSummary {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub question_count: usize,
    pub unit: Option<UnitRef>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct TeacherStats {
    pub questions_created: usize,
    pub questions_by_ai: usize,
    pub questions_manually_created: usize,
    pub topics_covered: usize,
    pub recent_activity: Vec<ActivityItem>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct TeacherDashboard {
    pub stats: TeacherStats,
    pub recent_questions: Vec<RecentQuestion>,
    pub favorite_topics: Vec<TopicSummary>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct DateRange {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub days: i64,
}

#[derive(Debug, Clone, Default, Serialize, ToSchema)]
pub struct TimelineDay {
    pub date: String,
    pub total: usize,
    pub ai_generated: usize,
    pub manually_created: usize,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct TopicCount {
    pub id: Uuid,
    pub name: String,
    pub count: usize,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct TeacherActivity {
    pub teacher_id: Uuid,
    pub teacher_name: String,
    pub date_range: DateRange,
    pub timeline: Vec<TimelineDay>,
    pub by_question_type: BTreeMap<String, usize>,
    pub by_difficulty: BTreeMap<String, usize>,
    pub topics_used: Vec<TopicCount>,
}

/// Attempt tracking does not exist yet, so the counters stay at zero.
#[derive(Debug, Clone, Default, Serialize, ToSchema)]
pub struct StudentStats {
    pub questions_viewed: usize,
    pub topics_viewed: usize,
    pub courses_enrolled: usize,
    pub recent_activity: Vec<ActivityItem>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct StudentDashboard {
    pub stats: StudentStats,
    pub recent_questions: Vec<RecentQuestion>,
    pub recommended_topics: Vec<TopicSummary>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct EntitySummary {
    pub id: Uuid,
    pub name: String,
    pub description: String,
}

impl From<&CatalogEntry> for EntitySummary {
    fn from(entry: &CatalogEntry) -> Self {
        Self {
            id: entry.id,
            name: entry.name.clone(),
            description: entry.description.clone().unwrap_or_default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct SetTopic {
    #[serde(flatten)]
    pub topic: EntitySummary,
    pub question_count: usize,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct SetUnit {
    #[serde(flatten)]
    pub unit: EntitySummary,
    pub topics: Vec<SetTopic>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct SetCourse {
    #[serde(flatten)]
    pub course: EntitySummary,
    pub units: Vec<SetUnit>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct SetSubject {
    #[serde(flatten)]
    pub subject: EntitySummary,
    pub courses: Vec<SetCourse>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct SetCurriculum {
    #[serde(flatten)]
    pub curriculum: EntitySummary,
    pub subjects: Vec<SetSubject>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct TopicQuestions {
    pub topic: EntitySummary,
    pub path: Option<TopicPath>,
    pub question_count: usize,
    pub questions: Vec<QuizQuestion>,
    pub by_type: BTreeMap<String, Vec<QuizQuestion>>,
    pub by_difficulty: BTreeMap<String, Vec<QuizQuestion>>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct AdminStats {
    pub total_users: usize,
    pub total_teachers: usize,
    pub total_students: usize,
    pub total_curricula: usize,
    pub total_subjects: usize,
    pub total_courses: usize,
    pub total_units: usize,
    pub total_topics: usize,
    pub total_questions: usize,
    pub questions_by_ai: usize,
    pub questions_by_teachers: usize,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct AdminQuestion {
    #[serde(flatten)]
    pub question: Question,
    pub created_by_user: Option<UserProfile>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct AdminDashboard {
    pub stats: AdminStats,
    pub recent_users: Vec<UserProfile>,
    pub recent_questions: Vec<AdminQuestion>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct WeeklyActivity {
    pub new_users_last_week: usize,
    pub new_questions_last_week: usize,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct SystemStats {
    pub collection_stats: BTreeMap<String, usize>,
    pub user_roles: BTreeMap<String, usize>,
    pub activity: WeeklyActivity,
    pub question_stats: QuestionBreakdown,
}

// -------- Lookups --------

/// Topics and units keyed by id, loaded once per request.
struct Lookup {
    topics: HashMap<Uuid, Topic>,
    units: HashMap<Uuid, Unit>,
    courses: HashMap<Uuid, EntityRef>,
}

impl Lookup {
    async fn load(db: &Database) -> Result<Self> {
        let topics = db.topics().all().await?.into_iter().map(|t| (t.entry.id, t)).collect();
        let units = db.units().all().await?.into_iter().map(|u| (u.entry.id, u)).collect();
        let courses = db
            .courses()
            .all()
            .await?
            .into_iter()
            .map(|c| {
                let r = EntityRef {
                    id: c.entry.id,
                    name: c.entry.name,
                };
                (r.id, r)
            })
            .collect();
        Ok(Self {
            topics,
            units,
            courses,
        })
    }

    fn topic_ref(&self, id: Uuid) -> Option<EntityRef> {
        self.topics.get(&id).map(|t| EntityRef {
            id,
            name: t.entry.name.clone(),
        })
    }

    fn unit_ref(&self, id: Uuid, with_course: bool) -> Option<UnitRef> {
        self.units.get(&id).map(|u| UnitRef {
            id,
            name: u.entry.name.clone(),
            course: if with_course {
                self.courses.get(&u.course_id).cloned()
            } else {
                None
            },
        })
    }

    fn topic_with_unit(&self, id: Uuid) -> Option<TopicWithUnit> {
        self.topics.get(&id).map(|t| TopicWithUnit {
            id,
            name: t.entry.name.clone(),
            unit: self.unit_ref(t.unit_id, false),
        })
    }

    fn recent(&self, q: &Question) -> RecentQuestion {
        RecentQuestion {
            id: q.id,
            question_text: q.question_text.clone(),
            question_type: q.question_type,
            difficulty: q.difficulty,
            ai_generated: q.ai_generated,
            created_at: q.created_at,
            topic: self.topic_ref(q.topic_id),
        }
    }

    /// Topics ranked by how many of `questions` they hold, top `n`.
    fn top_topics(&self, questions: &[Question], n: usize) -> Vec<TopicSummary> {
        let mut counts: Vec<(Uuid, usize)> = count_by_topic(questions).into_iter().collect();
        counts.sort_by_key(|&(id, count)| (Reverse(count), id));
        counts
            .into_iter()
            .filter_map(|(id, question_count)| {
                let topic = self.topics.get(&id)?;
                Some(TopicSummary {
                    id,
                    name: topic.entry.name.clone(),
                    description: topic.entry.description.clone().unwrap_or_default(),
                    question_count,
                    unit: self.unit_ref(topic.unit_id, true),
                })
            })
            .take(n)
            .collect()
    }
}

fn count_by_topic(questions: &[Question]) -> HashMap<Uuid, usize> {
    let mut counts = HashMap::new();
    for q in questions {
        *counts.entry(q.topic_id).or_insert(0) += 1;
    }
    counts
}

fn newest_first(mut questions: Vec<Question>) -> Vec<Question> {
    questions.sort_by_key(|q| Reverse(q.created_at));
    questions
}

fn every_day(start: DateTime<Utc>, end: DateTime<Utc>) -> Vec<NaiveDate> {
    let (mut day, last) = (start.date_naive(), end.date_naive());
    let mut days = Vec::new();
    while day <= last {
        days.push(day);
        match day.succ_opt() {
            Some(next) => day = next,
            None => break,
        }
    }
    days
}

// -------- Service --------

#[derive(Clone)]
pub struct DashboardService {
    db: Database,
    catalog: CatalogService,
}

impl DashboardService {
    pub fn new(db: Database) -> Self {
        let catalog = CatalogService::new(db.clone());
        Self { db, catalog }
    }

    async fn require_user(&self, id: Uuid, label: &str) -> Result<crate::types::User> {
        self.db
            .users()
            .get(id)
            .await?
            .ok_or_else(|| QuizError::NotFound(format!("{} with ID {} not found", label, id)))
    }

    pub async fn teacher_dashboard(&self, teacher_id: Uuid) -> Result<TeacherDashboard> {
        self.require_user(teacher_id, "Teacher").await?;
        let lookup = Lookup::load(&self.db).await?;
        let mine = newest_first(
            self.db
                .questions()
                .find(|q| q.created_by == Some(teacher_id))
                .await?,
        );

        let questions_by_ai = mine.iter().filter(|q| q.ai_generated).count();
        let topics_covered = mine.iter().map(|q| q.topic_id).collect::<HashSet<_>>().len();
        let cutoff = Utc::now() - Duration::days(RECENT_ACTIVITY_DAYS);

        let recent_activity = mine
            .iter()
            .filter(|q| q.created_at >= cutoff)
            .take(10)
            .map(|q| ActivityItem {
                id: q.id,
                activity_type: "question_created".into(),
                question_type: q.question_type,
                difficulty: q.difficulty,
                ai_generated: q.ai_generated,
                timestamp: q.created_at,
                topic: lookup.topic_with_unit(q.topic_id),
            })
            .collect();

        Ok(TeacherDashboard {
            stats: TeacherStats {
                questions_created: mine.len(),
                questions_by_ai,
                questions_manually_created: mine.len() - questions_by_ai,
                topics_covered,
                recent_activity,
            },
            recent_questions: mine.iter().take(5).map(|q| lookup.recent(q)).collect(),
            favorite_topics: lookup.top_topics(&mine, 5),
        })
    }

    /// Day-by-day authoring timeline over the last `days` days, including empty days.
    pub async fn teacher_activity(&self, teacher_id: Uuid, days: i64) -> Result<TeacherActivity> {
        if !(1..=MAX_ACTIVITY_DAYS).contains(&days) {
            return Err(QuizError::validation(format!(
                "days must be between 1 and {}",
                MAX_ACTIVITY_DAYS
            )));
        }
        let teacher = self.require_user(teacher_id, "Teacher").await?;
        let lookup = Lookup::load(&self.db).await?;

        let end = Utc::now();
        let start = end - Duration::days(days);
        let mut in_range = self
            .db
            .questions()
            .find(|q| q.created_by == Some(teacher_id) && q.created_at >= start && q.created_at <= end)
            .await?;
        in_range.sort_by_key(|q| q.created_at);

        let mut timeline: BTreeMap<String, TimelineDay> = every_day(start, end)
            .into_iter()
            .map(|d| {
                let date = d.format("%Y-%m-%d").to_string();
                (
                    date.clone(),
                    TimelineDay {
                        date,
                        ..Default::default()
                    },
                )
            })
            .collect();

        for q in &in_range {
            let date = q.created_at.format("%Y-%m-%d").to_string();
            let day = timeline.entry(date.clone()).or_insert_with(|| TimelineDay {
                date,
                ..Default::default()
            });
            day.total += 1;
            if q.ai_generated {
                day.ai_generated += 1;
            } else {
                day.manually_created += 1;
            }
        }

        let mut topics_used: Vec<TopicCount> = count_by_topic(&in_range)
            .into_iter()
            .map(|(id, count)| TopicCount {
                id,
                name: lookup
                    .topic_ref(id)
                    .map_or_else(|| "Unknown Topic".to_string(), |t| t.name),
                count,
            })
            .collect();
        topics_used.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.name.cmp(&b.name)));

        let breakdown = QuestionBreakdown::from_questions(&in_range);
        Ok(TeacherActivity {
            teacher_id,
            teacher_name: teacher.full_name,
            date_range: DateRange { start, end, days },
            timeline: timeline.into_values().collect(),
            by_question_type: breakdown.by_type,
            by_difficulty: breakdown.by_difficulty,
            topics_used,
        })
    }

    pub async fn student_dashboard(&self, student_id: Uuid) -> Result<StudentDashboard> {
        self.require_user(student_id, "Student").await?;
        let lookup = Lookup::load(&self.db).await?;
        let all = newest_first(self.db.questions().all().await?);

        Ok(StudentDashboard {
            stats: StudentStats::default(),
            recent_questions: all.iter().take(5).map(|q| lookup.recent(q)).collect(),
            recommended_topics: lookup.top_topics(&all, 5),
        })
    }

    /// The catalog pruned to branches that lead to at least one question.
    pub async fn student_question_sets(&self) -> Result<Vec<SetCurriculum>> {
        let counts = count_by_topic(&self.db.questions().all().await?);
        let topics = self.db.topics().all().await?;
        let units = self.db.units().all().await?;
        let courses = self.db.courses().all().await?;
        let subjects = self.db.subjects().all().await?;

        let mut result = Vec::new();
        for curriculum in self.db.curricula().all().await? {
            let mut set_subjects = Vec::new();
            for subject in subjects.iter().filter(|s| s.curriculum_id == curriculum.entry.id) {
                let mut set_courses = Vec::new();
                for course in courses.iter().filter(|c| c.subject_id == subject.entry.id) {
                    let mut set_units = Vec::new();
                    for unit in units.iter().filter(|u| u.course_id == course.entry.id) {
                        let set_topics: Vec<SetTopic> = topics
                            .iter()
                            .filter(|t| t.unit_id == unit.entry.id)
                            .filter_map(|t| {
                                let question_count = *counts.get(&t.entry.id)?;
                                Some(SetTopic {
                                    topic: EntitySummary::from(&t.entry),
                                    question_count,
                                })
                            })
                            .collect();
                        if !set_topics.is_empty() {
                            set_units.push(SetUnit {
                                unit: EntitySummary::from(&unit.entry),
                                topics: set_topics,
                            });
                        }
                    }
                    if !set_units.is_empty() {
                        set_courses.push(SetCourse {
                            course: EntitySummary::from(&course.entry),
                            units: set_units,
                        });
                    }
                }
                if !set_courses.is_empty() {
                    set_subjects.push(SetSubject {
                        subject: EntitySummary::from(&subject.entry),
                        courses: set_courses,
                    });
                }
            }
            if !set_subjects.is_empty() {
                result.push(SetCurriculum {
                    curriculum: EntitySummary::from(&curriculum.entry),
                    subjects: set_subjects,
                });
            }
        }
        Ok(result)
    }

    pub async fn student_topic_questions(&self, topic_id: Uuid) -> Result<TopicQuestions> {
        let topic = self
            .db
            .topics()
            .get(topic_id)
            .await?
            .ok_or_else(|| QuizError::NotFound(format!("Topic with ID {} not found", topic_id)))?;
        let questions: Vec<QuizQuestion> = self
            .db
            .questions()
            .find(|q| q.topic_id == topic_id)
            .await?
            .iter()
            .map(QuizQuestion::from)
            .collect();

        Ok(TopicQuestions {
            topic: EntitySummary::from(&topic.entry),
            path: self.catalog.topic_path(topic_id).await.ok(),
            question_count: questions.len(),
            by_type: group_by(&questions, |q: &QuizQuestion| q.question_type.as_str()),
            by_difficulty: group_by(&questions, |q: &QuizQuestion| q.difficulty.as_str()),
            questions,
        })
    }

    pub async fn admin_dashboard(&self) -> Result<AdminDashboard> {
        let mut users = self.db.users().all().await?;
        let questions = self.db.questions().all().await?;
        let count_role = |role: UserRole| users.iter().filter(|u| u.role == role).count();
        let total_teachers = count_role(UserRole::Teacher);
        let total_students = count_role(UserRole::Student);
        let questions_by_ai = questions.iter().filter(|q| q.ai_generated).count();
        let store = self.db.store();

        let stats = AdminStats {
            total_users: users.len(),
            total_teachers,
            total_students,
            total_curricula: store.count(Collection::Curriculum).await?,
            total_subjects: store.count(Collection::Subjects).await?,
            total_courses: store.count(Collection::Courses).await?,
            total_units: store.count(Collection::Units).await?,
            total_topics: store.count(Collection::Topics).await?,
            total_questions: questions.len(),
            questions_by_ai,
            questions_by_teachers: questions.len() - questions_by_ai,
        };

        let profiles: HashMap<Uuid, UserProfile> =
            users.iter().map(|u| (u.id, u.profile())).collect();
        let recent_questions = newest_first(questions)
            .into_iter()
            .take(5)
            .map(|q| AdminQuestion {
                created_by_user: q.created_by.and_then(|id| profiles.get(&id).cloned()),
                question: q,
            })
            .collect();

        users.sort_by_key(|u| Reverse(u.created_at));
        Ok(AdminDashboard {
            stats,
            recent_users: users.iter().take(5).map(|u| u.profile()).collect(),
            recent_questions,
        })
    }

    pub async fn system_stats(&self) -> Result<SystemStats> {
        let users = self.db.users().all().await?;
        let questions = self.db.questions().all().await?;
        let store = self.db.store();

        let mut collection_stats = BTreeMap::new();
        collection_stats.insert("users".to_string(), users.len());
        collection_stats.insert("curricula".to_string(), store.count(Collection::Curriculum).await?);
        collection_stats.insert("subjects".to_string(), store.count(Collection::Subjects).await?);
        collection_stats.insert("courses".to_string(), store.count(Collection::Courses).await?);
        collection_stats.insert("units".to_string(), store.count(Collection::Units).await?);
        collection_stats.insert("topics".to_string(), store.count(Collection::Topics).await?);
        collection_stats.insert("questions".to_string(), questions.len());
        collection_stats.insert("prompts".to_string(), store.count(Collection::Prompts).await?);

        let user_roles = UserRole::ALL
            .iter()
            .map(|r| {
                (
                    r.as_str().to_string(),
                    users.iter().filter(|u| u.role == *r).count(),
                )
            })
            .collect();

        let week_ago = Utc::now() - Duration::days(7);
        Ok(SystemStats {
            collection_stats,
            user_roles,
            activity: WeeklyActivity {
                new_users_last_week: users.iter().filter(|u| u.created_at >= week_ago).count(),
                new_questions_last_week: questions
                    .iter()
                    .filter(|q| q.created_at >= week_ago)
                    .count(),
            },
            question_stats: QuestionBreakdown::from_questions(&questions),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::questions::QuestionService;
    use crate::types::{
        CatalogInput, CorrectAnswer, Course, Curriculum, NewQuestion, NewUser, Subject,
    };
    use crate::users::UserService;

    struct Fixture {
        db: Database,
        teacher: Uuid,
        topic: Uuid,
    }

    async fn fixture() -> Fixture {
        let db = Database::in_memory();
        let catalog = CatalogService::new(db.clone());
        let input = |name: &str, parent: Option<&str>| CatalogInput {
            name: name.into(),
            description: None,
            slug: None,
            parent: parent.map(str::to_string),
        };
        let _: Curriculum = catalog.create(input("Core", None), None).await.unwrap();
        let _: Subject = catalog.create(input("Science", Some("core")), None).await.unwrap();
        let _: Course = catalog.create(input("Chemistry", Some("science")), None).await.unwrap();
        let _: Unit = catalog.create(input("Atoms", Some("chemistry")), None).await.unwrap();
        let topic: Topic = catalog.create(input("Isotopes", Some("atoms")), None).await.unwrap();
        // An empty branch that question sets should prune.
        let _: Topic = catalog.create(input("Ions", Some("atoms")), None).await.unwrap();

        let teacher = UserService::new(db.clone())
            .register(NewUser {
                email: "teach@example.com".into(),
                full_name: "Marie".into(),
                role: UserRole::Teacher,
                password: "pw".into(),
            })
            .await
            .unwrap();

        let questions = QuestionService::new(db.clone());
        for text in ["Isotopes share protons", "Carbon-14 is radioactive"] {
            questions
                .create(
                    NewQuestion {
                        question_text: text.into(),
                        question_type: QuestionType::TrueFalse,
                        options: vec!["True".into(), "False".into()],
                        correct_answer: CorrectAnswer::Single("True".into()),
                        explanation: None,
                        difficulty: Difficulty::Easy,
                        topic_id: topic.entry.id,
                    },
                    Some(teacher.id),
                )
                .await
                .unwrap();
        }

        Fixture {
            db,
            teacher: teacher.id,
            topic: topic.entry.id,
        }
    }

    #[tokio::test]
    async fn teacher_dashboard_counts_own_questions() {
        let f = fixture().await;
        let svc = DashboardService::new(f.db);
        let dash = svc.teacher_dashboard(f.teacher).await.unwrap();
        assert_eq!(dash.stats.questions_created, 2);
        assert_eq!(dash.stats.questions_manually_created, 2);
        assert_eq!(dash.stats.topics_covered, 1);
        assert_eq!(dash.stats.recent_activity.len(), 2);
        let fav = &dash.favorite_topics[0];
        assert_eq!(fav.question_count, 2);
        assert_eq!(fav.unit.as_ref().unwrap().course.as_ref().unwrap().name, "Chemistry");

        assert!(matches!(
            svc.teacher_dashboard(Uuid::new_v4()).await,
            Err(QuizError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn activity_timeline_covers_every_day() {
        let f = fixture().await;
        let svc = DashboardService::new(f.db);
        let activity = svc.teacher_activity(f.teacher, 7).await.unwrap();
        assert_eq!(activity.timeline.len(), 8);
        let today = Utc::now().format("%Y-%m-%d").to_string();
        let last = activity.timeline.last().unwrap();
        assert_eq!(last.date, today);
        assert_eq!(last.total, 2);
        assert_eq!(activity.by_question_type["True/False"], 2);
        assert_eq!(activity.topics_used[0].name, "Isotopes");

        assert!(svc.teacher_activity(f.teacher, 0).await.is_err());
        assert!(svc.teacher_activity(f.teacher, 366).await.is_err());
    }

    #[tokio::test]
    async fn question_sets_prune_empty_topics() {
        let f = fixture().await;
        let svc = DashboardService::new(f.db);
        let sets = svc.student_question_sets().await.unwrap();
        assert_eq!(sets.len(), 1);
        let topics = &sets[0].subjects[0].courses[0].units[0].topics;
        assert_eq!(topics.len(), 1);
        assert_eq!(topics[0].question_count, 2);
    }

    #[tokio::test]
    async fn topic_questions_hide_answers() {
        let f = fixture().await;
        let svc = DashboardService::new(f.db);
        let tq = svc.student_topic_questions(f.topic).await.unwrap();
        assert_eq!(tq.question_count, 2);
        assert_eq!(tq.by_difficulty["Easy"].len(), 2);
        assert!(tq.path.is_some());
        let json = serde_json::to_value(&tq.questions[0]).unwrap();
        assert!(json.get("correct_answer").is_none());
    }

    #[tokio::test]
    async fn admin_views_total_everything() {
        let f = fixture().await;
        let svc = DashboardService::new(f.db);
        let dash = svc.admin_dashboard().await.unwrap();
        assert_eq!(dash.stats.total_topics, 2);
        assert_eq!(dash.stats.total_teachers, 1);
        assert_eq!(dash.recent_questions.len(), 2);
        assert_eq!(
            dash.recent_questions[0].created_by_user.as_ref().unwrap().full_name,
            "Marie"
        );

        let stats = svc.system_stats().await.unwrap();
        assert_eq!(stats.collection_stats["questions"], 2);
        assert_eq!(stats.user_roles["teacher"], 1);
        assert_eq!(stats.activity.new_questions_last_week, 2);
    }
}
