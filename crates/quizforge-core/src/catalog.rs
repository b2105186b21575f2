//! Curriculum hierarchy: CRUD by id or slug, cascading deletes, nested views,
//! topic paths, name search and per-curriculum statistics.

use chrono::Utc;
use serde::Serialize;
use serde_json::Value;
use std::collections::{BTreeMap, HashSet};
use tracing::{debug, info};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::questions::QuestionBreakdown;
use crate::store::Database;
use crate::text::{generate_slug, sanitize, sanitize_opt};
use crate::types::{
    CatalogEntry, CatalogInput, CatalogPatch, CatalogRecord, Course, CourseTree, Curriculum,
    CurriculumTree, Level, Subject, SubjectTree, Topic, TopicPath, Unit, UnitTree,
};
use crate::{QuizError, Result};

const SLUG_ATTEMPTS: usize = 5;
pub const DEFAULT_PAGE_SIZE: usize = 100;

/// Level-agnostic view of a stored catalog document.
#[derive(Debug, Clone)]
struct Node {
    entry: CatalogEntry,
    parent: Option<Uuid>,
}

impl Node {
    fn from_value(level: Level, value: Value) -> Result<Self> {
        let parent = level
            .parent_field()
            .and_then(|field| value.get(field))
            .and_then(Value::as_str)
            .and_then(|s| Uuid::parse_str(s).ok());
        let entry: CatalogEntry = serde_json::from_value(value)?;
        Ok(Self { entry, parent })
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct SearchHit {
    pub id: Uuid,
    pub name: String,
    #[serde(rename = "type")]
    pub level: Level,
    pub parent_id: Option<Uuid>,
    pub description: String,
}

#[derive(Debug, Clone, Default, Serialize, ToSchema)]
pub struct CatalogSearchResults {
    pub subjects: Vec<SearchHit>,
    pub courses: Vec<SearchHit>,
    pub units: Vec<SearchHit>,
    pub topics: Vec<SearchHit>,
}

#[derive(Debug, Clone, Default, Serialize, ToSchema)]
pub struct LevelCounts {
    pub subjects_count: usize,
    pub courses_count: usize,
    pub units_count: usize,
    pub topics_count: usize,
    pub questions_count: usize,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct CatalogStats {
    pub curriculum_id: Option<Uuid>,
    pub curriculum_name: Option<String>,
    pub stats: LevelCounts,
    pub question_stats: QuestionBreakdown,
}

#[derive(Clone)]
pub struct CatalogService {
    db: Database,
}

impl CatalogService {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    async fn nodes(&self, level: Level) -> Result<Vec<Node>> {
        self.db
            .store()
            .scan(level.collection())
            .await?
            .into_iter()
            .map(|value| Node::from_value(level, value))
            .collect()
    }

    /// Resolves an id or slug at `level` to the stored id.
    pub async fn resolve_id(&self, level: Level, key: &str) -> Result<Option<Uuid>> {
        let key = key.trim();
        if let Ok(id) = Uuid::parse_str(key) {
            if self.db.store().fetch(level.collection(), id).await?.is_some() {
                return Ok(Some(id));
            }
        }
        Ok(self
            .nodes(level)
            .await?
            .into_iter()
            .find(|n| n.entry.slug.as_deref() == Some(key))
            .map(|n| n.entry.id))
    }

    pub async fn resolve<R: CatalogRecord>(&self, key: &str) -> Result<Option<R>> {
        match self.resolve_id(R::LEVEL, key).await? {
            Some(id) => self.db.repo::<R>().get(id).await,
            None => Ok(None),
        }
    }

    /// Like [`resolve`](Self::resolve) but a miss is a `NotFound` error.
    pub async fn require<R: CatalogRecord>(&self, key: &str) -> Result<R> {
        self.resolve(key).await?.ok_or_else(|| not_found(R::LEVEL, key))
    }

    async fn slug_taken(&self, level: Level, slug: &str, except: Option<Uuid>) -> Result<bool> {
        Ok(self
            .nodes(level)
            .await?
            .iter()
            .any(|n| n.entry.slug.as_deref() == Some(slug) && Some(n.entry.id) != except))
    }

    /// The plain slug if free, otherwise random-suffixed candidates.
    async fn unique_slug(&self, level: Level, name: &str, except: Option<Uuid>) -> Result<String> {
        let mut candidate = generate_slug(name, false);
        for _ in 0..SLUG_ATTEMPTS {
            if !self.slug_taken(level, &candidate, except).await? {
                return Ok(candidate);
            }
            candidate = generate_slug(name, true);
        }
        Ok(generate_slug(name, true))
    }

    async fn name_taken(
        &self,
        level: Level,
        name: &str,
        parent: Option<Uuid>,
        except: Option<Uuid>,
    ) -> Result<bool> {
        Ok(self.nodes(level).await?.iter().any(|n| {
            n.entry.name == name && n.parent == parent && Some(n.entry.id) != except
        }))
    }

    async fn resolve_parent(&self, level: Level, key: Option<&str>) -> Result<Option<Uuid>> {
        let Some(parent_level) = level.parent() else {
            return Ok(None);
        };
        let key = key
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .ok_or_else(|| {
                QuizError::validation(format!(
                    "{} is required",
                    level.parent_field().unwrap_or("parent")
                ))
            })?;
        match self.resolve_id(parent_level, key).await? {
            Some(id) => Ok(Some(id)),
            None => Err(not_found(parent_level, key)),
        }
    }

    pub async fn create<R: CatalogRecord>(
        &self,
        input: CatalogInput,
        actor: Option<Uuid>,
    ) -> Result<R> {
        let level = R::LEVEL;
        let name = sanitize(&input.name);
        if name.is_empty() {
            return Err(QuizError::validation("name must not be empty"));
        }

        let _guard = self.db.write_guard().await;
        let parent = self.resolve_parent(level, input.parent.as_deref()).await?;

        if self.name_taken(level, &name, parent, None).await? {
            return Err(QuizError::Conflict(duplicate_name(level, &name)));
        }

        let slug = match input.slug.map(|s| s.trim().to_string()).filter(|s| !s.is_empty()) {
            Some(slug) => {
                if self.slug_taken(level, &slug, None).await? {
                    return Err(QuizError::Conflict(format!(
                        "{} with slug '{}' already exists",
                        level, slug
                    )));
                }
                slug
            }
            None => self.unique_slug(level, &name, None).await?,
        };

        let mut entry = CatalogEntry::new(name, sanitize_opt(input.description), actor);
        entry.slug = Some(slug);
        let record = R::from_parts(entry, parent);
        self.db.repo::<R>().insert(&record).await?;

        info!(level = %level, id = %record.entry().id, "Created catalog entry");
        Ok(record)
    }

    /// Lists a level, optionally restricted to children of `parent` (id or slug).
    pub async fn list<R: CatalogRecord>(
        &self,
        parent: Option<&str>,
        skip: usize,
        limit: usize,
    ) -> Result<Vec<R>> {
        let parent_id = match (R::LEVEL.parent(), parent.map(str::trim)) {
            (Some(parent_level), Some(key)) if !key.is_empty() => {
                match self.resolve_id(parent_level, key).await? {
                    Some(id) => Some(id),
                    None => return Ok(Vec::new()),
                }
            }
            _ => None,
        };

        let items = self
            .db
            .repo::<R>()
            .find(|r| parent_id.map_or(true, |p| r.parent_id() == Some(p)))
            .await?;
        Ok(items.into_iter().skip(skip).take(limit).collect())
    }

    pub async fn update<R: CatalogRecord>(&self, key: &str, patch: CatalogPatch) -> Result<R> {
        let level = R::LEVEL;
        let _guard = self.db.write_guard().await;
        let mut record: R = self.require(key).await?;
        let id = record.entry().id;

        let parent = match patch.parent.as_deref() {
            Some(p) if level.parent().is_some() => self.resolve_parent(level, Some(p)).await?,
            _ => record.parent_id(),
        };

        let new_name = patch.name.as_deref().map(sanitize).filter(|n| !n.is_empty());
        let name_changed = new_name
            .as_deref()
            .is_some_and(|n| n != record.entry().name);
        let parent_changed = parent != record.parent_id();

        if name_changed || parent_changed {
            let candidate = new_name.as_deref().unwrap_or(&record.entry().name);
            if self.name_taken(level, candidate, parent, Some(id)).await? {
                return Err(QuizError::Conflict(duplicate_name(level, candidate)));
            }
        }

        let explicit_slug = patch.slug.map(|s| s.trim().to_string()).filter(|s| !s.is_empty());
        if let Some(ref slug) = explicit_slug {
            if record.entry().slug.as_deref() != Some(slug.as_str())
                && self.slug_taken(level, slug, Some(id)).await?
            {
                return Err(QuizError::Conflict(format!(
                    "{} with slug '{}' already exists",
                    level, slug
                )));
            }
        }

        let slug = match explicit_slug {
            Some(slug) => Some(slug),
            None if name_changed => {
                let name = new_name.as_deref().unwrap_or(&record.entry().name);
                Some(self.unique_slug(level, name, Some(id)).await?)
            }
            None => record.entry().slug.clone(),
        };

        if let (Some(p), true) = (parent, parent_changed) {
            record.set_parent_id(p);
        }
        let entry = record.entry_mut();
        if let Some(name) = new_name {
            entry.name = name;
        }
        if patch.description.is_some() {
            entry.description = sanitize_opt(patch.description);
        }
        entry.slug = slug;
        entry.updated_at = Some(Utc::now());

        self.db.repo::<R>().save(&record).await?;
        debug!(level = %level, id = %id, "Updated catalog entry");
        Ok(record)
    }

    /// Deletes an entry and every descendant; returns how many documents went away.
    pub async fn delete<R: CatalogRecord>(&self, key: &str) -> Result<usize> {
        let _guard = self.db.write_guard().await;
        let record: R = self.require(key).await?;
        let removed = self.delete_subtree(R::LEVEL, record.entry().id).await?;
        info!(level = %R::LEVEL, id = %record.entry().id, removed, "Deleted catalog subtree");
        Ok(removed)
    }

    async fn delete_subtree(&self, level: Level, id: Uuid) -> Result<usize> {
        // Walk level by level instead of recursing so the future stays unboxed.
        let mut removed = 0;
        let mut frontier = vec![id];
        let mut current = Some(level);
        while let Some(lvl) = current {
            if frontier.is_empty() {
                break;
            }
            let next_level = lvl.child();
            let mut next_frontier = Vec::new();
            if let Some(child) = next_level {
                let parents: HashSet<Uuid> = frontier.iter().copied().collect();
                next_frontier = self
                    .nodes(child)
                    .await?
                    .into_iter()
                    .filter(|n| n.parent.is_some_and(|p| parents.contains(&p)))
                    .map(|n| n.entry.id)
                    .collect();
            }
            for doc_id in frontier {
                if self.db.store().remove(lvl.collection(), doc_id).await? {
                    removed += 1;
                }
            }
            frontier = next_frontier;
            current = next_level;
        }
        Ok(removed)
    }

    // -------- Nested views --------

    pub async fn unit_topics(&self, key: &str) -> Result<Vec<Topic>> {
        let unit: Unit = self.require(key).await?;
        self.db.topics().find(|t| t.unit_id == unit.entry.id).await
    }

    fn unit_tree(unit: Unit, topics: &[Topic]) -> UnitTree {
        let topics = topics
            .iter()
            .filter(|t| t.unit_id == unit.entry.id)
            .cloned()
            .collect();
        UnitTree { unit, topics }
    }

    async fn course_tree_for(&self, course: Course) -> Result<CourseTree> {
        let units = self.db.units().find(|u| u.course_id == course.entry.id).await?;
        let unit_ids: HashSet<Uuid> = units.iter().map(|u| u.entry.id).collect();
        let topics = self.db.topics().find(|t| unit_ids.contains(&t.unit_id)).await?;

        let mut trees = Vec::with_capacity(units.len());
        for unit in units {
            trees.push(Self::unit_tree(unit, &topics));
        }
        Ok(CourseTree {
            course,
            units: trees,
        })
    }

    async fn subject_tree_for(&self, subject: Subject) -> Result<SubjectTree> {
        let courses = self
            .db
            .courses()
            .find(|c| c.subject_id == subject.entry.id)
            .await?;
        let mut trees = Vec::with_capacity(courses.len());
        for course in courses {
            trees.push(self.course_tree_for(course).await?);
        }
        Ok(SubjectTree {
            subject,
            courses: trees,
        })
    }

    pub async fn course_tree(&self, key: &str) -> Result<CourseTree> {
        let course: Course = self.require(key).await?;
        self.course_tree_for(course).await
    }

    pub async fn subject_tree(&self, key: &str) -> Result<SubjectTree> {
        let subject: Subject = self.require(key).await?;
        self.subject_tree_for(subject).await
    }

    pub async fn curriculum_tree(&self, key: &str) -> Result<CurriculumTree> {
        let curriculum: Curriculum = self.require(key).await?;
        let subjects = self
            .db
            .subjects()
            .find(|s| s.curriculum_id == curriculum.entry.id)
            .await?;
        let mut trees = Vec::with_capacity(subjects.len());
        for subject in subjects {
            trees.push(self.subject_tree_for(subject).await?);
        }
        Ok(CurriculumTree {
            curriculum,
            subjects: trees,
        })
    }

    /// Topic plus every ancestor; any missing link is reported by level.
    pub async fn topic_path(&self, topic_id: Uuid) -> Result<TopicPath> {
        let topic = self
            .db
            .topics()
            .get(topic_id)
            .await?
            .ok_or_else(|| missing(Level::Topic, topic_id))?;
        let unit = self
            .db
            .units()
            .get(topic.unit_id)
            .await?
            .ok_or_else(|| missing(Level::Unit, topic.unit_id))?;
        let course = self
            .db
            .courses()
            .get(unit.course_id)
            .await?
            .ok_or_else(|| missing(Level::Course, unit.course_id))?;
        let subject = self
            .db
            .subjects()
            .get(course.subject_id)
            .await?
            .ok_or_else(|| missing(Level::Subject, course.subject_id))?;
        let curriculum = self
            .db
            .curricula()
            .get(subject.curriculum_id)
            .await?
            .ok_or_else(|| missing(Level::Curriculum, subject.curriculum_id))?;

        Ok(TopicPath {
            topic,
            unit,
            course,
            subject,
            curriculum,
        })
    }

    /// Ids of every entry at each level below `curriculum_id`.
    async fn subtree_ids(&self, curriculum_id: Uuid) -> Result<BTreeMap<Level, HashSet<Uuid>>> {
        let mut scope = BTreeMap::new();
        let mut parents: HashSet<Uuid> = [curriculum_id].into_iter().collect();
        let mut level = Level::Curriculum;
        while let Some(child) = level.child() {
            let ids: HashSet<Uuid> = self
                .nodes(child)
                .await?
                .into_iter()
                .filter(|n| n.parent.is_some_and(|p| parents.contains(&p)))
                .map(|n| n.entry.id)
                .collect();
            scope.insert(child, ids.clone());
            parents = ids;
            level = child;
        }
        Ok(scope)
    }

    /// Case-insensitive name search below the curriculum level.
    pub async fn search(
        &self,
        query: &str,
        limit: usize,
        curriculum: Option<&str>,
    ) -> Result<CatalogSearchResults> {
        let needle = query.trim().to_lowercase();
        let scope = match curriculum {
            Some(key) => {
                let c: Curriculum = self.require(key).await?;
                Some(self.subtree_ids(c.entry.id).await?)
            }
            None => None,
        };

        let mut results = CatalogSearchResults::default();
        for level in [Level::Subject, Level::Course, Level::Unit, Level::Topic] {
            let hits: Vec<SearchHit> = self
                .nodes(level)
                .await?
                .into_iter()
                .filter(|n| n.entry.name.to_lowercase().contains(&needle))
                .filter(|n| {
                    scope
                        .as_ref()
                        .map_or(true, |s| s.get(&level).is_some_and(|ids| ids.contains(&n.entry.id)))
                })
                .take(limit)
                .map(|n| SearchHit {
                    id: n.entry.id,
                    name: n.entry.name,
                    level,
                    parent_id: n.parent,
                    description: n.entry.description.unwrap_or_default(),
                })
                .collect();
            match level {
                Level::Subject => results.subjects = hits,
                Level::Course => results.courses = hits,
                Level::Unit => results.units = hits,
                _ => results.topics = hits,
            }
        }
        Ok(results)
    }

    /// Counts per level plus the question breakdown, for one curriculum or the whole catalog.
    pub async fn stats(&self, curriculum: Option<&str>) -> Result<CatalogStats> {
        let (curriculum, scope) = match curriculum {
            Some(key) => {
                let c: Curriculum = self.require(key).await?;
                let scope = self.subtree_ids(c.entry.id).await?;
                (Some(c), Some(scope))
            }
            None => (None, None),
        };

        let mut counts = BTreeMap::new();
        for level in [Level::Subject, Level::Course, Level::Unit, Level::Topic] {
            let n = match &scope {
                Some(scope) => scope.get(&level).map_or(0, HashSet::len),
                None => self.db.store().count(level.collection()).await?,
            };
            counts.insert(level, n);
        }

        let questions = match scope.as_ref().and_then(|s| s.get(&Level::Topic)) {
            Some(topic_ids) => {
                self.db
                    .questions()
                    .find(|q| topic_ids.contains(&q.topic_id))
                    .await?
            }
            None if scope.is_some() => Vec::new(),
            None => self.db.questions().all().await?,
        };

        Ok(CatalogStats {
            curriculum_id: curriculum.as_ref().map(|c| c.entry.id),
            curriculum_name: curriculum.map(|c| c.entry.name),
            stats: LevelCounts {
                subjects_count: counts[&Level::Subject],
                courses_count: counts[&Level::Course],
                units_count: counts[&Level::Unit],
                topics_count: counts[&Level::Topic],
                questions_count: questions.len(),
            },
            question_stats: QuestionBreakdown::from_questions(&questions),
        })
    }

    /// Gives every entry that lacks a slug a unique one; returns counts per level.
    pub async fn backfill_slugs(&self) -> Result<BTreeMap<Level, usize>> {
        let _guard = self.db.write_guard().await;
        let mut counts = BTreeMap::new();
        for level in Level::ALL {
            let mut updated = 0;
            for value in self.db.store().scan(level.collection()).await? {
                let node = Node::from_value(level, value.clone())?;
                if node.entry.slug.as_deref().is_some_and(|s| !s.is_empty()) {
                    continue;
                }
                let slug = self.unique_slug(level, &node.entry.name, Some(node.entry.id)).await?;
                let mut doc = value;
                if let Some(obj) = doc.as_object_mut() {
                    obj.insert("slug".into(), Value::String(slug));
                    obj.insert("updated_at".into(), serde_json::to_value(Utc::now())?);
                }
                self.db.store().put(level.collection(), node.entry.id, doc).await?;
                updated += 1;
            }
            counts.insert(level, updated);
        }
        Ok(counts)
    }
}

fn not_found(level: Level, key: &str) -> QuizError {
    QuizError::NotFound(format!("{} with ID or slug {} not found", level, key))
}

fn missing(level: Level, id: Uuid) -> QuizError {
    QuizError::NotFound(format!("{} with ID {} not found", level, id))
}

fn duplicate_name(level: Level, name: &str) -> String {
    match level.parent() {
        Some(parent) => format!(
            "{} with name '{}' already exists in this {}",
            level,
            name,
            parent.label().to_lowercase()
        ),
        None => format!("{} with name '{}' already exists", level, name),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(name: &str, parent: Option<&str>) -> CatalogInput {
        CatalogInput {
            name: name.to_string(),
            description: None,
            slug: None,
            parent: parent.map(str::to_string),
        }
    }

    async fn seeded() -> (CatalogService, Curriculum, Subject, Course, Unit, Topic) {
        let svc = CatalogService::new(Database::in_memory());
        let c: Curriculum = svc.create(input("IB Diploma", None), None).await.unwrap();
        let s: Subject = svc.create(input("Physics", Some("ib-diploma")), None).await.unwrap();
        let co: Course = svc
            .create(input("Mechanics", Some(&s.entry.id.to_string())), None)
            .await
            .unwrap();
        let u: Unit = svc.create(input("Kinematics", Some("mechanics")), None).await.unwrap();
        let t: Topic = svc.create(input("Projectile Motion", Some("kinematics")), None).await.unwrap();
        (svc, c, s, co, u, t)
    }

    #[tokio::test]
    async fn create_assigns_slug_and_resolves_parent_by_slug() {
        let (svc, c, s, _, _, t) = seeded().await;
        assert_eq!(c.entry.slug.as_deref(), Some("ib-diploma"));
        assert_eq!(s.curriculum_id, c.entry.id);
        assert_eq!(t.entry.slug.as_deref(), Some("projectile-motion"));

        let by_slug: Topic = svc.require("projectile-motion").await.unwrap();
        assert_eq!(by_slug.entry.id, t.entry.id);
        let by_id: Topic = svc.require(&t.entry.id.to_string()).await.unwrap();
        assert_eq!(by_id.entry.name, "Projectile Motion");
    }

    #[tokio::test]
    async fn duplicate_name_under_same_parent_conflicts() {
        let (svc, c, _, _, _, _) = seeded().await;
        let err = svc
            .create::<Subject>(input("Physics", Some(&c.entry.id.to_string())), None)
            .await
            .unwrap_err();
        assert!(matches!(err, QuizError::Conflict(_)));
        assert!(err.to_string().contains("already exists in this curriculum"));
    }

    #[tokio::test]
    async fn same_name_elsewhere_gets_suffixed_slug() {
        let (svc, _, _, _, _, _) = seeded().await;
        let other: Curriculum = svc.create(input("AP", None), None).await.unwrap();
        let physics: Subject = svc
            .create(input("Physics", Some(&other.entry.id.to_string())), None)
            .await
            .unwrap();
        let slug = physics.entry.slug.unwrap();
        assert!(slug.starts_with("physics-"), "{slug}");
    }

    #[tokio::test]
    async fn missing_parent_is_not_found() {
        let svc = CatalogService::new(Database::in_memory());
        let err = svc
            .create::<Subject>(input("Chemistry", Some("nope")), None)
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Curriculum with ID or slug nope not found");

        let err = svc.create::<Subject>(input("Chemistry", None), None).await.unwrap_err();
        assert!(matches!(err, QuizError::Validation(_)));
    }

    #[tokio::test]
    async fn explicit_duplicate_slug_conflicts() {
        let (svc, _, _, _, _, _) = seeded().await;
        let mut dup = input("International Baccalaureate", None);
        dup.slug = Some("ib-diploma".into());
        assert!(matches!(
            svc.create::<Curriculum>(dup, None).await,
            Err(QuizError::Conflict(_))
        ));
    }

    #[tokio::test]
    async fn rename_regenerates_slug() {
        let (svc, _, _, _, u, _) = seeded().await;
        let patch = CatalogPatch {
            name: Some("Motion in One Dimension".into()),
            ..Default::default()
        };
        let updated: Unit = svc.update("kinematics", patch).await.unwrap();
        assert_eq!(updated.entry.id, u.entry.id);
        assert_eq!(updated.entry.slug.as_deref(), Some("motion-in-one-dimension"));
        assert!(updated.entry.updated_at.is_some());
    }

    #[tokio::test]
    async fn list_filters_by_parent_slug() {
        let (svc, _, _, _, _, _) = seeded().await;
        let units: Vec<Unit> = svc.list(Some("mechanics"), 0, DEFAULT_PAGE_SIZE).await.unwrap();
        assert_eq!(units.len(), 1);
        let none: Vec<Unit> = svc.list(Some("unknown"), 0, DEFAULT_PAGE_SIZE).await.unwrap();
        assert!(none.is_empty());
    }

    #[tokio::test]
    async fn delete_cascades_through_descendants() {
        let (svc, _, _, _, _, _) = seeded().await;
        let removed = svc.delete::<Curriculum>("ib-diploma").await.unwrap();
        assert_eq!(removed, 5);
        assert!(svc.resolve::<Topic>("projectile-motion").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn curriculum_tree_nests_all_levels() {
        let (svc, _, _, _, _, t) = seeded().await;
        let tree = svc.curriculum_tree("ib-diploma").await.unwrap();
        assert_eq!(tree.subjects.len(), 1);
        let topic = &tree.subjects[0].courses[0].units[0].topics[0];
        assert_eq!(topic.entry.id, t.entry.id);
    }

    #[tokio::test]
    async fn topic_path_walks_to_curriculum() {
        let (svc, c, _, _, _, t) = seeded().await;
        let path = svc.topic_path(t.entry.id).await.unwrap();
        assert_eq!(path.curriculum.entry.id, c.entry.id);
        assert_eq!(path.unit.entry.name, "Kinematics");
    }

    #[tokio::test]
    async fn search_is_case_insensitive_and_scoped() {
        let (svc, _, _, _, _, _) = seeded().await;
        let hits = svc.search("MOTION", 20, None).await.unwrap();
        assert_eq!(hits.topics.len(), 1);
        assert!(hits.subjects.is_empty());

        let other: Curriculum = svc.create(input("AP", None), None).await.unwrap();
        let scoped = svc
            .search("motion", 20, Some(&other.entry.id.to_string()))
            .await
            .unwrap();
        assert!(scoped.topics.is_empty());
    }

    #[tokio::test]
    async fn stats_scope_to_one_curriculum() {
        let (svc, _, _, _, _, _) = seeded().await;
        let _: Curriculum = svc.create(input("AP", None), None).await.unwrap();
        let _: Subject = svc.create(input("Biology", Some("ap")), None).await.unwrap();

        let scoped = svc.stats(Some("ib-diploma")).await.unwrap();
        assert_eq!(scoped.curriculum_name.as_deref(), Some("IB Diploma"));
        assert_eq!(scoped.stats.subjects_count, 1);
        assert_eq!(scoped.stats.topics_count, 1);
        assert_eq!(scoped.stats.questions_count, 0);

        let global = svc.stats(None).await.unwrap();
        assert!(global.curriculum_id.is_none());
        assert_eq!(global.stats.subjects_count, 2);
    }

    #[tokio::test]
    async fn backfill_fills_missing_slugs() {
        let (svc, _, _, _, _, t) = seeded().await;
        let mut bare = t.clone();
        bare.entry.slug = None;
        svc.db.topics().save(&bare).await.unwrap();

        let counts = svc.backfill_slugs().await.unwrap();
        assert_eq!(counts[&Level::Topic], 1);
        assert_eq!(counts[&Level::Curriculum], 0);
        let topic = svc.db.topics().get(t.entry.id).await.unwrap().unwrap();
        assert_eq!(topic.entry.slug.as_deref(), Some("projectile-motion"));
    }
}
