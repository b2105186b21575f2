use chrono::Utc;
use tracing::info;
use uuid::Uuid;

use crate::store::Database;
use crate::types::{NewPromptTemplate, PromptTemplate, PromptTemplatePatch};
use crate::{QuizError, Result};

/// Stored prompt templates. At most one is flagged as the default at a time.
#[derive(Clone)]
pub struct PromptService {
    db: Database,
}

fn prompt_not_found(id: Uuid) -> QuizError {
    QuizError::NotFound(format!("Prompt template with ID {} not found", id))
}

fn duplicate(name: &str) -> QuizError {
    QuizError::Conflict(format!("Prompt template with name '{}' already exists", name))
}

impl PromptService {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Clears the default flag on every template except `keep`.
    async fn clear_default(&self, keep: Option<Uuid>) -> Result<()> {
        let repo = self.db.prompts();
        for mut p in repo.find(|p| p.is_default && Some(p.id) != keep).await? {
            p.is_default = false;
            p.updated_at = Some(Utc::now());
            repo.save(&p).await?;
        }
        Ok(())
    }

    pub async fn create(&self, input: NewPromptTemplate, actor: Option<Uuid>) -> Result<PromptTemplate> {
        let name = input.name.trim().to_string();
        if name.is_empty() || input.template.trim().is_empty() {
            return Err(QuizError::validation("name and template must not be empty"));
        }

        let _guard = self.db.write_guard().await;
        if self.db.prompts().find_one(|p| p.name == name).await?.is_some() {
            return Err(duplicate(&name));
        }

        let prompt = PromptTemplate {
            id: Uuid::new_v4(),
            name,
            description: input.description,
            template: input.template,
            is_default: input.is_default,
            created_by: actor,
            created_at: Utc::now(),
            updated_at: None,
        };
        if prompt.is_default {
            self.clear_default(Some(prompt.id)).await?;
        }
        self.db.prompts().insert(&prompt).await?;
        info!(prompt_id = %prompt.id, default = prompt.is_default, "Created prompt template");
        Ok(prompt)
    }

    pub async fn list(&self, skip: usize, limit: usize) -> Result<Vec<PromptTemplate>> {
        Ok(self
            .db
            .prompts()
            .all()
            .await?
            .into_iter()
            .skip(skip)
            .take(limit)
            .collect())
    }

    pub async fn get(&self, id: Uuid) -> Result<PromptTemplate> {
        self.db.prompts().get(id).await?.ok_or_else(|| prompt_not_found(id))
    }

    /// The flagged default, if any.
    pub async fn find_default(&self) -> Result<Option<PromptTemplate>> {
        self.db.prompts().find_one(|p| p.is_default).await
    }

    pub async fn default_template(&self) -> Result<PromptTemplate> {
        self.find_default()
            .await?
            .ok_or_else(|| QuizError::not_found("No default prompt template found"))
    }

    pub async fn update(&self, id: Uuid, patch: PromptTemplatePatch) -> Result<PromptTemplate> {
        let _guard = self.db.write_guard().await;
        let mut prompt = self.get(id).await?;

        if let Some(name) = patch.name.map(|n| n.trim().to_string()) {
            if name != prompt.name
                && self
                    .db
                    .prompts()
                    .find_one(|p| p.name == name && p.id != id)
                    .await?
                    .is_some()
            {
                return Err(duplicate(&name));
            }
            if !name.is_empty() {
                prompt.name = name;
            }
        }
        if patch.description.is_some() {
            prompt.description = patch.description;
        }
        if let Some(template) = patch.template.filter(|t| !t.trim().is_empty()) {
            prompt.template = template;
        }
        if let Some(is_default) = patch.is_default {
            if is_default && !prompt.is_default {
                self.clear_default(Some(id)).await?;
            }
            prompt.is_default = is_default;
        }
        prompt.updated_at = Some(Utc::now());
        self.db.prompts().save(&prompt).await?;
        Ok(prompt)
    }

    pub async fn delete(&self, id: Uuid) -> Result<()> {
        let prompt = self.get(id).await?;
        if prompt.is_default {
            return Err(QuizError::validation(
                "Cannot delete the default prompt template. Set a different template as default first.",
            ));
        }
        self.db.prompts().delete(id).await?;
        info!(prompt_id = %id, "Deleted prompt template");
        Ok(())
    }

    pub async fn set_default(&self, id: Uuid) -> Result<PromptTemplate> {
        let _guard = self.db.write_guard().await;
        let mut prompt = self.get(id).await?;
        self.clear_default(Some(id)).await?;
        prompt.is_default = true;
        prompt.updated_at = Some(Utc::now());
        self.db.prompts().save(&prompt).await?;
        info!(prompt_id = %id, "Set default prompt template");
        Ok(prompt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new(name: &str, is_default: bool) -> NewPromptTemplate {
        NewPromptTemplate {
            name: name.into(),
            description: None,
            template: "Create {num_questions} questions about {topic_name}.".into(),
            is_default,
        }
    }

    #[tokio::test]
    async fn only_one_default_at_a_time() {
        let svc = PromptService::new(Database::in_memory());
        let first = svc.create(new("first", true), None).await.unwrap();
        let second = svc.create(new("second", true), None).await.unwrap();

        assert_eq!(svc.default_template().await.unwrap().id, second.id);
        assert!(!svc.get(first.id).await.unwrap().is_default);

        svc.set_default(first.id).await.unwrap();
        assert_eq!(svc.default_template().await.unwrap().id, first.id);
        assert!(!svc.get(second.id).await.unwrap().is_default);
    }

    #[tokio::test]
    async fn default_cannot_be_deleted() {
        let svc = PromptService::new(Database::in_memory());
        let p = svc.create(new("main", true), None).await.unwrap();
        let err = svc.delete(p.id).await.unwrap_err();
        assert!(err.to_string().starts_with("Cannot delete the default prompt template"));

        let other = svc.create(new("other", false), None).await.unwrap();
        svc.delete(other.id).await.unwrap();
    }

    #[tokio::test]
    async fn names_are_unique() {
        let svc = PromptService::new(Database::in_memory());
        svc.create(new("main", false), None).await.unwrap();
        assert!(matches!(
            svc.create(new("main", false), None).await,
            Err(QuizError::Conflict(_))
        ));

        let other = svc.create(new("other", false), None).await.unwrap();
        let patch = PromptTemplatePatch {
            name: Some("main".into()),
            ..Default::default()
        };
        assert!(svc.update(other.id, patch).await.is_err());
    }

    #[tokio::test]
    async fn missing_default_is_not_found() {
        let svc = PromptService::new(Database::in_memory());
        assert!(matches!(svc.default_template().await, Err(QuizError::NotFound(_))));
    }
}
