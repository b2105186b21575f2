use anyhow::{anyhow, Context};
use quizforge_ai::{LLMProvider, LLMProviderFactory, QuestionGenerator};
use quizforge_core::{
    CatalogService, ConfigManager, DashboardService, Database, PromptService, QuestionService,
    TokenService, UserService,
};
use std::sync::Arc;
use tracing::{info, warn};

use crate::{ApiError, ApiResult};

/// Services shared by every handler.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ConfigManager>,
    pub db: Database,
    pub tokens: Arc<TokenService>,
    pub users: UserService,
    pub catalog: CatalogService,
    pub questions: QuestionService,
    pub prompts: PromptService,
    pub dashboard: DashboardService,
    generator: Result<Arc<QuestionGenerator>, String>,
}

impl AppState {
    /// Opens storage and builds the LLM provider named in the configuration.
    pub async fn new(config: Arc<ConfigManager>) -> anyhow::Result<Self> {
        let settings = config.config();
        let db = Database::open(&settings.storage)
            .await
            .context("Failed to open storage")?;
        let tokens = Self::token_service(&config)?;

        let llm = match LLMProviderFactory::create_from_config(&settings.llm) {
            Ok(provider) => {
                info!(
                    provider = provider.provider_name(),
                    model = provider.model_name(),
                    "LLM provider ready"
                );
                Ok(provider)
            }
            Err(e) => {
                warn!(error = %e, "AI question generation disabled");
                Err(e.to_string())
            }
        };

        Ok(Self::from_parts(config, db, tokens, llm))
    }

    /// Assembles the state from already-built parts; used by tests and embedders.
    pub fn from_parts(
        config: Arc<ConfigManager>,
        db: Database,
        tokens: TokenService,
        llm: Result<Arc<dyn LLMProvider>, String>,
    ) -> Self {
        let generator = llm.map(|provider| {
            Arc::new(
                QuestionGenerator::new(db.clone(), provider)
                    .with_llm_config(&config.config().llm),
            )
        });

        Self {
            users: UserService::new(db.clone()),
            catalog: CatalogService::new(db.clone()),
            questions: QuestionService::new(db.clone()),
            prompts: PromptService::new(db.clone()),
            dashboard: DashboardService::new(db.clone()),
            tokens: Arc::new(tokens),
            config,
            db,
            generator,
        }
    }

    pub fn token_service(config: &ConfigManager) -> anyhow::Result<TokenService> {
        let auth = &config.config().auth;
        let secret = auth.jwt_secret.clone().ok_or_else(|| {
            anyhow!("JWT secret is not configured. Set JWT_SECRET or 'auth.jwt_secret' (at least 32 characters)")
        })?;
        Ok(TokenService::new(secret, auth.token_expiry_minutes)?)
    }

    pub fn generator(&self) -> ApiResult<&Arc<QuestionGenerator>> {
        self.generator.as_ref().map_err(|reason| {
            ApiError::ServiceUnavailable(format!(
                "AI question generation is not configured: {}",
                reason
            ))
        })
    }
}
