use quizforge_core::{
    CatalogInput, CatalogService, ConfigError, ConfigManager, Course, Curriculum, Database,
    NewQuestion, QuestionService, StorageConfig, Subject, Topic, Unit, UserService,
};
use quizforge_core::{CorrectAnswer, Difficulty, NewUser, QuestionType, UserRole};
use std::fs;
use tempfile::TempDir;

fn file_storage(dir: &TempDir) -> StorageConfig {
    StorageConfig {
        backend: "file".into(),
        data_dir: dir.path().join("data"),
    }
}

fn input(name: &str, parent: Option<&str>) -> CatalogInput {
    CatalogInput {
        name: name.into(),
        description: None,
        slug: None,
        parent: parent.map(str::to_string),
    }
}

async fn seed(db: &Database) -> Topic {
    let catalog = CatalogService::new(db.clone());
    let _: Curriculum = catalog.create(input("IB", None), None).await.unwrap();
    let _: Subject = catalog.create(input("Physics", Some("ib")), None).await.unwrap();
    let _: Course = catalog.create(input("Mechanics", Some("physics")), None).await.unwrap();
    let _: Unit = catalog.create(input("Motion", Some("mechanics")), None).await.unwrap();
    catalog.create(input("Velocity", Some("motion")), None).await.unwrap()
}

#[tokio::test]
async fn file_backend_keeps_users_catalog_and_questions_across_restarts() {
    let dir = TempDir::new().unwrap();
    let storage = file_storage(&dir);

    let topic_id = {
        let db = Database::open(&storage).await.unwrap();
        UserService::new(db.clone())
            .register(NewUser {
                email: "ada@school.test".into(),
                full_name: "Ada".into(),
                role: UserRole::Teacher,
                password: "secret-password".into(),
            })
            .await
            .unwrap();
        let topic = seed(&db).await;
        QuestionService::new(db.clone())
            .create(
                NewQuestion {
                    question_text: "Is velocity a vector?".into(),
                    question_type: QuestionType::TrueFalse,
                    options: vec!["True".into(), "False".into()],
                    correct_answer: CorrectAnswer::Single("True".into()),
                    explanation: Some("It has a direction.".into()),
                    difficulty: Difficulty::Easy,
                    topic_id: topic.entry.id,
                },
                None,
            )
            .await
            .unwrap();
        topic.entry.id
    };

    let db = Database::open(&storage).await.unwrap();
    let user = UserService::new(db.clone())
        .authenticate("ada@school.test", "secret-password")
        .await
        .unwrap();
    assert_eq!(user.role, UserRole::Teacher);

    let path = CatalogService::new(db.clone()).topic_path(topic_id).await.unwrap();
    assert_eq!(path.curriculum.entry.name, "IB");

    let stats = QuestionService::new(db).stats(Some(topic_id)).await.unwrap();
    assert_eq!(stats.total_questions, 1);
}

#[tokio::test]
async fn deleting_a_curriculum_removes_descendants_on_disk() {
    let dir = TempDir::new().unwrap();
    let storage = file_storage(&dir);

    {
        let db = Database::open(&storage).await.unwrap();
        seed(&db).await;
        CatalogService::new(db)
            .delete::<Curriculum>("ib")
            .await
            .unwrap();
    }

    let db = Database::open(&storage).await.unwrap();
    assert_eq!(db.topics().count().await.unwrap(), 0);
    assert_eq!(db.subjects().count().await.unwrap(), 0);
}

#[test]
fn config_file_is_read_and_validated() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("quizforge.toml");
    fs::write(
        &path,
        r#"
[storage]
backend = "memory"

[llm]
temperature = 0.2
"#,
    )
    .unwrap();

    let manager = ConfigManager::from_path(&path).unwrap();
    assert_eq!(manager.config_path(), Some(path.as_path()));
    assert!((manager.config().llm.temperature - 0.2).abs() < 1e-6);

    fs::write(&path, "[storage]\nbackend = \"postgres\"\n").unwrap();
    assert!(matches!(
        ConfigManager::from_path(&path),
        Err(ConfigError::ValidationError(_))
    ));

    assert!(matches!(
        ConfigManager::from_path(&dir.path().join("missing.toml")),
        Err(ConfigError::NotFound(_))
    ));
}
