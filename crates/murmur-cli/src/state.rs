//! Application state wiring the controller to its infrastructure.
//!
//! The session controller is generic over repository traits; AppState pins
//! it to the concrete SQLite implementations and the OpenAI client, and
//! stands in for the external auth boundary with a stable local identity.

use std::path::{Path, PathBuf};

use murmur_core::llm::BoxCompletionClient;
use murmur_core::session::SessionController;
use murmur_infra::crypto::VaultCrypto;
use murmur_infra::llm::OpenAiCompletionClient;
use murmur_infra::paths::resolve_data_dir;
use murmur_infra::sqlite::chat::SqliteChatRepository;
use murmur_infra::sqlite::personality::SqlitePersonalityRepository;
use murmur_infra::sqlite::pool::DatabasePool;
use murmur_infra::sqlite::settings::SqliteSettingsRepository;
use murmur_types::user::UserId;

/// Concrete controller type pinned to the infra implementations.
pub type ConcreteController =
    SessionController<SqliteChatRepository, SqliteSettingsRepository, SqlitePersonalityRepository>;

/// Shared application state for all CLI commands.
pub struct AppState {
    pub controller: ConcreteController,
    pub data_dir: PathBuf,
}

impl AppState {
    /// Initialize: resolve the data dir, connect to the database, wire the
    /// controller, and sign in the local user.
    pub async fn init() -> anyhow::Result<Self> {
        let data_dir = resolve_data_dir();
        tokio::fs::create_dir_all(&data_dir).await?;

        let db_url = format!("sqlite://{}?mode=rwc", data_dir.join("murmur.db").display());
        let pool = DatabasePool::new(&db_url).await?;

        let vault = VaultCrypto::from_key_file(&data_dir.join("vault.key"))?;

        let base_url = std::env::var("MURMUR_API_BASE_URL").ok();
        let client = match base_url {
            Some(url) => OpenAiCompletionClient::with_base_url(url),
            None => OpenAiCompletionClient::new(),
        };

        let mut controller = SessionController::new(
            SqliteChatRepository::new(pool.clone()),
            SqliteSettingsRepository::new(pool.clone(), vault),
            SqlitePersonalityRepository::new(pool),
            BoxCompletionClient::new(client),
        );

        // The auth boundary is external; a stable per-machine identity
        // stands in for it here.
        let user_id = load_or_create_user_id(&data_dir)?;
        controller.set_user(Some(user_id)).await?;

        Ok(Self {
            controller,
            data_dir,
        })
    }
}

/// Read the local user id from `user.id`, minting one on first run.
fn load_or_create_user_id(data_dir: &Path) -> anyhow::Result<UserId> {
    let path = data_dir.join("user.id");
    if path.exists() {
        let contents = std::fs::read_to_string(&path)?;
        let user_id = contents
            .trim()
            .parse::<UserId>()
            .map_err(|e| anyhow::anyhow!("corrupt user.id file: {e}"))?;
        Ok(user_id)
    } else {
        let user_id = UserId::new();
        std::fs::write(&path, user_id.to_string())?;
        Ok(user_id)
    }
}
