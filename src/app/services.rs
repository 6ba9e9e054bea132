//! Server services wired by the composition root
//!
//! Only their construction graph lives here: what each service depends on,
//! which ones hold resources released at shutdown, and which logger name each
//! one receives.

use super::types::*;
use crate::capabilities::{AuthStrategies, LicensingService, WorkerProcess};
use crate::config::BootConfig;
use crate::logger::{Logger, LoggerProvider};
use crate::{Dispose, Inject, Resolved, Result, Service};
use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

// =============================================================================
// Configuration
// =============================================================================

pub struct ConfigProvider {
    config: Arc<BootConfig>,
    is_packaged: bool,
}

impl Service for ConfigProvider {
    fn dependencies() -> Vec<Inject> {
        vec![Inject::new(BOOT_CONFIG), Inject::new(IS_PACKAGED)]
    }

    fn create(deps: &mut Resolved) -> Result<Self> {
        Ok(ConfigProvider {
            config: deps.get(BOOT_CONFIG)?,
            is_packaged: *deps.get::<bool>(IS_PACKAGED)?,
        })
    }
}

impl ConfigProvider {
    pub fn config(&self) -> &BootConfig {
        &self.config
    }

    /// Data lives next to the executable when packaged, in the working
    /// directory otherwise.
    pub fn data_dir(&self) -> PathBuf {
        let base = if self.is_packaged {
            std::env::current_exe()
                .ok()
                .and_then(|exe| exe.parent().map(PathBuf::from))
                .unwrap_or_default()
        } else {
            PathBuf::from(".")
        };
        base.join("data")
    }

    pub fn is_packaged(&self) -> bool {
        self.is_packaged
    }
}

// =============================================================================
// Storage layer
// =============================================================================

pub struct Database {
    logger: Arc<Logger>,
    location: PathBuf,
    open: AtomicBool,
}

impl Service for Database {
    fn dependencies() -> Vec<Inject> {
        vec![Inject::new(LOGGER), Inject::new(CONFIG_PROVIDER)]
    }

    fn create(deps: &mut Resolved) -> Result<Self> {
        let config = deps.get::<ConfigProvider>(CONFIG_PROVIDER)?;
        Ok(Database {
            logger: deps.get(LOGGER)?,
            location: config.data_dir().join("storage.sqlite"),
            open: AtomicBool::new(true),
        })
    }
}

impl Database {
    pub fn location(&self) -> &PathBuf {
        &self.location
    }

    pub fn is_open(&self) -> bool {
        self.open.load(Ordering::Acquire)
    }
}

#[async_trait]
impl Dispose for Database {
    async fn dispose(&self) {
        self.open.store(false, Ordering::Release);
        self.logger.info("Database connection closed");
    }
}

// =============================================================================
// Repositories
// =============================================================================

pub struct UserRepository {
    pub db: Arc<Database>,
}

impl Service for UserRepository {
    fn dependencies() -> Vec<Inject> {
        vec![Inject::new(DATABASE)]
    }

    fn create(deps: &mut Resolved) -> Result<Self> {
        Ok(UserRepository {
            db: deps.get(DATABASE)?,
        })
    }
}

pub struct WorkspaceUsersRepository {
    pub db: Arc<Database>,
}

impl Service for WorkspaceUsersRepository {
    fn dependencies() -> Vec<Inject> {
        vec![Inject::new(DATABASE)]
    }

    fn create(deps: &mut Resolved) -> Result<Self> {
        Ok(WorkspaceUsersRepository {
            db: deps.get(DATABASE)?,
        })
    }
}

// =============================================================================
// Services
// =============================================================================

pub struct WorkspaceService {
    pub logger: Arc<Logger>,
    pub users: Arc<WorkspaceUsersRepository>,
}

impl Service for WorkspaceService {
    fn dependencies() -> Vec<Inject> {
        vec![Inject::new(LOGGER), Inject::new(WORKSPACE_USERS_REPOSITORY)]
    }

    fn create(deps: &mut Resolved) -> Result<Self> {
        Ok(WorkspaceService {
            logger: deps.get(LOGGER)?,
            users: deps.get(WORKSPACE_USERS_REPOSITORY)?,
        })
    }
}

pub struct DataRetentionService {
    pub users: Arc<UserRepository>,
}

impl Service for DataRetentionService {
    fn dependencies() -> Vec<Inject> {
        vec![Inject::new(USER_REPOSITORY)]
    }

    fn create(deps: &mut Resolved) -> Result<Self> {
        Ok(DataRetentionService {
            users: deps.get(USER_REPOSITORY)?,
        })
    }
}

pub struct DataRetentionJanitor {
    logger: Arc<Logger>,
    pub retention: Arc<DataRetentionService>,
    running: AtomicBool,
}

impl Service for DataRetentionJanitor {
    fn dependencies() -> Vec<Inject> {
        vec![
            Inject::named(LOGGER, "Retention Janitor"),
            Inject::new(DATA_RETENTION_SERVICE),
        ]
    }

    fn create(deps: &mut Resolved) -> Result<Self> {
        Ok(DataRetentionJanitor {
            logger: deps.get_named(LOGGER, "Retention Janitor")?,
            retention: deps.get(DATA_RETENTION_SERVICE)?,
            running: AtomicBool::new(true),
        })
    }
}

impl DataRetentionJanitor {
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }
}

#[async_trait]
impl Dispose for DataRetentionJanitor {
    async fn dispose(&self) {
        self.running.store(false, Ordering::Release);
        self.logger.debug("Janitor stopped");
    }
}

pub struct MigrationService {
    pub logger: Arc<Logger>,
    pub db: Arc<Database>,
}

impl Service for MigrationService {
    fn dependencies() -> Vec<Inject> {
        vec![Inject::named(LOGGER, "Migration"), Inject::new(DATABASE)]
    }

    fn create(deps: &mut Resolved) -> Result<Self> {
        Ok(MigrationService {
            logger: deps.get_named(LOGGER, "Migration")?,
            db: deps.get(DATABASE)?,
        })
    }
}

pub struct ModuleLoader {
    pub logger: Arc<Logger>,
    pub loggers: Arc<LoggerProvider>,
}

impl Service for ModuleLoader {
    fn dependencies() -> Vec<Inject> {
        vec![Inject::new(LOGGER), Inject::new(LOGGER_PROVIDER)]
    }

    fn create(deps: &mut Resolved) -> Result<Self> {
        Ok(ModuleLoader {
            logger: deps.get(LOGGER)?,
            loggers: deps.get(LOGGER_PROVIDER)?,
        })
    }
}

impl ModuleLoader {
    /// Logger for a dynamically loaded module.
    pub fn module_logger(&self, module: &str) -> Result<Arc<Logger>> {
        self.loggers.get(&format!("Mod[{module}]"))
    }
}

pub struct LocalActionServer {
    pub logger: Arc<Logger>,
    pub config: Arc<ConfigProvider>,
}

impl Service for LocalActionServer {
    fn dependencies() -> Vec<Inject> {
        vec![Inject::new(LOGGER), Inject::new(CONFIG_PROVIDER)]
    }

    fn create(deps: &mut Resolved) -> Result<Self> {
        Ok(LocalActionServer {
            logger: deps.get(LOGGER)?,
            config: deps.get(CONFIG_PROVIDER)?,
        })
    }
}

pub struct ApiProvider {
    pub module_loader: Arc<ModuleLoader>,
    pub workspaces: Arc<WorkspaceService>,
}

impl Service for ApiProvider {
    fn dependencies() -> Vec<Inject> {
        vec![Inject::new(MODULE_LOADER), Inject::new(WORKSPACE_SERVICE)]
    }

    fn create(deps: &mut Resolved) -> Result<Self> {
        Ok(ApiProvider {
            module_loader: deps.get(MODULE_LOADER)?,
            workspaces: deps.get(WORKSPACE_SERVICE)?,
        })
    }
}

pub struct HttpServer {
    pub logger: Arc<Logger>,
    pub config: Arc<ConfigProvider>,
    pub workspaces: Arc<WorkspaceService>,
    pub auth: Arc<dyn AuthStrategies>,
    pub licensing: Arc<dyn LicensingService>,
}

impl Service for HttpServer {
    fn dependencies() -> Vec<Inject> {
        vec![
            Inject::named(LOGGER, "HTTPServer"),
            Inject::new(CONFIG_PROVIDER),
            Inject::new(WORKSPACE_SERVICE),
            Inject::new(AUTH_STRATEGIES),
            Inject::new(LICENSING_SERVICE),
        ]
    }

    fn create(deps: &mut Resolved) -> Result<Self> {
        Ok(HttpServer {
            logger: deps.get_named(LOGGER, "HTTPServer")?,
            config: deps.get(CONFIG_PROVIDER)?,
            workspaces: deps.get(WORKSPACE_SERVICE)?,
            auth: deps.get_dyn(AUTH_STRATEGIES)?,
            licensing: deps.get_dyn(LICENSING_SERVICE)?,
        })
    }
}

// =============================================================================
// Logging persistence
// =============================================================================

pub struct LoggerDbPersister {
    pub db: Arc<Database>,
}

impl Service for LoggerDbPersister {
    fn dependencies() -> Vec<Inject> {
        vec![Inject::new(DATABASE)]
    }

    fn create(deps: &mut Resolved) -> Result<Self> {
        Ok(LoggerDbPersister {
            db: deps.get(DATABASE)?,
        })
    }
}

pub struct LoggerFilePersister {
    pub directory: PathBuf,
}

impl Service for LoggerFilePersister {
    fn dependencies() -> Vec<Inject> {
        vec![Inject::new(CONFIG_PROVIDER)]
    }

    fn create(deps: &mut Resolved) -> Result<Self> {
        let config = deps.get::<ConfigProvider>(CONFIG_PROVIDER)?;
        Ok(LoggerFilePersister {
            directory: config.data_dir().join("logs"),
        })
    }
}

// =============================================================================
// Telemetry
// =============================================================================

pub struct EventCollector {
    logger: Arc<Logger>,
    pub db: Arc<Database>,
    pending: AtomicBool,
}

impl Service for EventCollector {
    fn dependencies() -> Vec<Inject> {
        vec![Inject::new(LOGGER), Inject::new(DATABASE)]
    }

    fn create(deps: &mut Resolved) -> Result<Self> {
        Ok(EventCollector {
            logger: deps.get(LOGGER)?,
            db: deps.get(DATABASE)?,
            pending: AtomicBool::new(false),
        })
    }
}

impl EventCollector {
    pub fn collect(&self) {
        self.pending.store(true, Ordering::Release);
    }

    pub fn has_pending(&self) -> bool {
        self.pending.load(Ordering::Acquire)
    }
}

#[async_trait]
impl Dispose for EventCollector {
    async fn dispose(&self) {
        if self.pending.swap(false, Ordering::AcqRel) {
            self.logger.debug("Flushed pending events");
        }
    }
}

pub struct AnalyticsService {
    pub logger: Arc<Logger>,
    pub db: Arc<Database>,
}

impl Service for AnalyticsService {
    fn dependencies() -> Vec<Inject> {
        vec![Inject::new(LOGGER), Inject::new(DATABASE)]
    }

    fn create(deps: &mut Resolved) -> Result<Self> {
        Ok(AnalyticsService {
            logger: deps.get(LOGGER)?,
            db: deps.get(DATABASE)?,
        })
    }
}

// =============================================================================
// Application
// =============================================================================

pub struct Application {
    pub logger: Arc<Logger>,
    pub http: Arc<HttpServer>,
    pub migrations: Arc<MigrationService>,
    pub api: Arc<ApiProvider>,
    pub nlu: Arc<dyn WorkerProcess>,
}

impl Service for Application {
    fn dependencies() -> Vec<Inject> {
        vec![
            Inject::named(LOGGER, "Server"),
            Inject::new(HTTP_SERVER),
            Inject::new(MIGRATION_SERVICE),
            Inject::new(API_PROVIDER),
            Inject::new(NLU_SERVER),
        ]
    }

    fn create(deps: &mut Resolved) -> Result<Self> {
        Ok(Application {
            logger: deps.get_named(LOGGER, "Server")?,
            http: deps.get(HTTP_SERVER)?,
            migrations: deps.get(MIGRATION_SERVICE)?,
            api: deps.get(API_PROVIDER)?,
            nlu: deps.get_dyn(NLU_SERVER)?,
        })
    }
}

impl Application {
    /// Bring up background workers.
    pub async fn start(&self) -> Result<()> {
        self.nlu
            .start()
            .await
            .map_err(|e| crate::DiError::construction(NLU_SERVER, e))?;
        self.logger.info("Server started");
        Ok(())
    }

    pub async fn stop(&self) {
        if let Err(err) = self.nlu.stop().await {
            self.logger.warn(&format!("Worker did not stop cleanly: {err}"));
        }
    }
}

// =============================================================================
// Pro
// =============================================================================

pub struct AlertingService {
    pub logger: Arc<Logger>,
    pub events: Arc<EventCollector>,
}

impl Service for AlertingService {
    fn dependencies() -> Vec<Inject> {
        vec![Inject::new(LOGGER), Inject::new(EVENT_COLLECTOR)]
    }

    fn create(deps: &mut Resolved) -> Result<Self> {
        Ok(AlertingService {
            logger: deps.get(LOGGER)?,
            events: deps.get(EVENT_COLLECTOR)?,
        })
    }
}

pub struct MonitoringService {
    pub logger: Arc<Logger>,
    pub analytics: Arc<AnalyticsService>,
}

impl Service for MonitoringService {
    fn dependencies() -> Vec<Inject> {
        vec![Inject::new(LOGGER), Inject::new(STATISTICS)]
    }

    fn create(deps: &mut Resolved) -> Result<Self> {
        Ok(MonitoringService {
            logger: deps.get(LOGGER)?,
            analytics: deps.get(STATISTICS)?,
        })
    }
}
