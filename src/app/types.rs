//! Identifiers of every service the server composes

use crate::{Catalog, Result, ServiceId};

pub use crate::i18n::I18N;
pub use crate::logger::{LOGGER, LOGGER_NAME, LOGGER_PROVIDER};

pub const BOOT_CONFIG: ServiceId = ServiceId::symbol("BootConfig");
pub const IS_PACKAGED: ServiceId = ServiceId::symbol("IsPackaged");
pub const CONFIG_PROVIDER: ServiceId = ServiceId::symbol("ConfigProvider");

pub const DATABASE: ServiceId = ServiceId::symbol("Database");

pub const USER_REPOSITORY: ServiceId = ServiceId::symbol("UserRepository");
pub const WORKSPACE_USERS_REPOSITORY: ServiceId = ServiceId::symbol("WorkspaceUsersRepository");

pub const WORKSPACE_SERVICE: ServiceId = ServiceId::symbol("WorkspaceService");
pub const DATA_RETENTION_SERVICE: ServiceId = ServiceId::symbol("DataRetentionService");
pub const DATA_RETENTION_JANITOR: ServiceId = ServiceId::symbol("DataRetentionJanitor");
pub const MIGRATION_SERVICE: ServiceId = ServiceId::symbol("MigrationService");
pub const MODULE_LOADER: ServiceId = ServiceId::symbol("ModuleLoader");
pub const LOCAL_ACTION_SERVER: ServiceId = ServiceId::symbol("LocalActionServer");
pub const API_PROVIDER: ServiceId = ServiceId::symbol("ApiProvider");
pub const HTTP_SERVER: ServiceId = ServiceId::symbol("HTTPServer");
pub const APPLICATION: ServiceId = ServiceId::symbol("Application");

pub const LOGGER_DB_PERSISTER: ServiceId = ServiceId::symbol("LoggerDbPersister");
pub const LOGGER_FILE_PERSISTER: ServiceId = ServiceId::symbol("LoggerFilePersister");

pub const EVENT_COLLECTOR: ServiceId = ServiceId::symbol("EventCollector");
pub const STATISTICS: ServiceId = ServiceId::symbol("Statistics");

pub const LICENSING_SERVICE: ServiceId = ServiceId::symbol("LicensingService");
pub const AUTH_STRATEGIES: ServiceId = ServiceId::symbol("AuthStrategies");
pub const NLU_SERVER: ServiceId = ServiceId::symbol("NluServer");

/// Plain-key aliases the worker stand-in is also bound under.
pub const NLU_LEGACY_KEYS: [ServiceId; 4] = [
    ServiceId::key("NluServer"),
    ServiceId::key("NluProcess"),
    ServiceId::key("nlu-server"),
    ServiceId::key("nlu"),
];

// Pro module
pub const ALERTING_SERVICE: ServiceId = ServiceId::symbol("AlertingService");
pub const MONITORING_SERVICE: ServiceId = ServiceId::symbol("MonitoringService");

const DECLARED: &[ServiceId] = &[
    BOOT_CONFIG,
    IS_PACKAGED,
    CONFIG_PROVIDER,
    LOGGER,
    LOGGER_NAME,
    LOGGER_PROVIDER,
    I18N,
    DATABASE,
    USER_REPOSITORY,
    WORKSPACE_USERS_REPOSITORY,
    WORKSPACE_SERVICE,
    DATA_RETENTION_SERVICE,
    DATA_RETENTION_JANITOR,
    MIGRATION_SERVICE,
    MODULE_LOADER,
    LOCAL_ACTION_SERVER,
    API_PROVIDER,
    HTTP_SERVER,
    APPLICATION,
    LOGGER_DB_PERSISTER,
    LOGGER_FILE_PERSISTER,
    EVENT_COLLECTOR,
    STATISTICS,
    LICENSING_SERVICE,
    AUTH_STRATEGIES,
    NLU_SERVER,
    NLU_LEGACY_KEYS[0],
    NLU_LEGACY_KEYS[1],
    NLU_LEGACY_KEYS[2],
    NLU_LEGACY_KEYS[3],
    ALERTING_SERVICE,
    MONITORING_SERVICE,
];

/// The closed set of identifiers the server may bind.
pub fn catalog() -> Result<Catalog> {
    Catalog::new(DECLARED)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_has_no_collisions() {
        let catalog = catalog().unwrap();
        assert_eq!(catalog.len(), DECLARED.len());
    }

    #[test]
    fn test_symbol_and_key_are_distinct() {
        let catalog = catalog().unwrap();
        assert!(catalog.contains(NLU_SERVER));
        assert!(catalog.contains(ServiceId::key("NluServer")));
        assert_ne!(NLU_SERVER, NLU_LEGACY_KEYS[0]);
    }

    #[test]
    fn test_find_by_name() {
        let catalog = catalog().unwrap();
        assert_eq!(catalog.find("HTTPServer"), Some(HTTP_SERVER));
        assert_eq!(catalog.find("Symbol(MigrationService)"), Some(MIGRATION_SERVICE));
        assert_eq!(catalog.find("nlu-server"), Some(NLU_LEGACY_KEYS[2]));
        assert_eq!(catalog.find("Nope"), None);
    }
}
