//! Binding batches, in load order

use super::services::*;
use super::types::*;
use crate::{Concrete, Registration, RegistryModule, Service, ServiceId, binding, i18n};

fn disposable<S: Service + crate::Dispose>(id: ServiceId) -> Registration {
    Registration::new(id, Concrete::<S>::new().disposable()).in_singleton_scope()
}

pub fn database() -> RegistryModule {
    RegistryModule::new("database").with(disposable::<Database>(DATABASE))
}

pub fn repositories() -> RegistryModule {
    RegistryModule::new("repositories")
        .with(binding!(singleton USER_REPOSITORY => UserRepository))
        .with(binding!(singleton WORKSPACE_USERS_REPOSITORY => WorkspaceUsersRepository))
}

pub fn services() -> RegistryModule {
    RegistryModule::new("services")
        .with(i18n::registration())
        .with(binding!(singleton DATA_RETENTION_SERVICE => DataRetentionService))
        .with(disposable::<DataRetentionJanitor>(DATA_RETENTION_JANITOR))
        .with(binding!(singleton WORKSPACE_SERVICE => WorkspaceService))
        .with(binding!(singleton MIGRATION_SERVICE => MigrationService))
        .with(binding!(singleton LOCAL_ACTION_SERVER => LocalActionServer))
        .with(binding!(singleton MODULE_LOADER => ModuleLoader))
        .with(binding!(singleton API_PROVIDER => ApiProvider))
        .with(binding!(singleton HTTP_SERVER => HttpServer))
        .with(binding!(singleton APPLICATION => Application))
        .with(binding!(singleton LOGGER_DB_PERSISTER => LoggerDbPersister))
        .with(binding!(singleton LOGGER_FILE_PERSISTER => LoggerFilePersister))
}

pub fn telemetry() -> RegistryModule {
    RegistryModule::new("telemetry")
        .with(disposable::<EventCollector>(EVENT_COLLECTOR))
        .with(binding!(singleton STATISTICS => AnalyticsService))
}

/// Loaded only behind the pro activation gate.
pub fn pro() -> RegistryModule {
    RegistryModule::new("pro")
        .with(binding!(singleton ALERTING_SERVICE => AlertingService))
        .with(binding!(singleton MONITORING_SERVICE => MonitoringService))
}

/// Always-loaded batches, storage layer first.
pub fn core_modules() -> Vec<RegistryModule> {
    vec![database(), repositories(), services(), telemetry()]
}
