//! Composition root of the server
//!
//! [`compose`] fills a registry in a fixed order:
//!
//! 1. core bindings (configuration, packaging flag, loggers)
//! 2. module batches: database, repositories, services, telemetry
//! 3. patches: stand-ins for licensing, auth strategies and the NLU worker,
//!    applied with `bind_or_replace`
//! 4. the pro batch, behind its activation gate
//!
//! [`bootstrap`] then runs the lifecycle hooks and returns the locked registry.

pub mod modules;
pub mod services;
pub mod types;

use crate::capabilities::{auth, licensing, nlu};
use crate::config::BootConfig;
use crate::lifecycle::LifecycleReport;
use crate::logger::logger_registrations;
use crate::{ActivationGate, DiError, Registration, Registry, Result, ServiceId, Strategy};
use tracing::info;
use types::*;

/// A booted registry plus what the lifecycle passes did.
#[derive(Debug)]
pub struct Composition {
    pub registry: Registry,
    pub report: LifecycleReport,
}

fn core_bindings(registry: &Registry, config: &BootConfig) -> Result<()> {
    registry.bind(Registration::new(BOOT_CONFIG, Strategy::constant(config.clone())))?;
    registry.bind(Registration::new(
        IS_PACKAGED,
        Strategy::constant(config.is_packaged()),
    ))?;
    registry.bind(
        Registration::new(CONFIG_PROVIDER, Strategy::to::<services::ConfigProvider>())
            .in_singleton_scope(),
    )?;
    logger_registrations()
        .into_iter()
        .try_for_each(|reg| registry.bind(reg))
}

/// Substitute stand-ins for optional subsystems.
pub fn apply_patches(registry: &Registry) -> Result<()> {
    registry.bind_or_replace(licensing::stub(LICENSING_SERVICE))?;
    registry.bind_or_replace(auth::stub(AUTH_STRATEGIES))?;
    registry.bind_or_replace(nlu::stub(NLU_SERVER))?;
    for key in NLU_LEGACY_KEYS {
        registry.bind_or_replace(nlu::stub(key))?;
    }
    Ok(())
}

/// Fill a registry; lifecycle hooks have not run yet.
pub fn compose(config: &BootConfig) -> Result<Registry> {
    let registry = Registry::with_catalog(catalog()?);

    core_bindings(&registry, config)?;
    registry.load(&modules::core_modules())?;
    apply_patches(&registry)?;

    let gate = ActivationGate::new("pro", config.pro_enabled);
    registry.load_if(&gate, &[modules::pro()])?;

    Ok(registry)
}

/// Map configured eager names onto declared identifiers.
pub fn eager_ids(config: &BootConfig) -> Result<Vec<ServiceId>> {
    let catalog = catalog()?;
    config
        .eager
        .iter()
        .map(|name| {
            catalog
                .find(name)
                .ok_or_else(|| DiError::Config(format!("Unknown eager service: {name}")))
        })
        .collect()
}

/// Compose the registry and run the lifecycle hooks once.
pub fn bootstrap(config: &BootConfig) -> Result<Composition> {
    let eager = eager_ids(config)?;
    let registry = compose(config)?;
    let report = registry.run_lifecycle_hooks(&eager)?;

    info!(
        target: "service_composer",
        bindings = registry.len(),
        pro_enabled = config.pro_enabled,
        "Registry composed"
    );

    Ok(Composition { registry, report })
}

#[cfg(test)]
mod tests {
    use super::services::*;
    use super::*;
    use crate::capabilities::{AuthStrategies, LicensingService, WorkerProcess};
    use crate::{Lifetime, OverrideOutcome};
    use std::sync::Arc;

    fn config() -> BootConfig {
        BootConfig {
            is_packaged: Some(false),
            ..BootConfig::default()
        }
    }

    #[test]
    fn test_bootstrap_resolves_application() {
        let Composition { registry, .. } = bootstrap(&config()).unwrap();
        assert!(registry.is_locked());

        let app = registry.get::<Application>(APPLICATION).unwrap();
        assert_eq!(app.logger.name(), "Server");
        assert_eq!(app.http.logger.name(), "HTTPServer");
        assert_eq!(app.migrations.logger.name(), "Migration");
        assert_eq!(app.api.workspaces.logger.name(), "WorkspaceService");
        assert!(app.nlu.is_alive());

        let db = registry.get::<Database>(DATABASE).unwrap();
        assert!(Arc::ptr_eq(&db, &app.migrations.db));
    }

    #[test]
    fn test_patches_bound_under_every_key() {
        let registry = compose(&config()).unwrap();

        assert!(registry.get_dyn::<dyn LicensingService>(LICENSING_SERVICE).is_ok());
        assert!(registry.get_dyn::<dyn AuthStrategies>(AUTH_STRATEGIES).is_ok());
        for key in std::iter::once(NLU_SERVER).chain(NLU_LEGACY_KEYS) {
            let worker = registry.get_dyn::<dyn WorkerProcess>(key).unwrap();
            assert!(worker.is_alive());
            assert_eq!(registry.lifetime_of(key), Some(Lifetime::Singleton));
        }
    }

    #[test]
    fn test_patches_replace_on_second_apply() {
        let registry = compose(&config()).unwrap();
        assert_eq!(
            registry
                .bind_or_replace(nlu::stub(NLU_LEGACY_KEYS[3]))
                .unwrap(),
            OverrideOutcome::Replaced
        );
        apply_patches(&registry).unwrap();
    }

    #[test]
    fn test_pro_gate_closed() {
        let Composition { registry, .. } = bootstrap(&config()).unwrap();

        registry.get::<Application>(APPLICATION).unwrap();
        assert!(registry.resolve(ALERTING_SERVICE).unwrap_err().is_unknown_binding());
        assert!(registry.resolve(MONITORING_SERVICE).unwrap_err().is_unknown_binding());
    }

    #[test]
    fn test_pro_gate_open() {
        let config = BootConfig {
            pro_enabled: true,
            ..config()
        };
        let Composition { registry, .. } = bootstrap(&config).unwrap();

        let monitoring = registry.get::<MonitoringService>(MONITORING_SERVICE).unwrap();
        assert_eq!(monitoring.logger.name(), "MonitoringService");
        assert!(registry.resolve(ALERTING_SERVICE).is_ok());
    }

    #[test]
    fn test_eager_from_config() {
        let config = BootConfig {
            eager: vec!["HTTPServer".into(), "Symbol(Statistics)".into()],
            ..config()
        };
        let Composition { registry, report } = bootstrap(&config).unwrap();

        assert_eq!(report.eager, vec![HTTP_SERVER, STATISTICS]);
        assert!(registry.is_constructed(HTTP_SERVER));
        assert!(registry.is_constructed(DATABASE));
        assert!(!registry.is_constructed(APPLICATION));
    }

    #[test]
    fn test_unknown_eager_name_is_fatal() {
        let config = BootConfig {
            eager: vec!["Nope".into()],
            ..config()
        };
        assert!(matches!(bootstrap(&config), Err(DiError::Config(_))));
    }

    #[test]
    fn test_report_lists_disposables() {
        let Composition { report, .. } = bootstrap(&config()).unwrap();
        assert!(report.disposable.contains(&DATABASE));
        assert!(report.disposable.contains(&EVENT_COLLECTOR));
        assert!(report.disposable.contains(&DATA_RETENTION_JANITOR));
    }

    #[tokio::test]
    async fn test_shutdown_releases_constructed() {
        let Composition { registry, .. } = bootstrap(&config()).unwrap();
        let db = registry.get::<Database>(DATABASE).unwrap();
        let events = registry.get::<EventCollector>(EVENT_COLLECTOR).unwrap();
        events.collect();

        assert_eq!(registry.shutdown().await, 2);
        assert!(!db.is_open());
        assert!(!events.has_pending());
    }

    #[tokio::test]
    async fn test_application_start_stop() {
        let Composition { registry, .. } = bootstrap(&config()).unwrap();
        let app = registry.get::<Application>(APPLICATION).unwrap();
        app.start().await.unwrap();
        app.stop().await;
    }

    #[test]
    fn test_module_logger_via_provider() {
        let Composition { registry, .. } = bootstrap(&config()).unwrap();
        let loader = registry.get::<ModuleLoader>(MODULE_LOADER).unwrap();
        assert_eq!(loader.logger.name(), "ModuleLoader");
        assert_eq!(loader.module_logger("analytics").unwrap().name(), "Mod[analytics]");
    }
}
