//! Background worker process (language-understanding server)

use super::CapabilityResult;
use crate::logger::{LOGGER, Logger};
use crate::{Inject, Registration, Resolved, Result, Service, ServiceId, Strategy};
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::sync::Arc;

#[async_trait]
pub trait WorkerProcess: Send + Sync {
    async fn start(&self) -> CapabilityResult<()>;
    async fn stop(&self) -> CapabilityResult<()>;
    fn is_alive(&self) -> bool;
    /// GET `path` on the worker.
    async fn get(&self, path: &str) -> CapabilityResult<Value>;
    /// POST `body` to `path` on the worker.
    async fn post(&self, path: &str, body: Value) -> CapabilityResult<Value>;
}

/// Worker that never spawns anything and answers every request with `{}`.
#[derive(Debug)]
pub struct DummyNluProcess {
    logger: Option<Arc<Logger>>,
}

impl Service for DummyNluProcess {
    fn dependencies() -> Vec<Inject> {
        vec![Inject::new(LOGGER).optional()]
    }

    fn create(deps: &mut Resolved) -> Result<Self> {
        Ok(DummyNluProcess {
            logger: deps.optional(LOGGER)?,
        })
    }
}

impl DummyNluProcess {
    fn trace(&self, message: &str) {
        if let Some(logger) = &self.logger {
            logger.debug(message);
        }
    }
}

#[async_trait]
impl WorkerProcess for DummyNluProcess {
    async fn start(&self) -> CapabilityResult<()> {
        self.trace("Worker start skipped");
        Ok(())
    }

    async fn stop(&self) -> CapabilityResult<()> {
        Ok(())
    }

    fn is_alive(&self) -> bool {
        true
    }

    async fn get(&self, _path: &str) -> CapabilityResult<Value> {
        Ok(Value::Object(Map::new()))
    }

    async fn post(&self, _path: &str, _body: Value) -> CapabilityResult<Value> {
        Ok(Value::Object(Map::new()))
    }
}

/// Singleton stand-in exposed as `dyn WorkerProcess`.
pub fn stub(id: ServiceId) -> Registration {
    Registration::new(
        id,
        Strategy::to_as::<DummyNluProcess, dyn WorkerProcess>(|s| s as Arc<dyn WorkerProcess>),
    )
    .in_singleton_scope()
}
