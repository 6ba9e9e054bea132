//! Pluggable authentication-strategy registry

use crate::{Registration, Resolved, Result, Service, ServiceId, Strategy};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// One configured authentication strategy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthStrategy {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub options: serde_json::Value,
}

pub trait AuthStrategies: Send + Sync {
    fn register_strategy(&self, strategy: AuthStrategy);
    fn strategies(&self) -> Vec<AuthStrategy>;
    fn setup(&self);
}

/// Registry that accepts nothing and lists nothing.
#[derive(Debug, Default)]
pub struct DummyAuthStrategies;

impl Service for DummyAuthStrategies {
    fn create(_: &mut Resolved) -> Result<Self> {
        Ok(DummyAuthStrategies)
    }
}

impl AuthStrategies for DummyAuthStrategies {
    fn register_strategy(&self, _strategy: AuthStrategy) {}

    fn strategies(&self) -> Vec<AuthStrategy> {
        Vec::new()
    }

    fn setup(&self) {}
}

/// Singleton stand-in exposed as `dyn AuthStrategies`.
pub fn stub(id: ServiceId) -> Registration {
    Registration::new(
        id,
        Strategy::to_as::<DummyAuthStrategies, dyn AuthStrategies>(|s| {
            s as Arc<dyn AuthStrategies>
        }),
    )
    .in_singleton_scope()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Registry;

    const AUTH: ServiceId = ServiceId::symbol("AuthStrategies");

    #[test]
    fn test_stub_lists_nothing() {
        let registry = Registry::new();
        registry.bind(stub(AUTH)).unwrap();

        let auth = registry.get_dyn::<dyn AuthStrategies>(AUTH).unwrap();
        auth.register_strategy(AuthStrategy {
            id: "default".into(),
            kind: "basic".into(),
            options: serde_json::Value::Null,
        });
        auth.setup();
        assert!(auth.strategies().is_empty());
    }

    #[test]
    fn test_strategy_deserialize() {
        let strategy: AuthStrategy =
            serde_json::from_str(r#"{ "id": "sso", "type": "oauth2" }"#).unwrap();
        assert_eq!(strategy.kind, "oauth2");
        assert!(strategy.options.is_null());
    }
}
