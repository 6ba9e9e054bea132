//! Licensing status provider

use super::CapabilityResult;
use crate::{Registration, Resolved, Result, Service, ServiceId, Strategy};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::SystemTime;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LicenseStatus {
    pub status: String,
    pub breach_reasons: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LicenseInfo {
    pub label: String,
    pub fingerprint_type: String,
    pub fingerprint: String,
    pub start_date: SystemTime,
    pub end_date: SystemTime,
    pub offline: bool,
    pub paid_until: SystemTime,
    pub versions: String,
    pub support: String,
    pub audit_token: String,
    pub limits: Vec<String>,
    pub manual_refresh: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditReport {
    pub super_admins_count: u32,
    pub collaborators_count: u32,
}

#[async_trait]
pub trait LicensingService: Send + Sync {
    fn install_protection(&self);
    async fn refresh_license_key(&self) -> CapabilityResult<bool>;
    async fn replace_license_key(&self, license_key: &str) -> CapabilityResult<bool>;
    async fn get_license_status(&self) -> CapabilityResult<LicenseStatus>;
    async fn get_license_info(&self, license_key: Option<&str>) -> CapabilityResult<LicenseInfo>;
    async fn get_license_key(&self) -> CapabilityResult<String>;
    async fn get_fingerprint(&self, fingerprint_type: &str) -> CapabilityResult<String>;
    async fn audit_licensing(&self, audit_token: &str) -> CapabilityResult<Option<AuditReport>>;
}

/// Always-licensed stand-in.
#[derive(Debug, Default)]
pub struct DummyLicensingService;

impl Service for DummyLicensingService {
    fn create(_: &mut Resolved) -> Result<Self> {
        Ok(DummyLicensingService)
    }
}

#[async_trait]
impl LicensingService for DummyLicensingService {
    fn install_protection(&self) {}

    async fn refresh_license_key(&self) -> CapabilityResult<bool> {
        Ok(true)
    }

    async fn replace_license_key(&self, _license_key: &str) -> CapabilityResult<bool> {
        Ok(true)
    }

    async fn get_license_status(&self) -> CapabilityResult<LicenseStatus> {
        Ok(LicenseStatus {
            status: "licensed".to_owned(),
            breach_reasons: Vec::new(),
        })
    }

    async fn get_license_info(&self, _license_key: Option<&str>) -> CapabilityResult<LicenseInfo> {
        let now = SystemTime::now();
        Ok(LicenseInfo {
            label: "Community Unlocked".to_owned(),
            fingerprint_type: "machine_v1".to_owned(),
            fingerprint: "dummy".to_owned(),
            start_date: now,
            end_date: now,
            offline: true,
            paid_until: now,
            versions: "v12".to_owned(),
            support: "standard".to_owned(),
            audit_token: "dummy".to_owned(),
            limits: Vec::new(),
            manual_refresh: false,
        })
    }

    async fn get_license_key(&self) -> CapabilityResult<String> {
        Ok("dummy-key".to_owned())
    }

    async fn get_fingerprint(&self, _fingerprint_type: &str) -> CapabilityResult<String> {
        Ok("dummy-fingerprint".to_owned())
    }

    async fn audit_licensing(&self, _audit_token: &str) -> CapabilityResult<Option<AuditReport>> {
        Ok(Some(AuditReport {
            super_admins_count: 9999,
            collaborators_count: 9999,
        }))
    }
}

/// Singleton stand-in exposed as `dyn LicensingService`.
pub fn stub(id: ServiceId) -> Registration {
    Registration::new(
        id,
        Strategy::to_as::<DummyLicensingService, dyn LicensingService>(|s| {
            s as Arc<dyn LicensingService>
        }),
    )
    .in_singleton_scope()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Registry;

    const LICENSING: ServiceId = ServiceId::symbol("LicensingService");

    #[tokio::test]
    async fn test_stub_reports_licensed() {
        let registry = Registry::new();
        registry.bind(stub(LICENSING)).unwrap();

        let licensing = registry.get_dyn::<dyn LicensingService>(LICENSING).unwrap();
        licensing.install_protection();

        assert!(licensing.refresh_license_key().await.unwrap());
        assert!(licensing.replace_license_key("abc").await.unwrap());

        let status = licensing.get_license_status().await.unwrap();
        assert_eq!(status.status, "licensed");
        assert!(status.breach_reasons.is_empty());

        let info = licensing.get_license_info(None).await.unwrap();
        assert_eq!(info.label, "Community Unlocked");
        assert!(info.offline);

        assert_eq!(licensing.get_license_key().await.unwrap(), "dummy-key");
        assert_eq!(
            licensing.get_fingerprint("machine_v1").await.unwrap(),
            "dummy-fingerprint"
        );

        let audit = licensing.audit_licensing("token").await.unwrap().unwrap();
        assert_eq!(audit.super_admins_count, 9999);
        assert_eq!(audit.collaborators_count, 9999);
    }

    #[test]
    fn test_status_wire_shape() {
        let status = LicenseStatus {
            status: "licensed".into(),
            breach_reasons: Vec::new(),
        };
        assert_eq!(
            serde_json::to_value(&status).unwrap(),
            serde_json::json!({ "status": "licensed", "breachReasons": [] })
        );
    }
}
