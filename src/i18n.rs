//! String-resolution service and the translation loader
//!
//! The loader is a one-shot collaborator: at startup it merges locale bundles
//! into the [`LanguageService`] bound under [`I18N`], if one is bound, and
//! initialises it.

use crate::{DiError, Registration, Registry, Resolved, Result, Service, ServiceId, Strategy};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::{PoisonError, RwLock};
use tracing::{debug, info};

pub const I18N: ServiceId = ServiceId::symbol("LanguageService");

pub const FALLBACK_LOCALE: &str = "en";

/// Locale code to string bundle.
pub type Bundles = BTreeMap<String, Value>;

#[derive(Debug, Default)]
struct Strings {
    locale: Option<String>,
    bundles: Bundles,
}

/// Resolves dotted keys (`admin.sideMenu.title`) against the active locale,
/// falling back to `en` and then to the key itself.
#[derive(Debug, Default)]
pub struct LanguageService {
    strings: RwLock<Strings>,
}

impl Service for LanguageService {
    fn create(_: &mut Resolved) -> Result<Self> {
        Ok(LanguageService::default())
    }
}

impl LanguageService {
    /// Merge bundles; keys already present are overwritten.
    pub fn extend(&self, bundles: Bundles) {
        let mut strings = self.strings.write().unwrap_or_else(PoisonError::into_inner);
        for (locale, bundle) in bundles {
            let target = strings
                .bundles
                .entry(locale)
                .or_insert_with(|| Value::Object(Map::new()));
            merge(target, bundle);
        }
    }

    /// Activate `locale`.
    pub fn init(&self, locale: &str) {
        let mut strings = self.strings.write().unwrap_or_else(PoisonError::into_inner);
        strings.locale = Some(locale.to_owned());
    }

    pub fn locale(&self) -> Option<String> {
        self.strings
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .locale
            .clone()
    }

    pub fn locales(&self) -> Vec<String> {
        self.strings
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .bundles
            .keys()
            .cloned()
            .collect()
    }

    pub fn translate(&self, key: &str) -> String {
        let strings = self.strings.read().unwrap_or_else(PoisonError::into_inner);
        let locale = strings.locale.as_deref().unwrap_or(FALLBACK_LOCALE);

        [locale, FALLBACK_LOCALE]
            .into_iter()
            .filter_map(|locale| strings.bundles.get(locale))
            .find_map(|bundle| lookup(bundle, key))
            .unwrap_or_else(|| key.to_owned())
    }
}

fn lookup(bundle: &Value, key: &str) -> Option<String> {
    key.split('.')
        .try_fold(bundle, |node, part| node.get(part))
        .and_then(Value::as_str)
        .map(str::to_owned)
}

fn merge(target: &mut Value, source: Value) {
    match (target, source) {
        (Value::Object(target), Value::Object(source)) => {
            for (key, value) in source {
                match target.get_mut(&key) {
                    Some(existing) => merge(existing, value),
                    None => {
                        target.insert(key, value);
                    }
                }
            }
        }
        (target, source) => *target = source,
    }
}

/// Singleton registration for the string-resolution service.
pub fn registration() -> Registration {
    Registration::new(I18N, Strategy::to::<LanguageService>()).in_singleton_scope()
}

/// Merge `bundles` into the bound language service and activate `locale`.
///
/// Returns `false` without error when no language service is bound.
pub fn initialize_translations(registry: &Registry, bundles: Bundles, locale: &str) -> Result<bool> {
    if !registry.contains(I18N) {
        debug!(target: "service_composer", "No language service bound, skipping translations");
        return Ok(false);
    }

    let service = registry.get::<LanguageService>(I18N)?;
    let count = bundles.len();
    service.extend(bundles);
    service.init(locale);

    info!(
        target: "service_composer",
        locales = count,
        locale,
        "Translations initialised"
    );
    Ok(true)
}

/// Read every `<locale>.json` file in `dir`.
pub fn load_bundles(dir: &Path) -> Result<Bundles> {
    let entries = std::fs::read_dir(dir)
        .map_err(|e| DiError::Config(format!("Cannot read {}: {e}", dir.display())))?;

    let mut bundles = Bundles::new();
    for entry in entries {
        let path = entry
            .map_err(|e| DiError::Config(format!("Cannot read {}: {e}", dir.display())))?
            .path();

        if path.extension().and_then(|ext| ext.to_str()) != Some("json") {
            continue;
        }
        let Some(locale) = path.file_stem().and_then(|stem| stem.to_str()) else {
            continue;
        };

        let text = std::fs::read_to_string(&path)
            .map_err(|e| DiError::Config(format!("Cannot read {}: {e}", path.display())))?;
        let bundle: Value = serde_json::from_str(&text)
            .map_err(|e| DiError::Config(format!("Invalid bundle {}: {e}", path.display())))?;

        bundles.insert(locale.to_owned(), bundle);
    }
    Ok(bundles)
}
