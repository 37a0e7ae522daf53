//! # Config Store
//!
//! Persistence for gateway and shipping method records. Strategies load their
//! record once at construction and write it back on every mutation.

use crate::config::{ConfigMap, GatewayRecord, ShippingMethodRecord};
use crate::error::{PaymentError, PaymentResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError, RwLock};

/// Key/value store for strategy records
pub trait ConfigStore: Send + Sync {
    fn load_gateway(&self, name: &str) -> PaymentResult<Option<GatewayRecord>>;

    fn save_gateway(&self, record: &GatewayRecord) -> PaymentResult<()>;

    fn load_shipping_method(&self, name: &str) -> PaymentResult<Option<ShippingMethodRecord>>;

    fn save_shipping_method(&self, record: &ShippingMethodRecord) -> PaymentResult<()>;
}

/// On-disk shape shared by both store implementations
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StoreDocument {
    #[serde(default)]
    pub gateways: BTreeMap<String, GatewayEntry>,
    #[serde(default)]
    pub shipping_methods: BTreeMap<String, ShippingEntry>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GatewayEntry {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub config: ConfigMap,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ShippingEntry {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(default)]
    pub config: ConfigMap,
}

impl StoreDocument {
    fn gateway(&self, name: &str) -> Option<GatewayRecord> {
        self.gateways
            .get(name)
            .map(|entry| GatewayRecord::new(name, entry.enabled, entry.config.clone()))
    }

    fn put_gateway(&mut self, record: &GatewayRecord) {
        self.gateways.insert(
            record.name.clone(),
            GatewayEntry {
                enabled: record.enabled,
                config: record.config.clone(),
            },
        );
    }

    fn shipping_method(&self, name: &str) -> Option<ShippingMethodRecord> {
        self.shipping_methods.get(name).map(|entry| {
            ShippingMethodRecord::new(
                name,
                entry.display_name.clone().unwrap_or_else(|| name.to_string()),
                entry.enabled,
                entry.config.clone(),
            )
        })
    }

    fn put_shipping_method(&mut self, record: &ShippingMethodRecord) {
        self.shipping_methods.insert(
            record.name.clone(),
            ShippingEntry {
                enabled: record.enabled,
                display_name: Some(record.display_name.clone()),
                config: record.config.clone(),
            },
        );
    }
}

/// In-process store
#[derive(Debug, Default)]
pub struct MemoryConfigStore {
    document: RwLock<StoreDocument>,
}

impl MemoryConfigStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder: seed a gateway record
    pub fn with_gateway(self, record: GatewayRecord) -> Self {
        self.document
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .put_gateway(&record);
        self
    }

    /// Builder: seed a shipping method record
    pub fn with_shipping_method(self, record: ShippingMethodRecord) -> Self {
        self.document
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .put_shipping_method(&record);
        self
    }

    /// Snapshot of everything stored
    pub fn document(&self) -> StoreDocument {
        self.document
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl ConfigStore for MemoryConfigStore {
    fn load_gateway(&self, name: &str) -> PaymentResult<Option<GatewayRecord>> {
        Ok(self
            .document
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .gateway(name))
    }

    fn save_gateway(&self, record: &GatewayRecord) -> PaymentResult<()> {
        self.document
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .put_gateway(record);
        Ok(())
    }

    fn load_shipping_method(&self, name: &str) -> PaymentResult<Option<ShippingMethodRecord>> {
        Ok(self
            .document
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .shipping_method(name))
    }

    fn save_shipping_method(&self, record: &ShippingMethodRecord) -> PaymentResult<()> {
        self.document
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .put_shipping_method(record);
        Ok(())
    }
}

/// TOML document on disk.
///
/// ```toml
/// [gateways.stripe]
/// enabled = true
///
/// [gateways.stripe.config]
/// secret_key = "sk_test_..."
/// ```
///
/// The whole file is re-read on load. Saves write a sibling `.tmp` file and
/// rename it over the original.
#[derive(Debug)]
pub struct FileConfigStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl FileConfigStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_document(&self) -> PaymentResult<StoreDocument> {
        match std::fs::read_to_string(&self.path) {
            Ok(content) => toml::from_str(&content).map_err(|e| {
                PaymentError::Store(format!("Failed to parse {}: {}", self.path.display(), e))
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(StoreDocument::default()),
            Err(e) => Err(PaymentError::Store(format!(
                "Failed to read {}: {}",
                self.path.display(),
                e
            ))),
        }
    }

    fn update(&self, apply: impl FnOnce(&mut StoreDocument)) -> PaymentResult<()> {
        let _guard = self.write_lock.lock().unwrap_or_else(PoisonError::into_inner);

        let mut document = self.read_document()?;
        apply(&mut document);

        let content = toml::to_string_pretty(&document)
            .map_err(|e| PaymentError::Store(format!("Failed to encode config: {}", e)))?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| {
                PaymentError::Store(format!("Failed to create {}: {}", parent.display(), e))
            })?;
        }

        // Replace the file in one rename so a failed write leaves the old document
        let staging = self.staging_path();
        std::fs::write(&staging, content).map_err(|e| {
            std::fs::remove_file(&staging).ok();
            PaymentError::Store(format!("Failed to write {}: {}", staging.display(), e))
        })?;
        std::fs::rename(&staging, &self.path).map_err(|e| {
            std::fs::remove_file(&staging).ok();
            PaymentError::Store(format!("Failed to replace {}: {}", self.path.display(), e))
        })
    }

    /// Sibling of the store file, so the rename stays on one filesystem
    fn staging_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|name| name.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

impl ConfigStore for FileConfigStore {
    fn load_gateway(&self, name: &str) -> PaymentResult<Option<GatewayRecord>> {
        Ok(self.read_document()?.gateway(name))
    }

    fn save_gateway(&self, record: &GatewayRecord) -> PaymentResult<()> {
        self.update(|document| document.put_gateway(record))
    }

    fn load_shipping_method(&self, name: &str) -> PaymentResult<Option<ShippingMethodRecord>> {
        Ok(self.read_document()?.shipping_method(name))
    }

    fn save_shipping_method(&self, record: &ShippingMethodRecord) -> PaymentResult<()> {
        self.update(|document| document.put_shipping_method(record))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::config_map;

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!(
            "commerce-store-{}-{}.toml",
            name,
            std::process::id()
        ))
    }

    #[test]
    fn test_memory_store_round_trip() {
        let store = MemoryConfigStore::new();
        assert!(store.load_gateway("stripe").unwrap().is_none());

        let record = GatewayRecord::new("stripe", true, config_map([("secret_key", "sk_test_1")]));
        store.save_gateway(&record).unwrap();

        assert_eq!(store.load_gateway("stripe").unwrap(), Some(record));
    }

    #[test]
    fn test_file_store_missing_file_is_empty() {
        let store = FileConfigStore::new(temp_path("missing"));
        assert!(store.load_gateway("paypal").unwrap().is_none());
        assert!(store.load_shipping_method("flat_rate").unwrap().is_none());
    }

    #[test]
    fn test_file_store_persists_both_kinds() {
        let path = temp_path("persist");
        let store = FileConfigStore::new(&path);

        store
            .save_gateway(&GatewayRecord::new(
                "paypal",
                true,
                config_map([("mode", "sandbox"), ("client_id", "abc")]),
            ))
            .unwrap();
        store
            .save_shipping_method(&ShippingMethodRecord::new(
                "flat_rate",
                "Flat Rate Shipping",
                false,
                config_map([("cost", "5.99")]),
            ))
            .unwrap();

        let reopened = FileConfigStore::new(&path);
        let gateway = reopened.load_gateway("paypal").unwrap().unwrap();
        assert!(gateway.enabled);
        assert_eq!(gateway.config.get("mode").map(String::as_str), Some("sandbox"));

        let method = reopened.load_shipping_method("flat_rate").unwrap().unwrap();
        assert_eq!(method.display_name, "Flat Rate Shipping");
        assert!(!method.enabled);

        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_file_store_replaces_document_atomically() {
        let path = temp_path("atomic");
        let store = FileConfigStore::new(&path);

        store
            .save_gateway(&GatewayRecord::new("stripe", true, config_map([("secret_key", "sk_test_1")])))
            .unwrap();
        store
            .save_gateway(&GatewayRecord::new("paypal", false, ConfigMap::new()))
            .unwrap();

        assert!(!store.staging_path().exists());
        assert!(store.load_gateway("stripe").unwrap().unwrap().enabled);
        assert!(store.load_gateway("paypal").unwrap().is_some());

        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_file_store_failed_write_keeps_document() {
        let path = temp_path("blocked");
        let store = FileConfigStore::new(&path);
        store
            .save_gateway(&GatewayRecord::new("stripe", true, config_map([("secret_key", "sk_test_1")])))
            .unwrap();

        // a directory in the staging slot makes the write fail
        std::fs::create_dir_all(store.staging_path()).unwrap();
        let result = store.save_gateway(&GatewayRecord::new("stripe", false, ConfigMap::new()));

        assert!(matches!(result, Err(PaymentError::Store(_))));
        let kept = store.load_gateway("stripe").unwrap().unwrap();
        assert!(kept.enabled);
        assert_eq!(kept.config.get("secret_key").map(String::as_str), Some("sk_test_1"));

        std::fs::remove_dir_all(store.staging_path()).ok();
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_file_store_reports_parse_errors() {
        let path = temp_path("broken");
        std::fs::write(&path, "gateways = [not toml").unwrap();

        let store = FileConfigStore::new(&path);
        assert!(matches!(
            store.load_gateway("stripe"),
            Err(PaymentError::Store(_))
        ));

        std::fs::remove_file(&path).ok();
    }
}
