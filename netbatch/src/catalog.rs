//! Device catalog and account list.
//!
//! Both live as JSON files in a data directory. A missing file is an empty
//! catalog; a malformed file is an error and is never rewritten.

use std::io::ErrorKind;
use std::path::Path;

use indexmap::IndexMap;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::credential::AccountId;
use crate::error::{CatalogError, InputError};

/// A known device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Device {
    /// Unique display name.
    pub name: String,

    /// IPv4 address or hostname.
    #[serde(alias = "ip")]
    pub address: String,
}

impl Device {
    pub fn new(name: impl Into<String>, address: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            address: address.into(),
        }
    }
}

/// Devices keyed by name, in file order.
#[derive(Debug, Clone, Default)]
pub struct DeviceCatalog {
    devices: IndexMap<String, Device>,
}

impl DeviceCatalog {
    /// Build a catalog, rejecting duplicate names.
    pub fn from_devices(
        devices: impl IntoIterator<Item = Device>,
    ) -> Result<Self, CatalogError> {
        let mut map = IndexMap::new();
        for device in devices {
            if map.contains_key(&device.name) {
                return Err(CatalogError::DuplicateDevice { name: device.name });
            }
            map.insert(device.name.clone(), device);
        }
        Ok(Self { devices: map })
    }

    /// Load a catalog from a JSON array of `{ "name", "ip" | "address" }`.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, CatalogError> {
        let devices: Vec<Device> = load_json_or_default(path.as_ref())?;
        Self::from_devices(devices)
    }

    pub fn get(&self, name: &str) -> Option<&Device> {
        self.devices.get(name)
    }

    /// Address of the named device.
    pub fn address_of(&self, name: &str) -> Result<&str, InputError> {
        self.get(name)
            .map(|d| d.address.as_str())
            .ok_or_else(|| InputError::UnknownDevice {
                name: name.to_string(),
            })
    }

    /// Devices whose address starts with `prefix` (e.g. a subnet like `172.16.2.`).
    pub fn with_prefix<'a>(&'a self, prefix: &'a str) -> impl Iterator<Item = &'a Device> + 'a {
        self.iter().filter(move |d| d.address.starts_with(prefix))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Device> {
        self.devices.values()
    }

    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }
}

/// Load the account list, a JSON array of account identifiers.
pub fn load_accounts(path: impl AsRef<Path>) -> Result<Vec<AccountId>, CatalogError> {
    load_json_or_default(path.as_ref())
}

fn load_json_or_default<T: DeserializeOwned + Default>(path: &Path) -> Result<T, CatalogError> {
    let data = match std::fs::read(path) {
        Ok(data) => data,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            log::debug!("{} not found, using empty default", path.display());
            return Ok(T::default());
        }
        Err(source) => {
            return Err(CatalogError::Io {
                path: path.to_path_buf(),
                source,
            });
        }
    };

    serde_json::from_slice(&data).map_err(|source| CatalogError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write(dir: &tempfile::TempDir, name: &str, body: &str) -> std::path::PathBuf {
        let path = dir.path().join(name);
        std::fs::write(&path, body).unwrap();
        path
    }

    #[test]
    fn test_load_accepts_ip_and_address_keys() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(
            &dir,
            "devices.json",
            r#"[
                {"name": "core-sw1", "ip": "192.168.255.1"},
                {"name": "oper-r1", "address": "172.16.2.10"}
            ]"#,
        );

        let catalog = DeviceCatalog::load(&path).unwrap();
        assert_eq!(catalog.len(), 2);
        assert_eq!(catalog.address_of("core-sw1").unwrap(), "192.168.255.1");
        assert_eq!(catalog.address_of("oper-r1").unwrap(), "172.16.2.10");

        let names: Vec<_> = catalog.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, ["core-sw1", "oper-r1"]);
    }

    #[test]
    fn test_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let catalog = DeviceCatalog::load(dir.path().join("devices.json")).unwrap();
        assert!(catalog.is_empty());

        let accounts = load_accounts(dir.path().join("accounts.json")).unwrap();
        assert!(accounts.is_empty());
    }

    #[test]
    fn test_malformed_file_is_left_alone() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(&dir, "devices.json", "{not json");

        let err = DeviceCatalog::load(&path).unwrap_err();
        assert!(matches!(err, CatalogError::Parse { .. }));
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "{not json");
    }

    #[test]
    fn test_duplicate_names_rejected() {
        let err = DeviceCatalog::from_devices([
            Device::new("r1", "10.0.0.1"),
            Device::new("r1", "10.0.0.2"),
        ])
        .unwrap_err();
        assert!(matches!(err, CatalogError::DuplicateDevice { name } if name == "r1"));
    }

    #[test]
    fn test_unknown_device() {
        let catalog = DeviceCatalog::default();
        let err = catalog.address_of("ghost").unwrap_err();
        assert!(matches!(err, InputError::UnknownDevice { name } if name == "ghost"));
    }

    #[test]
    fn test_prefix_filter() {
        let catalog = DeviceCatalog::from_devices([
            Device::new("a", "172.16.2.1"),
            Device::new("b", "172.16.3.1"),
            Device::new("c", "172.16.2.9"),
        ])
        .unwrap();

        let names: Vec<_> = catalog.with_prefix("172.16.2.").map(|d| &d.name).collect();
        assert_eq!(names, ["a", "c"]);
    }

    #[test]
    fn test_load_accounts() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(&dir, "accounts.json", r#"["ops", "svc-backup"]"#);
        let accounts = load_accounts(&path).unwrap();
        assert_eq!(accounts, [AccountId::new("ops"), AccountId::new("svc-backup")]);
    }
}
