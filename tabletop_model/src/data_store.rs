// Namespaced game-data store.
//
// Values are arbitrary JSON keyed by `(data type, namespace, name)`. The
// store is replicated by the `updateData*`/`removeData*` commands and is
// touched from the client's background path, so it carries its own lock.
//
// Bulk updates travel as a serialized `DataStoreSnapshot` (whole store) or
// `NamespaceData` (one namespace).

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use serde::{Deserialize, Serialize};
use serde_json::Value;

type NamespaceKey = (String, String);

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DataValue {
    pub name: String,
    pub value: Value,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NamespaceData {
    pub data_type: String,
    pub namespace: String,
    pub values: Vec<DataValue>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct DataStoreSnapshot {
    pub namespaces: Vec<NamespaceData>,
}

#[derive(Debug, Default)]
pub struct DataStore {
    namespaces: Mutex<BTreeMap<NamespaceKey, BTreeMap<String, Value>>>,
}

impl DataStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, BTreeMap<NamespaceKey, BTreeMap<String, Value>>> {
        self.namespaces.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Replace the whole store with `snapshot`.
    pub fn replace_all(&self, snapshot: DataStoreSnapshot) {
        let mut namespaces = self.lock();
        namespaces.clear();
        for ns in snapshot.namespaces {
            namespaces.insert((ns.data_type, ns.namespace), into_map(ns.values));
        }
    }

    /// Replace one namespace with `data`.
    pub fn replace_namespace(&self, data: NamespaceData) {
        self.lock()
            .insert((data.data_type, data.namespace), into_map(data.values));
    }

    pub fn set(&self, data_type: &str, namespace: &str, value: DataValue) {
        self.lock()
            .entry((data_type.to_owned(), namespace.to_owned()))
            .or_default()
            .insert(value.name, value.value);
    }

    pub fn get(&self, data_type: &str, namespace: &str, name: &str) -> Option<Value> {
        self.lock()
            .get(&(data_type.to_owned(), namespace.to_owned()))
            .and_then(|ns| ns.get(name).cloned())
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    pub fn remove_namespace(&self, data_type: &str, namespace: &str) -> bool {
        self.lock()
            .remove(&(data_type.to_owned(), namespace.to_owned()))
            .is_some()
    }

    pub fn remove(&self, data_type: &str, namespace: &str, name: &str) -> bool {
        self.lock()
            .get_mut(&(data_type.to_owned(), namespace.to_owned()))
            .is_some_and(|ns| ns.remove(name).is_some())
    }

    pub fn snapshot(&self) -> DataStoreSnapshot {
        let namespaces = self
            .lock()
            .iter()
            .map(|((data_type, namespace), values)| NamespaceData {
                data_type: data_type.clone(),
                namespace: namespace.clone(),
                values: values
                    .iter()
                    .map(|(name, value)| DataValue {
                        name: name.clone(),
                        value: value.clone(),
                    })
                    .collect(),
            })
            .collect();
        DataStoreSnapshot { namespaces }
    }
}

fn into_map(values: Vec<DataValue>) -> BTreeMap<String, Value> {
    values.into_iter().map(|v| (v.name, v.value)).collect()
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn set_get_remove() {
        let store = DataStore::new();
        store.set(
            "addon",
            "net.example",
            DataValue {
                name: "counter".into(),
                value: json!(3),
            },
        );
        assert_eq!(store.get("addon", "net.example", "counter"), Some(json!(3)));
        assert!(store.remove("addon", "net.example", "counter"));
        assert!(!store.remove("addon", "net.example", "counter"));
        assert!(!store.remove("addon", "elsewhere", "counter"));
    }

    #[test]
    fn snapshot_replaces_everything() {
        let source = DataStore::new();
        source.set(
            "t",
            "ns",
            DataValue {
                name: "k".into(),
                value: json!({"a": [1, 2]}),
            },
        );
        let mirror = DataStore::new();
        mirror.set(
            "t",
            "stale",
            DataValue {
                name: "old".into(),
                value: json!(null),
            },
        );
        mirror.replace_all(source.snapshot());
        assert_eq!(mirror.snapshot(), source.snapshot());
        assert_eq!(mirror.get("t", "stale", "old"), None);
    }

    #[test]
    fn remove_namespace_only_touches_that_namespace() {
        let store = DataStore::new();
        for ns in ["a", "b"] {
            store.set(
                "t",
                ns,
                DataValue {
                    name: "x".into(),
                    value: json!(ns),
                },
            );
        }
        assert!(store.remove_namespace("t", "a"));
        assert_eq!(store.get("t", "b", "x"), Some(json!("b")));
    }
}
