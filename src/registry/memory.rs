//! In-process schema registry.

use std::collections::BTreeMap;
use std::sync::Arc;

use parking_lot::Mutex;

use super::{RegistryError, RegistryResult, Schema, SchemaRegistry};
use crate::protocol::SchemaId;

#[derive(Debug, Default)]
struct Store {
    next_id: SchemaId,
    subjects: BTreeMap<String, Vec<Schema>>,
}

impl Store {
    fn find(&self, subject: &str, text: &str) -> Option<&Schema> {
        self.subjects
            .get(subject)?
            .iter()
            .find(|schema| schema.schema == text)
    }
}

/// Schema registry kept in memory.
///
/// Ids are global and start at 0; versions start at 1 per subject.
/// Registering the same text twice under one subject returns the first id.
/// Clones share the same store.
#[derive(Debug, Clone, Default)]
pub struct MemorySchemaRegistry {
    store: Arc<Mutex<Store>>,
}

impl MemorySchemaRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }
}

impl SchemaRegistry for MemorySchemaRegistry {
    fn subjects(&self) -> RegistryResult<Vec<String>> {
        Ok(self.store.lock().subjects.keys().cloned().collect())
    }

    fn versions(&self, subject: &str) -> RegistryResult<Vec<i32>> {
        let store = self.store.lock();
        let schemas = store
            .subjects
            .get(subject)
            .ok_or_else(|| RegistryError::NotFound(format!("subject {}", subject)))?;
        Ok(schemas.iter().map(|schema| schema.version).collect())
    }

    fn register_new_schema(&self, subject: &str, text: &str) -> RegistryResult<SchemaId> {
        let mut store = self.store.lock();
        if let Some(existing) = store.find(subject, text) {
            return Ok(existing.id);
        }

        let id = store.next_id;
        store.next_id += 1;
        let schemas = store.subjects.entry(subject.to_string()).or_default();
        schemas.push(Schema {
            schema: text.to_string(),
            subject: subject.to_string(),
            version: schemas.len() as i32 + 1,
            id,
        });
        Ok(id)
    }

    fn is_registered(
        &self,
        subject: &str,
        text: &str,
    ) -> RegistryResult<(bool, Option<Schema>)> {
        let store = self.store.lock();
        Ok(match store.find(subject, text) {
            Some(schema) => (true, Some(schema.clone())),
            None => (false, None),
        })
    }

    fn schema_by_id(&self, id: SchemaId) -> RegistryResult<String> {
        let store = self.store.lock();
        store
            .subjects
            .values()
            .flatten()
            .find(|schema| schema.id == id)
            .map(|schema| schema.schema.clone())
            .ok_or_else(|| RegistryError::NotFound(format!("schema id {}", id)))
    }

    fn schema_by_subject(&self, subject: &str, version: i32) -> RegistryResult<Schema> {
        let store = self.store.lock();
        store
            .subjects
            .get(subject)
            .and_then(|schemas| schemas.iter().find(|schema| schema.version == version))
            .cloned()
            .ok_or_else(|| {
                RegistryError::NotFound(format!("subject {} version {}", subject, version))
            })
    }

    fn latest_schema(&self, subject: &str) -> RegistryResult<Schema> {
        let store = self.store.lock();
        store
            .subjects
            .get(subject)
            .and_then(|schemas| schemas.last())
            .cloned()
            .ok_or_else(|| RegistryError::NotFound(format!("subject {}", subject)))
    }

    fn delete_subject(&self, subject: &str) -> RegistryResult<Vec<i32>> {
        let mut store = self.store.lock();
        let schemas = store
            .subjects
            .remove(subject)
            .ok_or_else(|| RegistryError::NotFound(format!("subject {}", subject)))?;
        Ok(schemas.iter().map(|schema| schema.version).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_assigns_ids_and_versions() {
        let registry = MemorySchemaRegistry::new();

        assert_eq!(registry.register_new_schema("a", "\"int\"").unwrap(), 0);
        assert_eq!(registry.register_new_schema("a", "\"long\"").unwrap(), 1);
        assert_eq!(registry.register_new_schema("b", "\"int\"").unwrap(), 2);

        assert_eq!(registry.versions("a").unwrap(), vec![1, 2]);
        assert_eq!(registry.subjects().unwrap(), vec!["a", "b"]);
    }

    #[test]
    fn test_register_is_idempotent() {
        let registry = MemorySchemaRegistry::new();

        let first = registry.register_new_schema("a", "\"int\"").unwrap();
        let second = registry.register_new_schema("a", "\"int\"").unwrap();
        assert_eq!(first, second);
        assert_eq!(registry.versions("a").unwrap(), vec![1]);
    }

    #[test]
    fn test_is_registered() {
        let registry = MemorySchemaRegistry::new();
        registry.register_new_schema("a", "\"int\"").unwrap();

        let (found, schema) = registry.is_registered("a", "\"int\"").unwrap();
        assert!(found);
        let schema = schema.unwrap();
        assert_eq!(schema.id, 0);
        assert_eq!(schema.version, 1);
        assert_eq!(schema.subject, "a");

        assert_eq!(registry.is_registered("a", "\"long\"").unwrap(), (false, None));
        assert_eq!(registry.is_registered("zzz", "\"int\"").unwrap(), (false, None));
    }

    #[test]
    fn test_lookups() {
        let registry = MemorySchemaRegistry::new();
        registry.register_new_schema("a", "\"int\"").unwrap();
        registry.register_new_schema("a", "\"long\"").unwrap();

        assert_eq!(registry.schema_by_id(1).unwrap(), "\"long\"");
        assert_eq!(registry.schema_by_subject("a", 1).unwrap().schema, "\"int\"");
        assert_eq!(registry.latest_schema("a").unwrap().version, 2);

        assert!(registry.schema_by_id(42).unwrap_err().is_not_found());
        assert!(registry.latest_schema("missing").unwrap_err().is_not_found());
    }

    #[test]
    fn test_delete_subject() {
        let registry = MemorySchemaRegistry::new();
        registry.register_new_schema("a", "\"int\"").unwrap();
        registry.register_new_schema("a", "\"long\"").unwrap();

        assert_eq!(registry.delete_subject("a").unwrap(), vec![1, 2]);
        assert!(registry.subjects().unwrap().is_empty());
        assert!(registry.delete_subject("a").is_err());
    }

    #[test]
    fn test_clones_share_store() {
        let registry = MemorySchemaRegistry::new();
        let clone = registry.clone();

        clone.register_new_schema("a", "\"int\"").unwrap();
        assert_eq!(registry.schema_by_id(0).unwrap(), "\"int\"");
    }
}
