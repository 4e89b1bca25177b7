//! In-process storage backend.
//!
//! Mirrors the ordering rules of the SQLite backend: reverse ranges sort by
//! score then member, both descending; score ranges sort ascending.

use super::{FieldMap, ObjectStore, SortedSetStore, StoreError, range_window};
use async_trait::async_trait;
use dashmap::DashMap;
use std::collections::HashMap;

/// Storage backend kept entirely in memory.
#[derive(Debug, Default)]
pub struct MemoryStore {
    objects: DashMap<String, FieldMap>,
    sorted_sets: DashMap<String, HashMap<String, i64>>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Score of `member` in `key`, if present.
    pub fn score(&self, key: &str, member: &str) -> Option<i64> {
        self.sorted_sets
            .get(key)
            .and_then(|set| set.get(member).copied())
    }

    /// Number of members in `key`.
    pub fn set_len(&self, key: &str) -> usize {
        self.sorted_sets.get(key).map(|set| set.len()).unwrap_or(0)
    }

    fn sorted_members(&self, key: &str) -> Vec<(i64, String)> {
        let Some(set) = self.sorted_sets.get(key) else {
            return Vec::new();
        };
        let mut members: Vec<(i64, String)> = set
            .iter()
            .map(|(member, score)| (*score, member.clone()))
            .collect();
        members.sort();
        members
    }
}

#[async_trait]
impl SortedSetStore for MemoryStore {
    async fn sorted_set_add(
        &self,
        key: &str,
        score: i64,
        member: &str,
    ) -> Result<(), StoreError> {
        self.sorted_sets
            .entry(key.to_string())
            .or_default()
            .insert(member.to_string(), score);
        Ok(())
    }

    async fn sorted_set_remove(&self, keys: &[&str], members: &[&str]) -> Result<(), StoreError> {
        for key in keys {
            let now_empty = match self.sorted_sets.get_mut(*key) {
                Some(mut set) => {
                    for member in members {
                        set.remove(*member);
                    }
                    set.is_empty()
                }
                None => false,
            };
            if now_empty {
                self.sorted_sets.remove_if(*key, |_, set| set.is_empty());
            }
        }
        Ok(())
    }

    async fn rev_range(
        &self,
        key: &str,
        start: i64,
        stop: i64,
    ) -> Result<Vec<String>, StoreError> {
        let Some((offset, count)) = range_window(start, stop) else {
            return Ok(Vec::new());
        };
        let members = self
            .sorted_members(key)
            .into_iter()
            .rev()
            .skip(offset)
            .take(count.unwrap_or(usize::MAX))
            .map(|(_, member)| member)
            .collect();
        Ok(members)
    }

    async fn range_by_score(
        &self,
        key: &str,
        min: i64,
        max: i64,
        limit: usize,
    ) -> Result<Vec<String>, StoreError> {
        let members = self
            .sorted_members(key)
            .into_iter()
            .filter(|(score, _)| (min..=max).contains(score))
            .take(limit)
            .map(|(_, member)| member)
            .collect();
        Ok(members)
    }
}

#[async_trait]
impl ObjectStore for MemoryStore {
    async fn set_object(&self, key: &str, fields: &FieldMap) -> Result<(), StoreError> {
        self.set_objects(&[key], fields).await
    }

    async fn get_object(&self, key: &str) -> Result<Option<FieldMap>, StoreError> {
        Ok(self
            .objects
            .get(key)
            .map(|object| object.value().clone())
            .filter(|object| !object.is_empty()))
    }

    async fn set_objects(&self, keys: &[&str], fields: &FieldMap) -> Result<(), StoreError> {
        if fields.is_empty() {
            return Ok(());
        }
        for key in keys {
            let mut object = self.objects.entry(key.to_string()).or_default();
            for (field, value) in fields {
                object.insert(field.clone(), value.clone());
            }
        }
        Ok(())
    }

    async fn get_objects_fields(
        &self,
        keys: &[&str],
        fields: &[&str],
    ) -> Result<Vec<FieldMap>, StoreError> {
        Ok(keys
            .iter()
            .map(|key| {
                self.objects
                    .get(*key)
                    .map(|object| {
                        object
                            .iter()
                            .filter(|(field, _)| fields.contains(&field.as_str()))
                            .map(|(field, value)| (field.clone(), value.clone()))
                            .collect()
                    })
                    .unwrap_or_default()
            })
            .collect())
    }
}
