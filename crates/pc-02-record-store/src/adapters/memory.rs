//! In-memory keyed store.

use crate::ports::outbound::{
    display_key, BatchOperation, KVStoreError, KeyValueStore, StoredValue,
};
use parking_lot::RwLock;
use std::collections::{BTreeMap, HashMap};

/// In-memory key-value store.
///
/// Provides atomic batch writes by validating the whole batch under a single
/// write lock before applying any of it.
#[derive(Default)]
pub struct InMemoryKVStore {
    data: RwLock<BTreeMap<Vec<u8>, StoredValue>>,
}

impl InMemoryKVStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored keys.
    pub fn len(&self) -> usize {
        self.data.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.read().is_empty()
    }
}

impl KeyValueStore for InMemoryKVStore {
    fn get(&self, key: &[u8]) -> Result<Option<StoredValue>, KVStoreError> {
        Ok(self.data.read().get(key).cloned())
    }

    fn atomic_batch_write(&self, operations: Vec<BatchOperation>) -> Result<(), KVStoreError> {
        let mut data = self.data.write();

        // Stage against an overlay so a batch can touch one key twice
        let mut staged: HashMap<Vec<u8>, StoredValue> = HashMap::new();
        for op in operations {
            let current_version = staged
                .get(op.key())
                .or_else(|| data.get(op.key()))
                .map(|v| v.version);

            match op {
                BatchOperation::Insert { key, value } => {
                    if current_version.is_some() {
                        return Err(KVStoreError::Conflict {
                            key: display_key(&key),
                        });
                    }
                    staged.insert(
                        key,
                        StoredValue {
                            version: 1,
                            bytes: value,
                        },
                    );
                }
                BatchOperation::Update {
                    key,
                    expected_version,
                    value,
                } => {
                    if current_version != Some(expected_version) {
                        return Err(KVStoreError::Conflict {
                            key: display_key(&key),
                        });
                    }
                    staged.insert(
                        key,
                        StoredValue {
                            version: expected_version + 1,
                            bytes: value,
                        },
                    );
                }
            }
        }

        data.extend(staged);
        Ok(())
    }

    fn prefix_scan(&self, prefix: &[u8]) -> Result<Vec<(Vec<u8>, StoredValue)>, KVStoreError> {
        let data = self.data.read();
        let results = data
            .range(prefix.to_vec()..)
            .take_while(|(k, _)| k.starts_with(prefix))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        Ok(results)
    }
}
