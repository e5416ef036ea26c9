//! A hash map from vertex id to a dense index.

use crate::types::VId;
use std::collections::HashMap;

#[derive(Debug, Default)]
pub struct KvStore {
    map: HashMap<VId, usize>,
}

impl KvStore {
    /// Maps every key to its position in `keys`.
    pub fn new(keys: &[VId]) -> Self {
        let mut map = HashMap::with_capacity(keys.len());
        map.extend(keys.iter().copied().zip(0..));
        Self { map }
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn find(&self, key: VId) -> Option<usize> {
        self.map.get(&key).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dense_index() {
        let kv_store = KvStore::new(&[7, 3, 11]);
        assert_eq!(kv_store.len(), 3);
        assert_eq!(kv_store.find(3), Some(1));
        assert_eq!(kv_store.find(11), Some(2));
        assert_eq!(kv_store.find(4), None);
        assert!(KvStore::new(&[]).is_empty());
    }
}
