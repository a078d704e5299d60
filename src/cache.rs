use std::{borrow::Borrow, collections::HashMap, hash::Hash};

/// 1回の同期処理の間だけ保持するメモ化用のキャッシュ。
///
/// 永続化はせず、実行ごとに新しく作成する。
#[derive(Debug)]
pub struct Memo<K, V> {
    values: HashMap<K, V>,
}

impl<K: Eq + Hash, V> Memo<K, V> {
    pub fn new() -> Self {
        Self {
            values: HashMap::new(),
        }
    }

    pub fn get<Q>(&self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: Eq + Hash + ?Sized,
    {
        self.values.get(key)
    }

    pub fn insert(&mut self, key: K, value: V) {
        self.values.insert(key, value);
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }
}

impl<K: Eq + Hash, V> Default for Memo<K, V> {
    fn default() -> Self {
        Self::new()
    }
}
