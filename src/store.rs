use std::collections::HashMap;

use tokio::sync::RwLock;

/// The keys this node is responsible for. Guarded by its own lock, separate
/// from the ring state.
#[derive(Debug, Default)]
pub struct KeyStore {
	store: RwLock<HashMap<Vec<u8>, Vec<u8>>>,
}

impl KeyStore {
	pub fn new() -> Self {
		KeyStore {
			store: RwLock::new(HashMap::new()),
		}
	}

	pub async fn get(&self, key: &[u8]) -> Option<Vec<u8>> {
		let store = self.store.read().await;
		store.get(key).cloned()
	}

	pub async fn set(&self, key: &[u8], value: &[u8]) -> Option<Vec<u8>> {
		let mut store = self.store.write().await;
		store.insert(key.into(), value.into())
	}

	pub async fn delete(&self, key: &[u8]) -> Option<Vec<u8>> {
		let mut store = self.store.write().await;
		store.remove(key)
	}

	pub async fn len(&self) -> usize {
		self.store.read().await.len()
	}

	pub async fn is_empty(&self) -> bool {
		self.store.read().await.is_empty()
	}

	pub async fn list(&self) -> Vec<(Vec<u8>, Vec<u8>)> {
		let store = self.store.read().await;
		store
			.iter()
			.map(|(k, v)| (k.clone(), v.clone()))
			.collect()
	}

	/// Copy every entry whose key satisfies `wanted`.
	pub async fn matching<F>(&self, mut wanted: F) -> Vec<(Vec<u8>, Vec<u8>)>
	where
		F: FnMut(&[u8]) -> bool,
	{
		let store = self.store.read().await;
		store
			.iter()
			.filter(|(k, _)| wanted(k.as_slice()))
			.map(|(k, v)| (k.clone(), v.clone()))
			.collect()
	}

	/// Drop `keys` under one write lock, returning how many were present.
	pub async fn remove_all(&self, keys: &[Vec<u8>]) -> usize {
		let mut store = self.store.write().await;
		keys.iter().filter(|k| store.remove(k.as_slice()).is_some()).count()
	}

	/// Take ownership of entries migrated from another node.
	pub async fn absorb(&self, entries: Vec<(Vec<u8>, Vec<u8>)>) {
		let mut store = self.store.write().await;
		store.extend(entries);
	}
}


#[cfg(test)]
mod tests {
	use super::*;

	#[tokio::test]
	async fn basic_interface_should_work() {
		let store = KeyStore::new();
		assert_eq!(store.get(b"foo").await, None);

		assert_eq!(store.set(b"foo", b"bar").await, None);
		assert_eq!(store.get(b"foo").await, Some(b"bar".to_vec()));

		assert_eq!(store.set(b"foo", b"baz").await, Some(b"bar".to_vec()));
		assert_eq!(store.delete(b"foo").await, Some(b"baz".to_vec()));
		assert_eq!(store.delete(b"foo").await, None);
		assert!(store.is_empty().await);
	}

	#[tokio::test]
	async fn copies_stay_until_removed() {
		let store = KeyStore::new();
		store.set(b"a1", b"1").await;
		store.set(b"a2", b"2").await;
		store.set(b"b1", b"3").await;

		let mut copied = store.matching(|k| k.starts_with(b"a")).await;
		copied.sort();
		assert_eq!(copied, vec![(b"a1".to_vec(), b"1".to_vec()), (b"a2".to_vec(), b"2".to_vec())]);
		assert_eq!(store.len().await, 3);

		let keys: Vec<Vec<u8>> = copied.iter().map(|(k, _)| k.clone()).collect();
		assert_eq!(store.remove_all(&keys).await, 2);
		assert_eq!(store.remove_all(&keys).await, 0);
		assert_eq!(store.len().await, 1);
		assert_eq!(store.get(b"b1").await, Some(b"3".to_vec()));

		let other = KeyStore::new();
		other.absorb(copied).await;
		assert_eq!(other.len().await, 2);
	}
}
