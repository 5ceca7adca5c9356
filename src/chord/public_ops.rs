use async_trait::async_trait;
use tracing::{debug, info, Instrument};

use crate::{
	adaptor::ChordService,
	circular_id::CircularId,
	error::Result,
};

use super::{message::{Request, Response}, Chord};


#[async_trait]
impl ChordService for Chord{
	async fn handle(&self, request: Request) -> Response{
		let span = tracing::debug_span!(parent: &self.span, "rpc", op = request.name());
		match self.process_public(request).instrument(span).await {
			Ok(response) => response,
			Err(e) => {
				debug!(parent: &self.span, "Request failed: {}", e);
				Response::Error{msg: e.to_string()}
			},
		}
	}
}

impl Chord{

	async fn process_public(&self, request: Request) -> Result<Response>{
		let response = match request{
			// State Operations
			Request::Rdict => Response::View(self.view().await),

			// Routing
			Request::FindSuccessor{id} => Response::Node(self.find_successor(&id).await),
			Request::FindPredecessor{id} => Response::Node(self.find_predecessor(&id).await.descriptor()),
			Request::ClosestPrecedingFinger{id} => Response::Node(self.closest_preceding_finger(&id).await),

			// Membership
			Request::UpdatePredecessor{node} => {
				self.update_predecessor(node).await;
				Response::Ack
			},
			Request::UpdateFingerTable{node, index} => {
				self.update_finger_table(node, index).await;
				Response::Ack
			},
			Request::Notify{node} => {
				self.notify(node).await;
				Response::Ack
			},
			Request::PrecedingKeys{id} => Response::Keys(self.preceding_keys(&id).await),
			Request::ReleaseKeys{keys} => {
				self.release_keys(&keys).await;
				Response::Ack
			},

			// Key Operations
			Request::GetKey{key, forwarded: true} => Response::Value(self.store.get(&key).await),
			Request::GetKey{key, forwarded: false} => Response::Value(self.get(&key).await?),
			Request::AddKey{key, value, forwarded: true} => {
				self.store.set(&key, &value).await;
				Response::Ack
			},
			Request::AddKey{key, value, forwarded: false} => {
				self.set(&key, &value).await?;
				Response::Ack
			},
			Request::DeleteKey{key, forwarded: true} => {
				self.store.delete(&key).await;
				Response::Ack
			},
			Request::DeleteKey{key, forwarded: false} => {
				self.delete(&key).await?;
				Response::Ack
			},
		};
		Ok(response)
	}

	/// Read `key` from whichever node owns it.
	pub async fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>>{
		let owner = self.find_successor(&self.space.hash(key)).await;
		if self.is_self(&owner) {
			Ok(self.store.get(key).await)
		}else{
			self.adaptor.get_key(&owner.address, key.to_vec(), true).await
		}
	}

	/// Store `value` under `key` on whichever node owns it.
	pub async fn set(&self, key: &[u8], value: &[u8]) -> Result<()>{
		let owner = self.find_successor(&self.space.hash(key)).await;
		if self.is_self(&owner) {
			self.store.set(key, value).await;
			Ok(())
		}else{
			self.adaptor.add_key(&owner.address, key.to_vec(), value.to_vec(), true).await
		}
	}

	/// Remove `key` from whichever node owns it. Removing a missing key is
	/// not an error.
	pub async fn delete(&self, key: &[u8]) -> Result<()>{
		let owner = self.find_successor(&self.space.hash(key)).await;
		if self.is_self(&owner) {
			self.store.delete(key).await;
			Ok(())
		}else{
			self.adaptor.delete_key(&owner.address, key.to_vec(), true).await
		}
	}

	/// The keys a node joining at `id` becomes responsible for: those hashing
	/// into `(self, id]`. They stay here until the joiner releases them.
	pub async fn preceding_keys(&self, id: &CircularId) -> Vec<(Vec<u8>, Vec<u8>)>{
		if id == self.identifier() {
			return Vec::new();
		}
		let space = &self.space;
		let own = self.identifier();
		self.store
			.matching(|key| space.in_closed_right(&space.hash(key), own, id))
			.await
	}

	/// Forget keys a joined predecessor has taken over.
	pub async fn release_keys(&self, keys: &[Vec<u8>]){
		let removed = self.store.remove_all(keys).await;
		if removed > 0 {
			info!("Handed over {} keys", removed);
		}
	}
}


#[cfg(test)]
mod tests {
	use std::sync::Arc;

	use super::*;
	use crate::{adaptor::memory::MemoryNetwork, config::ChordConfig};

	fn config() -> ChordConfig {
		ChordConfig{ring_bits: 4, ..ChordConfig::default()}
	}

	#[tokio::test]
	async fn singleton_serves_every_key() {
		let network = MemoryNetwork::new();
		let chord = Chord::with_id("solo", 3u32.into(), config(), Arc::new(network.adaptor())).unwrap();
		chord.host().await;

		chord.set(b"foo", b"1").await.unwrap();
		assert_eq!(chord.handle(Request::GetKey{key: b"foo".to_vec(), forwarded: false}).await, Response::Value(Some(b"1".to_vec())));
		assert_eq!(chord.get(b"missing").await.unwrap(), None);

		chord.delete(b"foo").await.unwrap();
		chord.delete(b"foo").await.unwrap();
		assert_eq!(chord.get(b"foo").await.unwrap(), None);
	}

	#[tokio::test]
	async fn hand_over_takes_only_the_preceding_arc() {
		let network = MemoryNetwork::new();
		let chord = Chord::with_id("holder", 9u32.into(), config(), Arc::new(network.adaptor())).unwrap();
		chord.host().await;

		let mut keys = Vec::new();
		for i in 0..64u32 {
			let key = format!("key-{}", i).into_bytes();
			chord.store().set(&key, b"v").await;
			keys.push(key);
		}

		// a node joining at 5 owns (9, 5]
		let space = chord.space().clone();
		let moved = chord.preceding_keys(&space.id(5)).await;
		assert!(!moved.is_empty());
		for (key, _) in &moved {
			assert!(space.in_closed_right(&space.hash(key), &space.id(9), &space.id(5)));
		}
		// nothing leaves before the release
		assert_eq!(chord.store().len().await, keys.len());

		let moved_keys: Vec<Vec<u8>> = moved.iter().map(|(k, _)| k.clone()).collect();
		chord.handle(Request::ReleaseKeys{keys: moved_keys.clone()}).await;
		for (key, _) in chord.store().list().await {
			assert!(space.in_open(&space.hash(&key), &space.id(5), &space.id(9)) || space.hash(&key) == space.id(9));
		}
		assert_eq!(moved.len() + chord.store().len().await, keys.len());

		// a repeated release is harmless
		assert_eq!(chord.handle(Request::ReleaseKeys{keys: moved_keys}).await, Response::Ack);
		assert_eq!(moved.len() + chord.store().len().await, keys.len());

		assert!(chord.preceding_keys(&space.id(9)).await.is_empty());
	}
}
