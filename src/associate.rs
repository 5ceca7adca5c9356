use std::sync::Arc;

use tracing::{info, instrument};

use crate::{
	adaptor::ChordAdaptor,
	chord::message::NodeView,
	error::Result,
};


/// A client of the ring that is not part of it. Every call goes to one
/// member node, which routes it to the key's owner.
#[derive(Debug, Clone)]
pub struct AssociateClient{
	node: String,
	adaptor: Arc<dyn ChordAdaptor>,
}

impl AssociateClient{
	pub fn new(node: impl Into<String>, adaptor: Arc<dyn ChordAdaptor>) -> Self{
		let node = node.into();
		info!("creating new associate of {}", node);
		AssociateClient{
			node,
			adaptor,
		}
	}

	/// The member node requests are sent to.
	pub fn node(&self) -> &str{
		&self.node
	}

	#[instrument(skip(self, key))]
	pub async fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>>{
		self.adaptor.get_key(&self.node, key.to_vec(), false).await
	}

	#[instrument(skip(self, key, value))]
	pub async fn set(&self, key: &[u8], value: &[u8]) -> Result<()>{
		self.adaptor.add_key(&self.node, key.to_vec(), value.to_vec(), false).await
	}

	#[instrument(skip(self, key))]
	pub async fn remove(&self, key: &[u8]) -> Result<()>{
		self.adaptor.delete_key(&self.node, key.to_vec(), false).await
	}

	/// The member node's view of the ring.
	pub async fn info(&self) -> Result<NodeView>{
		self.adaptor.rdict(&self.node).await
	}
}


#[cfg(test)]
mod tests {
	use super::*;
	use crate::{adaptor::memory::MemoryNetwork, chord::Chord, config::ChordConfig, error::Error};

	#[tokio::test]
	async fn associate_goes_through_its_node() {
		let network = MemoryNetwork::new();
		let adaptor: Arc<dyn ChordAdaptor> = Arc::new(network.adaptor());
		let config = ChordConfig{ring_bits: 8, join_delay_ms: 0, ..ChordConfig::default()};
		let chord = Chord::new("10.0.0.1:4000", config, adaptor.clone()).unwrap();
		let mut handle = chord.start(None).await.unwrap();
		handle.joined().await.unwrap();

		let client = AssociateClient::new("10.0.0.1:4000", adaptor.clone());
		client.set(b"foo", b"bar").await.unwrap();
		assert_eq!(client.get(b"foo").await.unwrap(), Some(b"bar".to_vec()));
		client.remove(b"foo").await.unwrap();
		assert_eq!(client.get(b"foo").await.unwrap(), None);
		assert_eq!(client.info().await.unwrap().ring_bits, 8);

		handle.stop().await;
		let gone = AssociateClient::new("10.0.0.1:4000", adaptor);
		assert!(matches!(gone.get(b"foo").await, Err(Error::Unreachable(_))));
	}
}
