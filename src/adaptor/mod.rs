//! Transports between nodes.
//!
//! The ring logic only talks to peers through [`ChordAdaptor`]: a transport
//! implements [`ChordAdaptor::call`] and [`ChordAdaptor::listen`], and gets one
//! typed method per remote procedure for free. A node answers calls through
//! [`ChordService`].

use std::{fmt::Debug, sync::Arc};

use async_trait::async_trait;
use tokio::task::JoinHandle;

use crate::{
	chord::message::{NodeDescriptor, NodeView, Request, Response},
	circular_id::CircularId,
	error::{Error, Result},
};

pub mod memory;
pub mod tcp_adaptor;


/// The server half: something that can answer a [`Request`].
#[async_trait]
pub trait ChordService: Send + Sync {
	async fn handle(&self, request: Request) -> Response;
}

fn unexpected(request: &'static str, response: Response) -> Error {
	match response {
		Response::Error{msg} => Error::Remote(msg),
		other => Error::UnexpectedResponse(format!("{} answered with {:?}", request, other)),
	}
}

/// The client half: how to reach the procedures another node exposes.
#[async_trait]
pub trait ChordAdaptor: Send + Sync + Debug {
	/// Send `request` to the node at `addr` and wait for its answer.
	async fn call(&self, addr: &str, request: Request) -> Result<Response>;

	/// Make `service` reachable at `addr` until the returned task is aborted.
	async fn listen(&self, addr: &str, service: Arc<dyn ChordService>) -> Result<JoinHandle<()>>;


	async fn rdict(&self, addr: &str) -> Result<NodeView> {
		match self.call(addr, Request::Rdict).await? {
			Response::View(view) => Ok(view),
			other => Err(unexpected("rdict", other)),
		}
	}

	async fn find_successor(&self, addr: &str, id: CircularId) -> Result<NodeDescriptor> {
		match self.call(addr, Request::FindSuccessor{id}).await? {
			Response::Node(node) => Ok(node),
			other => Err(unexpected("find_successor", other)),
		}
	}

	async fn find_predecessor(&self, addr: &str, id: CircularId) -> Result<NodeDescriptor> {
		match self.call(addr, Request::FindPredecessor{id}).await? {
			Response::Node(node) => Ok(node),
			other => Err(unexpected("find_predecessor", other)),
		}
	}

	async fn closest_preceding_finger(&self, addr: &str, id: CircularId) -> Result<NodeDescriptor> {
		match self.call(addr, Request::ClosestPrecedingFinger{id}).await? {
			Response::Node(node) => Ok(node),
			other => Err(unexpected("closest_preceding_finger", other)),
		}
	}

	async fn update_predecessor(&self, addr: &str, node: NodeDescriptor) -> Result<()> {
		match self.call(addr, Request::UpdatePredecessor{node}).await? {
			Response::Ack => Ok(()),
			other => Err(unexpected("update_predecessor", other)),
		}
	}

	async fn update_finger_table(&self, addr: &str, node: NodeDescriptor, index: u32) -> Result<()> {
		match self.call(addr, Request::UpdateFingerTable{node, index}).await? {
			Response::Ack => Ok(()),
			other => Err(unexpected("update_finger_table", other)),
		}
	}

	async fn notify(&self, addr: &str, node: NodeDescriptor) -> Result<()> {
		match self.call(addr, Request::Notify{node}).await? {
			Response::Ack => Ok(()),
			other => Err(unexpected("notify", other)),
		}
	}

	async fn preceding_keys(&self, addr: &str, id: CircularId) -> Result<Vec<(Vec<u8>, Vec<u8>)>> {
		match self.call(addr, Request::PrecedingKeys{id}).await? {
			Response::Keys(keys) => Ok(keys),
			other => Err(unexpected("preceding_keys", other)),
		}
	}

	async fn release_keys(&self, addr: &str, keys: Vec<Vec<u8>>) -> Result<()> {
		match self.call(addr, Request::ReleaseKeys{keys}).await? {
			Response::Ack => Ok(()),
			other => Err(unexpected("release_keys", other)),
		}
	}

	async fn get_key(&self, addr: &str, key: Vec<u8>, forwarded: bool) -> Result<Option<Vec<u8>>> {
		match self.call(addr, Request::GetKey{key, forwarded}).await? {
			Response::Value(value) => Ok(value),
			other => Err(unexpected("get_key", other)),
		}
	}

	async fn add_key(&self, addr: &str, key: Vec<u8>, value: Vec<u8>, forwarded: bool) -> Result<()> {
		match self.call(addr, Request::AddKey{key, value, forwarded}).await? {
			Response::Ack => Ok(()),
			other => Err(unexpected("add_key", other)),
		}
	}

	async fn delete_key(&self, addr: &str, key: Vec<u8>, forwarded: bool) -> Result<()> {
		match self.call(addr, Request::DeleteKey{key, forwarded}).await? {
			Response::Ack => Ok(()),
			other => Err(unexpected("delete_key", other)),
		}
	}
}
