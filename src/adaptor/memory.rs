use std::{
	collections::HashMap,
	future::pending,
	sync::{Arc, RwLock},
};

use async_trait::async_trait;
use tokio::task::JoinHandle;

use super::{ChordAdaptor, ChordService};
use crate::{
	chord::message::{Request, Response},
	error::{Error, Result},
};


/// Address book shared by every [`MemoryAdaptor`] of one in-process network.
#[derive(Clone, Default)]
pub struct MemoryNetwork{
	nodes: Arc<RwLock<HashMap<String, Arc<dyn ChordService>>>>,
}

impl MemoryNetwork{
	pub fn new() -> Self{
		Self::default()
	}

	pub fn adaptor(&self) -> MemoryAdaptor{
		MemoryAdaptor{network: self.clone()}
	}

	/// Take a node off the network, as if its process died.
	pub fn disconnect(&self, addr: &str) -> bool{
		match self.nodes.write() {
			Ok(mut nodes) => nodes.remove(addr).is_some(),
			Err(_) => false,
		}
	}

	pub fn is_reachable(&self, addr: &str) -> bool{
		self.lookup(addr).is_some()
	}

	fn lookup(&self, addr: &str) -> Option<Arc<dyn ChordService>>{
		self.nodes.read().ok()?.get(addr).cloned()
	}

	fn register(&self, addr: &str, service: Arc<dyn ChordService>) -> Result<()>{
		let mut nodes = self.nodes.write().map_err(|_| Error::Config("memory network lock poisoned".to_string()))?;
		if nodes.contains_key(addr) {
			return Err(Error::Config(format!("address {} is already in use", addr)));
		}
		nodes.insert(addr.to_string(), service);
		Ok(())
	}
}

impl std::fmt::Debug for MemoryNetwork{
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result{
		let count = self.nodes.read().map(|nodes| nodes.len()).unwrap_or(0);
		f.debug_struct("MemoryNetwork").field("nodes", &count).finish()
	}
}

/// Removes a node from the network when its listener task is dropped.
struct Registration{
	network: MemoryNetwork,
	addr: String,
}

impl Drop for Registration{
	fn drop(&mut self){
		self.network.disconnect(&self.addr);
	}
}

/// Connects nodes living in the same process, for embedding and tests.
#[derive(Debug, Clone)]
pub struct MemoryAdaptor{
	network: MemoryNetwork,
}

#[async_trait]
impl ChordAdaptor for MemoryAdaptor{
	async fn call(&self, addr: &str, request: Request) -> Result<Response>{
		let service = self.network
			.lookup(addr)
			.ok_or_else(|| Error::Unreachable(addr.to_string()))?;
		Ok(service.handle(request).await)
	}

	async fn listen(&self, addr: &str, service: Arc<dyn ChordService>) -> Result<JoinHandle<()>>{
		self.network.register(addr, service)?;
		let registration = Registration{
			network: self.network.clone(),
			addr: addr.to_string(),
		};
		Ok(tokio::spawn(async move {
			let _registration = registration;
			pending::<()>().await;
		}))
	}
}
