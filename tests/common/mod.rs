#![allow(dead_code)]

use std::sync::Arc;

use chord_kv::{
	adaptor::memory::MemoryNetwork,
	Chord, ChordConfig, ChordHandle, Result, TcpAdaptor,
};
use futures::future::join_all;
use tokio::time::{sleep, Duration};

const HOUR_MS: u64 = 3_600_000;

/// A 16 identifier ring whose maintenance never fires on its own, so tests
/// drive stabilization by hand.
pub fn manual_config() -> ChordConfig{
	ChordConfig{
		ring_bits: 4,
		stabilize_interval_ms: HOUR_MS,
		fix_fingers_interval_ms: HOUR_MS,
		report_interval_ms: HOUR_MS,
		join_delay_ms: 0,
		..ChordConfig::default()
	}
}

pub fn addr(id: u32) -> String{
	format!("node-{}", id)
}

/// Nodes with chosen identifiers, connected through one in-process network.
pub struct MemoryRing{
	pub network: MemoryNetwork,
	pub nodes: Vec<Arc<Chord>>,
	handles: Vec<ChordHandle>,
}

impl MemoryRing{
	pub fn new() -> Self{
		MemoryRing{
			network: MemoryNetwork::new(),
			nodes: Vec::new(),
			handles: Vec::new(),
		}
	}

	/// Build a ring out of `ids`, each joining through the first.
	pub async fn with_nodes(ids: &[u32]) -> Self{
		let mut ring = MemoryRing::new();
		for id in ids {
			ring.add(*id).await;
		}
		ring
	}

	/// Start node `id`. The first node hosts, later ones join through it.
	pub async fn add(&mut self, id: u32) -> Arc<Chord>{
		let (chord, joined) = self.try_add(id, manual_config()).await;
		joined.expect("node should join");
		chord
	}

	pub async fn try_add(&mut self, id: u32, config: ChordConfig) -> (Arc<Chord>, Result<()>){
		let peer = self.nodes.first().map(|n| n.address().to_string());
		self.try_add_via(id, config, peer).await
	}

	pub async fn try_add_via(&mut self, id: u32, config: ChordConfig, peer: Option<String>) -> (Arc<Chord>, Result<()>){
		self.try_add_at(&addr(id), id, config, peer).await
	}

	/// Start a node at an arbitrary address, so two nodes may share an id.
	pub async fn try_add_at(&mut self, address: &str, id: u32, config: ChordConfig, peer: Option<String>) -> (Arc<Chord>, Result<()>){
		let chord = Chord::with_id(address, id.into(), config, Arc::new(self.network.adaptor()))
			.expect("valid node");
		let mut handle = chord.start(peer).await.expect("listener should start");
		let joined = handle.joined().await;
		// let spawned finger updates land
		sleep(Duration::from_millis(20)).await;
		self.nodes.push(chord.clone());
		self.handles.push(handle);
		(chord, joined)
	}

	/// Start every node of `ids` before waiting on any of them, so their joins
	/// run at the same time.
	pub async fn add_concurrently(&mut self, ids: &[u32]) -> Vec<Result<()>>{
		let peer = self.nodes.first().map(|n| n.address().to_string());
		let mut started = Vec::new();
		for id in ids {
			let chord = Chord::with_id(addr(*id), (*id).into(), manual_config(), Arc::new(self.network.adaptor()))
				.expect("valid node");
			let handle = chord.start(peer.clone()).await.expect("listener should start");
			started.push((chord, handle));
		}

		let mut outcomes = Vec::new();
		for (chord, mut handle) in started {
			outcomes.push(handle.joined().await);
			self.nodes.push(chord);
			self.handles.push(handle);
		}
		sleep(Duration::from_millis(20)).await;
		outcomes
	}

	/// Like `settle`, but every node runs its round at the same time.
	pub async fn settle_concurrently(&self, rounds: usize){
		for _ in 0..rounds {
			join_all(self.nodes.iter().map(|node| async move {
				let _ = node.stabilize().await;
				let _ = node.fix_fingers().await;
			})).await;
		}
		sleep(Duration::from_millis(20)).await;
	}

	pub fn node(&self, id: u32) -> &Arc<Chord>{
		let address = addr(id);
		self.nodes
			.iter()
			.find(|n| n.address() == address)
			.expect("no such node")
	}

	/// Run stabilize then fix_fingers on every reachable node, `rounds` times.
	pub async fn settle(&self, rounds: usize){
		for _ in 0..rounds {
			for node in &self.nodes {
				if self.network.is_reachable(node.address()) {
					let _ = node.stabilize().await;
				}
			}
			for node in &self.nodes {
				if self.network.is_reachable(node.address()) {
					let _ = node.fix_fingers().await;
				}
			}
		}
		sleep(Duration::from_millis(20)).await;
	}

	pub async fn stop(self){
		for handle in self.handles {
			handle.stop().await;
		}
	}
}

/// The first id at or after `id` among `ring`, wrapping around.
pub fn owner_of(id: u64, ring: &[u64]) -> u64{
	let mut sorted = ring.to_vec();
	sorted.sort();
	sorted.iter().copied().find(|n| *n >= id).unwrap_or(sorted[0])
}

/// A config with maintenance fast enough for a real ring to settle within a
/// test.
pub fn fast_config() -> ChordConfig{
	ChordConfig{
		ring_bits: 32,
		stabilize_interval_ms: 100,
		fix_fingers_interval_ms: 400,
		report_interval_ms: 1_000,
		join_delay_ms: 0,
		rpc_timeout_ms: 1_000,
		..ChordConfig::default()
	}
}

pub fn free_address() -> String{
	let reserved = std::net::TcpListener::bind("127.0.0.1:0").expect("loopback should be available");
	reserved.local_addr().expect("bound socket has an address").to_string()
}

/// Start `qty` TCP nodes on loopback, the first hosting and the rest joining
/// through it, waiting `delay` between starts.
pub async fn make_nodes(qty: usize, delay: Duration) -> Vec<ChordHandle>{
	let config = fast_config();
	let mut handles = Vec::new();
	let mut first: Option<String> = None;
	for _ in 0..qty {
		let address = free_address();
		let adaptor = Arc::new(TcpAdaptor::from_config(&config));
		let chord = Chord::new(address.clone(), config.clone(), adaptor).expect("valid node");
		let mut handle = chord.start(first.clone()).await.expect("Chords should be able to start");
		handle.joined().await.expect("Chords should be able to join");
		first.get_or_insert(address);
		handles.push(handle);
		sleep(delay).await;
	}
	handles
}
