use crate::{
	adaptor::{ChordAdaptor, ChordService},
	circular_id::CircularId,
	config::ChordConfig,
	error::{Error, Result},
	finger_table::FingerEntry,
	id_space::IdentifierSpace,
	store::KeyStore,
};

use std::sync::{atomic::{AtomicBool, Ordering}, Arc};

use chrono::{DateTime, Utc};
use tokio::sync::{oneshot, RwLock};
use tokio::task::JoinHandle;
use tracing::{info, warn, Instrument, Span};


pub mod message;

mod state;
use state::RingState;

use message::{NodeDescriptor, NodeView};

mod maintenance;
use maintenance::Scheduler;

mod membership;
mod public_ops;
mod routing;


/// One member of a Chord ring: its routing state, its share of the key space
/// and the transport it reaches other members through.
///
/// A `Chord` is always shared behind an `Arc`; the listener, the maintenance
/// tasks and every in-flight request hold a reference to it. All mutable
/// state lives behind locks that are never held across a remote call.
#[derive(Debug)]
pub struct Chord{
	// Core data
	self_descriptor: NodeDescriptor,
	space: IdentifierSpace,
	config: ChordConfig,
	state: RwLock<RingState>,
	store: KeyStore,
	ready: AtomicBool,

	// Connections
	adaptor: Arc<dyn ChordAdaptor>,

	// Other
	span: Span,
	started_at: DateTime<Utc>,
}

impl Chord{

	/// Creates a node listening on `address`, with an identifier derived by
	/// hashing that address.
	pub fn new(address: impl Into<String>, config: ChordConfig, adaptor: Arc<dyn ChordAdaptor>) -> Result<Arc<Self>>{
		let address = address.into();
		let space = config.space()?;
		let id = space.hash(address.as_bytes());
		Self::build(address, id, space, config, adaptor)
	}

	/// Creates a node with an explicit identifier, reduced into the ring.
	pub fn with_id(address: impl Into<String>, id: CircularId, config: ChordConfig, adaptor: Arc<dyn ChordAdaptor>) -> Result<Arc<Self>>{
		let space = config.space()?;
		let id = space.reduce(id.into_biguint());
		Self::build(address.into(), id, space, config, adaptor)
	}

	fn build(address: String, id: CircularId, space: IdentifierSpace, config: ChordConfig, adaptor: Arc<dyn ChordAdaptor>) -> Result<Arc<Self>>{
		config.validate()?;
		let span = tracing::info_span!("node", addr = %address, id = %id);
		let self_descriptor = NodeDescriptor::new(address, id);

		Ok(Arc::new(Chord{
			state: RwLock::new(RingState::new(&space, self_descriptor.clone())),
			self_descriptor,
			space,
			config,
			store: KeyStore::new(),
			ready: AtomicBool::new(false),
			adaptor,
			span,
			started_at: Utc::now(),
		}))
	}

	pub fn address(&self) -> &str{
		&self.self_descriptor.address
	}

	pub fn identifier(&self) -> &CircularId{
		&self.self_descriptor.identifier
	}

	pub fn descriptor(&self) -> NodeDescriptor{
		self.self_descriptor.clone()
	}

	pub fn space(&self) -> &IdentifierSpace{
		&self.space
	}

	pub fn config(&self) -> &ChordConfig{
		&self.config
	}

	/// The keys this node currently holds.
	pub fn store(&self) -> &KeyStore{
		&self.store
	}

	/// The span every event of this node is recorded in.
	pub fn span(&self) -> &Span{
		&self.span
	}

	/// True once the node has joined a ring or started its own.
	pub fn is_ready(&self) -> bool{
		self.ready.load(Ordering::SeqCst)
	}

	pub async fn view(&self) -> NodeView{
		self.state.read().await.view(self.space.bits())
	}

	pub async fn successor(&self) -> NodeDescriptor{
		self.state.read().await.successor().clone()
	}

	pub async fn predecessor(&self) -> Option<NodeDescriptor>{
		self.state.read().await.predecessor().cloned()
	}

	pub async fn fingers(&self) -> Vec<FingerEntry>{
		self.state.read().await.fingers().iter().cloned().collect()
	}

	/// Start a new ring made of this node alone.
	pub async fn host(&self){
		self.state.write().await.host(&self.space);
		self.ready.store(true, Ordering::SeqCst);
		info!(parent: &self.span, "Hosting a new ring");
	}

	pub(crate) fn is_self(&self, node: &NodeDescriptor) -> bool{
		node.address == self.self_descriptor.address
	}

	/// Starts the node: the listener comes up first, then, after the join
	/// delay, the node joins through `join_addr` followed by the configured
	/// join list. With no contact at all it hosts a new ring.
	///
	/// Periodic maintenance runs from the start but does nothing until the
	/// join has finished. The outcome of the join is available through
	/// [`ChordHandle::joined`].
	pub async fn start(self: &Arc<Self>, join_addr: Option<String>) -> Result<ChordHandle>{
		let mut join_list = Vec::new();
		if let Some(addr) = join_addr {
			join_list.push(addr);
		}
		join_list.extend(self.config.join_list.iter().cloned());

		// Start listener task
		let service: Arc<dyn ChordService> = self.clone();
		let listener_handle = self.adaptor
			.listen(self.address(), service)
			.instrument(self.span.clone())
			.await?;

		let mut scheduler = Scheduler::new(self.span.clone());

		// Deferred join
		let (joined_tx, joined_rx) = oneshot::channel();
		let chord = self.clone();
		scheduler.after("join", self.config.join_delay(), async move {
			let result = chord.join_any(&join_list).await;
			if let Err(e) = &result {
				warn!("Could not join a ring: {}", e);
			}
			let _ = joined_tx.send(result);
		});

		// Maintenance tasks
		let chord = self.clone();
		scheduler.every("stabilize", self.config.stabilize_interval(), move || {
			let chord = chord.clone();
			async move { chord.when_ready(chord.stabilize()).await }
		});
		let chord = self.clone();
		scheduler.every("fix_fingers", self.config.fix_fingers_interval(), move || {
			let chord = chord.clone();
			async move { chord.when_ready(chord.fix_fingers()).await }
		});
		let chord = self.clone();
		scheduler.every("report", self.config.report_interval(), move || {
			let chord = chord.clone();
			async move { chord.report().await }
		});

		Ok(ChordHandle{
			chord: self.clone(),
			listener_handle,
			scheduler,
			joined: Some(joined_rx),
		})
	}

	async fn when_ready<F>(&self, task: F) -> Result<()>
	where
		F: std::future::Future<Output = Result<()>>,
	{
		if self.is_ready() {
			task.await
		}else{
			Ok(())
		}
	}

	/// Try each contact in turn. An empty list starts a new ring.
	pub async fn join_any(&self, join_list: &[String]) -> Result<()>{
		if join_list.is_empty() {
			self.host().await;
			return Ok(());
		}

		for addr in join_list {
			match self.join(addr).await {
				Ok(()) => return Ok(()),
				Err(e @ Error::RingMismatch{..}) => return Err(e),
				Err(e) => warn!(parent: &self.span, "Failed to join through {}: {}", addr, e),
			}
		}

		if self.config.join_or_host {
			warn!(parent: &self.span, "No contact answered, hosting instead");
			self.host().await;
			Ok(())
		}else{
			Err(Error::Join(format!("none of {} contacts answered", join_list.len())))
		}
	}
}



/// A ChordHandle represents a started Chord.
#[derive(Debug)]
pub struct ChordHandle{
	chord: Arc<Chord>,
	listener_handle: JoinHandle<()>,
	scheduler: Scheduler,
	joined: Option<oneshot::Receiver<Result<()>>>,
}

impl ChordHandle {
	pub fn chord(&self) -> &Arc<Chord>{
		&self.chord
	}

	/// Wait for the deferred join to finish. Only the first call sees the
	/// outcome; later calls return `Ok(())`.
	pub async fn joined(&mut self) -> Result<()>{
		match self.joined.take() {
			Some(rx) => rx.await.unwrap_or_else(|_| Err(Error::Join("join task was cancelled".to_string()))),
			None => Ok(()),
		}
	}

	/// Stop the maintenance tasks, letting a running tick finish, then close
	/// the listener.
	pub async fn stop(self){
		let ChordHandle{chord, listener_handle, scheduler, ..} = self;
		scheduler.shutdown().await;
		listener_handle.abort();
		let _ = listener_handle.await;
		info!(parent: &chord.span, "Node stopped");
	}
}
