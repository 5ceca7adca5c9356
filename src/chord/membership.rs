use std::sync::atomic::Ordering;

use tracing::{debug, info, instrument, warn, Instrument};

use crate::{
	circular_id::CircularId,
	error::{Error, Result},
};

use super::{message::NodeDescriptor, state::RingState, Chord};


impl Chord{

	/// Join the ring that the node at `addr` belongs to: build the finger
	/// table through it, tell the nodes that should now point here, then take
	/// over the keys this node became responsible for.
	#[instrument(skip(self))]
	pub async fn join(&self, addr: &str) -> Result<()>{
		let view = self.adaptor.rdict(addr).await?;
		if view.ring_bits != self.space.bits() {
			return Err(Error::RingMismatch{local: self.space.bits(), peer: view.ring_bits});
		}

		// a previous attempt may have left partial state behind
		*self.state.write().await = RingState::new(&self.space, self.descriptor());

		self.init_finger_table(addr).await?;
		self.update_others().await;
		self.ready.store(true, Ordering::SeqCst);

		if let Err(e) = self.migrate_keys().await {
			warn!("Key hand-over from successor failed: {}", e);
		}

		let view = self.view().await;
		info!(
			successor = %view.successor.address,
			predecessor = ?view.predecessor.map(|p| p.address),
			"Joined through {}", addr,
		);
		Ok(())
	}

	async fn init_finger_table(&self, addr: &str) -> Result<()>{
		let starts: Vec<CircularId> = self.fingers().await.into_iter().map(|finger| finger.start).collect();
		let Some(first) = starts.first() else {
			return Ok(());
		};

		let successor = self.adaptor.find_successor(addr, first.clone()).await?;
		let successor_view = if self.is_self(&successor) {
			self.view().await
		}else{
			self.adaptor.rdict(&successor.address).await?
		};
		{
			let mut state = self.state.write().await;
			state.set_successor(successor.clone());
			state.set_predecessor(successor_view.predecessor);
		}
		if !self.is_self(&successor) {
			self.adaptor.update_predecessor(&successor.address, self.descriptor()).await?;
		}

		let mut previous = successor;
		for (index, start) in starts.iter().enumerate().skip(1) {
			let node = if self.space.in_closed_left(start, self.identifier(), &previous.identifier) {
				previous.clone()
			}else{
				self.adaptor.find_successor(addr, start.clone()).await?
			};
			self.state.write().await.fingers_mut().set(index, node.clone());
			previous = node;
		}
		Ok(())
	}

	/// Ask every node that may need this node as finger `i` to update.
	async fn update_others(&self){
		for index in 0..self.space.bits() {
			let target = self.space.update_target(self.identifier(), index);
			let node = self.find_predecessor(&target).await.descriptor();
			if self.is_self(&node) {
				continue;
			}
			if let Err(e) = self.adaptor.update_finger_table(&node.address, self.descriptor(), index).await {
				warn!("Could not update finger {} of {}: {}", index, node.address, e);
			}
		}
	}

	/// Copy the keys in `(predecessor, self]` from the successor, then tell it
	/// to let go. A lost reply leaves them on the holder.
	async fn migrate_keys(&self) -> Result<()>{
		let successor = self.successor().await;
		if self.is_self(&successor) {
			return Ok(());
		}
		let entries = self.adaptor.preceding_keys(&successor.address, self.identifier().clone()).await?;
		if entries.is_empty() {
			return Ok(());
		}
		let keys: Vec<Vec<u8>> = entries.iter().map(|(key, _)| key.clone()).collect();
		self.store.absorb(entries).await;
		info!("Took over {} keys from {}", keys.len(), successor.address);
		self.adaptor.release_keys(&successor.address, keys).await
	}

	/// Check whether the successor has gained a closer predecessor, adopt it,
	/// and let the successor know about this node.
	pub async fn stabilize(&self) -> Result<()>{
		let successor = self.successor().await;
		let candidate = if self.is_self(&successor) {
			self.predecessor().await
		}else{
			self.adaptor.rdict(&successor.address).await?.predecessor
		};

		if let Some(candidate) = candidate {
			let mut state = self.state.write().await;
			let current = state.successor().identifier.clone();
			if self.space.in_open(&candidate.identifier, self.identifier(), &current) {
				debug!("Adopting {} as successor", candidate.address);
				state.set_successor(candidate);
			}
		}

		let successor = self.successor().await;
		if !self.is_self(&successor) {
			self.adaptor.notify(&successor.address, self.descriptor()).await?;
		}
		Ok(())
	}

	/// `node` thinks it might be this node's predecessor.
	pub async fn notify(&self, node: NodeDescriptor){
		if self.is_self(&node) {
			return;
		}
		let mut state = self.state.write().await;
		let adopt = match state.predecessor() {
			None => true,
			Some(current) => self.space.in_open(&node.identifier, &current.identifier, self.identifier()),
		};
		if adopt {
			debug!("Adopting {} as predecessor", node.address);
			state.set_predecessor(Some(node));
		}
	}

	pub async fn update_predecessor(&self, node: NodeDescriptor){
		self.state.write().await.set_predecessor(Some(node));
	}

	/// Recompute every finger with a fresh lookup.
	pub async fn fix_fingers(&self) -> Result<()>{
		let starts: Vec<CircularId> = self.fingers().await.into_iter().map(|finger| finger.start).collect();
		let mut changed = 0;
		for (index, start) in starts.iter().enumerate() {
			let node = self.find_successor(start).await;
			let mut state = self.state.write().await;
			if state.fingers().get(index).map(|finger| &finger.node) != Some(&node) {
				state.fingers_mut().set(index, node);
				changed += 1;
			}
		}
		if changed > 0 {
			debug!("{} fingers changed", changed);
		}
		Ok(())
	}

	/// A node `node` has joined; take it as finger `index` if it is closer to
	/// that finger's start than the current one, and pass the news back to the
	/// predecessor.
	#[instrument(skip(self, node), fields(candidate = %node.address))]
	pub async fn update_finger_table(&self, node: NodeDescriptor, index: u32){
		if node.identifier == *self.identifier() {
			return;
		}

		let forward_to = {
			let mut state = self.state.write().await;
			let Some(finger) = state.fingers().get(index as usize) else {
				return;
			};
			let closer = self.space.distance(&finger.start, &node.identifier)
				< self.space.distance(&finger.start, &finger.node.identifier);
			if !closer {
				return;
			}
			state.fingers_mut().set(index as usize, node.clone());
			state.predecessor().cloned()
		};
		debug!("Finger {} now points at {}", index, node.address);

		let Some(predecessor) = forward_to else {
			return;
		};
		if predecessor.identifier == node.identifier || self.is_self(&predecessor) {
			return;
		}
		let adaptor = self.adaptor.clone();
		tokio::spawn(async move {
			if let Err(e) = adaptor.update_finger_table(&predecessor.address, node, index).await {
				debug!("Could not pass finger update to {}: {}", predecessor.address, e);
			}
		}.in_current_span());
	}
}
