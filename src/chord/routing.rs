use std::collections::HashSet;

use tracing::{debug, warn};

use crate::circular_id::CircularId;

use super::{message::{NodeDescriptor, NodeView}, Chord};


impl Chord{
	/// The finger of this node that most closely precedes `id`, or this node.
	pub async fn closest_preceding_finger(&self, id: &CircularId) -> NodeDescriptor{
		self.state.read().await.closest_preceding_finger(&self.space, id)
	}

	/// Walk the ring towards `id` until reaching the node whose arc
	/// `(node, successor]` contains it.
	///
	/// Never fails: a peer that cannot be reached ends the walk at the best
	/// node found so far. Local fingers that turn out to be unreachable are
	/// skipped in favour of nearer ones. The walk also ends when a hop makes
	/// no progress, revisits a node, or the hop limit is hit.
	pub async fn find_predecessor(&self, id: &CircularId) -> NodeView{
		let mut current = self.view().await;
		let mut visited = HashSet::from([current.address.clone()]);
		let mut unreachable = HashSet::new();

		for _ in 0..self.config.max_lookup_hops {
			if self.space.in_closed_right(id, &current.identifier, &current.successor.identifier) {
				return current;
			}

			let local = current.address == self.address();
			let next = if local {
				self.state.read().await.closest_preceding_finger_avoiding(&self.space, id, &unreachable)
			}else{
				match self.adaptor.closest_preceding_finger(&current.address, id.clone()).await {
					Ok(next) => next,
					Err(e) => {
						warn!("{} could not route towards {}: {}", current.address, id, e);
						return current;
					},
				}
			};

			// no progress
			if next.identifier == current.identifier || visited.contains(&next.address) {
				return current;
			}

			let view = if self.is_self(&next) {
				Ok(self.view().await)
			}else{
				self.adaptor.rdict(&next.address).await
			};
			match view {
				Ok(view) => {
					visited.insert(view.address.clone());
					current = view;
				},
				// retry from here without that finger
				Err(e) if local => {
					debug!("Skipping unreachable finger {}: {}", next.address, e);
					unreachable.insert(next.address);
				},
				Err(e) => {
					warn!("{} is unreachable: {}", next.address, e);
					return current;
				},
			}
		}

		warn!("Lookup of {} stopped after {} hops", id, self.config.max_lookup_hops);
		current
	}

	/// The node responsible for `id`.
	pub async fn find_successor(&self, id: &CircularId) -> NodeDescriptor{
		if id == self.identifier() {
			return self.descriptor();
		}
		self.find_predecessor(id).await.successor
	}
}
