use std::collections::HashSet;

use crate::{
	finger_table::FingerTable,
	id_space::IdentifierSpace,
	circular_id::CircularId,
};

use super::message::{NodeDescriptor, NodeView};


/// A node's view of the ring. Owned by one [`Chord`](super::Chord) behind a
/// lock; every read-then-write on it happens inside one critical section.
#[derive(Debug, Clone)]
pub(crate) struct RingState{
	self_descriptor: NodeDescriptor,
	predecessor: Option<NodeDescriptor>,
	fingers: FingerTable,
}

impl RingState{
	/// A node that has not joined yet: every finger points at itself and the
	/// predecessor is unknown.
	pub fn new(space: &IdentifierSpace, self_descriptor: NodeDescriptor) -> Self{
		RingState{
			fingers: FingerTable::new(space, &self_descriptor),
			predecessor: None,
			self_descriptor,
		}
	}

	/// Become a ring of one: successor, predecessor and fingers are all self.
	pub fn host(&mut self, space: &IdentifierSpace){
		self.fingers = FingerTable::new(space, &self.self_descriptor);
		self.predecessor = Some(self.self_descriptor.clone());
	}

	pub fn identifier(&self) -> &CircularId{
		&self.self_descriptor.identifier
	}

	pub fn successor(&self) -> &NodeDescriptor{
		self.fingers.successor()
	}

	pub fn set_successor(&mut self, node: NodeDescriptor){
		self.fingers.set(0, node);
	}

	pub fn predecessor(&self) -> Option<&NodeDescriptor>{
		self.predecessor.as_ref()
	}

	pub fn set_predecessor(&mut self, node: Option<NodeDescriptor>){
		self.predecessor = node;
	}

	pub fn fingers(&self) -> &FingerTable{
		&self.fingers
	}

	pub fn fingers_mut(&mut self) -> &mut FingerTable{
		&mut self.fingers
	}

	pub fn view(&self, ring_bits: u32) -> NodeView{
		NodeView{
			address: self.self_descriptor.address.clone(),
			identifier: self.self_descriptor.identifier.clone(),
			successor: self.successor().clone(),
			predecessor: self.predecessor.clone(),
			ring_bits,
		}
	}

	/// The finger closest to, but strictly before, `id`, scanning from the
	/// farthest finger down. Falls back to self.
	pub fn closest_preceding_finger(&self, space: &IdentifierSpace, id: &CircularId) -> NodeDescriptor{
		self.closest_preceding_finger_avoiding(space, id, &HashSet::new())
	}

	/// Same as [`closest_preceding_finger`](Self::closest_preceding_finger),
	/// skipping fingers at the addresses in `avoid`.
	pub fn closest_preceding_finger_avoiding(&self, space: &IdentifierSpace, id: &CircularId, avoid: &HashSet<String>) -> NodeDescriptor{
		self.fingers
			.iter()
			.rev()
			.map(|finger| &finger.node)
			.filter(|node| !avoid.contains(&node.address))
			.find(|node| space.in_open(&node.identifier, self.identifier(), id))
			.unwrap_or(&self.self_descriptor)
			.clone()
	}
}
