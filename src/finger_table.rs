use serde::{Serialize, Deserialize};

use crate::{chord::message::NodeDescriptor, circular_id::CircularId, id_space::IdentifierSpace};

/// One routing shortcut. `start` is fixed when the table is built, only
/// `node` is ever refreshed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FingerEntry{
	pub start: CircularId,
	pub node: NodeDescriptor,
}

/// `m` fingers, entry `i` pointing at the first node at or after
/// `owner + 2^i`. Entry 0 is the successor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FingerTable{
	fingers: Vec<FingerEntry>,
}

impl FingerTable{
	/// Build a table whose every finger points at `owner`, as in a ring of one.
	pub fn new(space: &IdentifierSpace, owner: &NodeDescriptor) -> Self{
		let fingers = (0..space.bits())
			.map(|i| FingerEntry{
				start: space.finger_start(&owner.identifier, i),
				node: owner.clone(),
			})
			.collect();
		FingerTable{fingers}
	}

	pub fn len(&self) -> usize{
		self.fingers.len()
	}

	pub fn is_empty(&self) -> bool{
		self.fingers.is_empty()
	}

	pub fn get(&self, index: usize) -> Option<&FingerEntry>{
		self.fingers.get(index)
	}

	pub fn start(&self, index: usize) -> Option<&CircularId>{
		self.fingers.get(index).map(|f| &f.start)
	}

	/// Point finger `index` at `node`. Out of range indexes are ignored and
	/// reported as `false`.
	pub fn set(&mut self, index: usize, node: NodeDescriptor) -> bool{
		match self.fingers.get_mut(index){
			Some(finger) => {
				finger.node = node;
				true
			},
			None => false,
		}
	}

	pub fn iter(&self) -> impl DoubleEndedIterator<Item = &FingerEntry>{
		self.fingers.iter()
	}

	pub fn successor(&self) -> &NodeDescriptor{
		// a table always has at least one finger since ring_bits >= 1
		&self.fingers[0].node
	}
}
