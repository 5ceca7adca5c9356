use serde::{Serialize, Deserialize};

use crate::circular_id::CircularId;


/// Where a node lives and where it sits on the ring. Ring position is compared
/// through `identifier`, dispatch goes through `address`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NodeDescriptor{
	pub address: String,
	pub identifier: CircularId,
}

impl NodeDescriptor{
	pub fn new(address: impl Into<String>, identifier: CircularId) -> Self{
		NodeDescriptor{
			address: address.into(),
			identifier,
		}
	}
}

/// Snapshot of a node's ring pointers, the answer to `rdict`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeView{
	pub address: String,
	pub identifier: CircularId,
	pub successor: NodeDescriptor,
	pub predecessor: Option<NodeDescriptor>,
	pub ring_bits: u32,
}

impl NodeView{
	pub fn descriptor(&self) -> NodeDescriptor{
		NodeDescriptor::new(self.address.clone(), self.identifier.clone())
	}
}

/// Every procedure a peer may invoke on a node.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Request{
	Rdict,
	FindSuccessor{id: CircularId},
	FindPredecessor{id: CircularId},
	ClosestPrecedingFinger{id: CircularId},
	UpdatePredecessor{node: NodeDescriptor},
	UpdateFingerTable{node: NodeDescriptor, index: u32},
	Notify{node: NodeDescriptor},

	// Key hand-over to a joining predecessor: copy the arc first, release it
	// once the copy is safe on the joiner.
	PrecedingKeys{id: CircularId},
	ReleaseKeys{keys: Vec<Vec<u8>>},

	// Key operations. A forwarded request has already been routed to its
	// owner and is served from the local store.
	GetKey{key: Vec<u8>, forwarded: bool},
	AddKey{key: Vec<u8>, value: Vec<u8>, forwarded: bool},
	DeleteKey{key: Vec<u8>, forwarded: bool},
}

impl Request{
	pub fn name(&self) -> &'static str{
		match self{
			Request::Rdict => "rdict",
			Request::FindSuccessor{..} => "find_successor",
			Request::FindPredecessor{..} => "find_predecessor",
			Request::ClosestPrecedingFinger{..} => "closest_preceding_finger",
			Request::UpdatePredecessor{..} => "update_predecessor",
			Request::UpdateFingerTable{..} => "update_finger_table",
			Request::Notify{..} => "notify",
			Request::PrecedingKeys{..} => "preceding_keys",
			Request::ReleaseKeys{..} => "release_keys",
			Request::GetKey{..} => "get_key",
			Request::AddKey{..} => "add_key",
			Request::DeleteKey{..} => "delete_key",
		}
	}
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Response{
	View(NodeView),
	Node(NodeDescriptor),
	Ack,
	Keys(Vec<(Vec<u8>, Vec<u8>)>),
	Value(Option<Vec<u8>>),
	Error{msg: String},
}
