//! A Chord ring: nodes place themselves on a circle of `2^m` identifiers,
//! route lookups through finger tables in `O(log n)` hops, repair their
//! pointers with periodic stabilization, and together hold a key-value store
//! partitioned so that every key lives on the successor of its hash.
//!
//! A node is a [`Chord`]. It talks to its peers through a [`ChordAdaptor`];
//! [`TcpAdaptor`] carries JSON over TCP and
//! [`MemoryAdaptor`](adaptor::memory::MemoryAdaptor) connects nodes living in
//! the same process.

pub mod adaptor;
pub use adaptor::{tcp_adaptor::TcpAdaptor, ChordAdaptor, ChordService};

pub mod chord;
pub use chord::{Chord, ChordHandle};

pub mod associate;
pub mod circular_id;
pub mod config;
pub mod error;
pub mod finger_table;
pub mod id_space;
pub mod logging;
pub mod store;

pub use circular_id::CircularId;
pub use config::ChordConfig;
pub use error::{Error, Result};
pub use id_space::IdentifierSpace;
