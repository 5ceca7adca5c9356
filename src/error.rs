//! Error of chord_kv

/// A wrap `Result` contains custom errors.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors collections in chord_kv.
#[derive(thiserror::Error, Debug)]
#[non_exhaustive]
pub enum Error {
	#[error("Invalid address `{0}`, expected host:port")]
	InvalidAddress(String),

	#[error("Invalid configuration: {0}")]
	Config(String),

	#[error("Ring bit-width mismatch: local node uses {local} bits, peer uses {peer} bits")]
	RingMismatch { local: u32, peer: u32 },

	#[error("IOError")]
	Io(#[from] std::io::Error),

	#[error("JSON serialization error")]
	Serialize(#[source] serde_json::Error),

	#[error("JSON deserialization error")]
	Deserialize(#[source] serde_json::Error),

	#[error("Call to {0} timed out")]
	Timeout(String),

	#[error("Peer {0} is unreachable")]
	Unreachable(String),

	#[error("Remote error: {0}")]
	Remote(String),

	#[error("Unexpected response: {0}")]
	UnexpectedResponse(String),

	#[error("Failed to join the ring: {0}")]
	Join(String),

	#[error("Failed to set up logging: {0}")]
	Logging(String),
}

impl Error {
	/// Errors that mean a peer could not be asked, as opposed to a local fault.
	pub fn is_peer_failure(&self) -> bool {
		matches!(
			self,
			Error::Timeout(_)
				| Error::Unreachable(_)
				| Error::Remote(_)
				| Error::UnexpectedResponse(_)
				| Error::Io(_)
				| Error::Deserialize(_)
		)
	}
}
