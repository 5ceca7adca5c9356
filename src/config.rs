use std::{path::Path, time::Duration};

use serde::{Serialize, Deserialize};
use tokio::fs;

use crate::{
	error::{Error, Result},
	id_space::{IdentifierSpace, MAX_RING_BITS},
};

pub const DEFAULT_RING_BITS: u32 = MAX_RING_BITS;

// Intervals
pub const STABILIZE_INTERVAL_MS: u64 = 10_000;
pub const FIX_FINGERS_INTERVAL_MS: u64 = 15_000;
pub const REPORT_INTERVAL_MS: u64 = 30_000;

// Delays
pub const JOIN_DELAY_MS: u64 = 500;
pub const RPC_TIMEOUT_MS: u64 = 2_000;
pub const IDLE_TIMEOUT_MS: u64 = 30_000;


/// Settings shared by every node of one ring. `ring_bits` in particular must
/// be identical on all of them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChordConfig{
	pub ring_bits: u32,
	pub stabilize_interval_ms: u64,
	pub fix_fingers_interval_ms: u64,
	pub report_interval_ms: u64,
	pub join_delay_ms: u64,
	pub rpc_timeout_ms: u64,
	pub rpc_retries: u32,
	/// How long an inbound connection may sit without sending a request.
	pub idle_timeout_ms: u64,
	pub max_lookup_hops: usize,
	/// Host a new ring when no bootstrap contact answers.
	pub join_or_host: bool,
	/// Bootstrap contacts tried after the one given on the command line.
	pub join_list: Vec<String>,
}

impl Default for ChordConfig{
	fn default() -> Self{
		ChordConfig{
			ring_bits: DEFAULT_RING_BITS,
			stabilize_interval_ms: STABILIZE_INTERVAL_MS,
			fix_fingers_interval_ms: FIX_FINGERS_INTERVAL_MS,
			report_interval_ms: REPORT_INTERVAL_MS,
			join_delay_ms: JOIN_DELAY_MS,
			rpc_timeout_ms: RPC_TIMEOUT_MS,
			rpc_retries: 2,
			idle_timeout_ms: IDLE_TIMEOUT_MS,
			max_lookup_hops: 256,
			join_or_host: true,
			join_list: Vec::new(),
		}
	}
}

impl ChordConfig{
	pub async fn from_file<P: AsRef<Path>>(path: P) -> Result<Self>{
		let raw = fs::read_to_string(&path).await?;
		let config: ChordConfig = serde_json::from_str(&raw).map_err(Error::Deserialize)?;
		config.validate()?;
		Ok(config)
	}

	pub fn validate(&self) -> Result<()>{
		IdentifierSpace::new(self.ring_bits)?;
		if self.stabilize_interval_ms == 0 || self.fix_fingers_interval_ms == 0 || self.report_interval_ms == 0 {
			return Err(Error::Config("periodic intervals must be positive".to_string()));
		}
		if self.fix_fingers_interval_ms < self.stabilize_interval_ms {
			return Err(Error::Config(format!(
				"fix_fingers_interval_ms ({}) must not be shorter than stabilize_interval_ms ({})",
				self.fix_fingers_interval_ms, self.stabilize_interval_ms
			)));
		}
		if self.rpc_timeout_ms == 0 || self.idle_timeout_ms == 0 {
			return Err(Error::Config("rpc_timeout_ms and idle_timeout_ms must be positive".to_string()));
		}
		if self.max_lookup_hops == 0 {
			return Err(Error::Config("max_lookup_hops must be positive".to_string()));
		}
		for addr in &self.join_list {
			parse_address(addr)?;
		}
		Ok(())
	}

	pub fn space(&self) -> Result<IdentifierSpace>{
		IdentifierSpace::new(self.ring_bits)
	}

	pub fn stabilize_interval(&self) -> Duration{
		Duration::from_millis(self.stabilize_interval_ms)
	}

	pub fn fix_fingers_interval(&self) -> Duration{
		Duration::from_millis(self.fix_fingers_interval_ms)
	}

	pub fn report_interval(&self) -> Duration{
		Duration::from_millis(self.report_interval_ms)
	}

	pub fn join_delay(&self) -> Duration{
		Duration::from_millis(self.join_delay_ms)
	}

	pub fn rpc_timeout(&self) -> Duration{
		Duration::from_millis(self.rpc_timeout_ms)
	}

	pub fn idle_timeout(&self) -> Duration{
		Duration::from_millis(self.idle_timeout_ms)
	}
}

/// Check that `addr` looks like `host:port` and return it trimmed.
pub fn parse_address(addr: &str) -> Result<String>{
	let addr = addr.trim();
	let (host, port) = addr
		.rsplit_once(':')
		.ok_or_else(|| Error::InvalidAddress(addr.to_string()))?;
	if host.is_empty() || port.parse::<u16>().is_err() {
		return Err(Error::InvalidAddress(addr.to_string()));
	}
	Ok(addr.to_string())
}


#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn defaults_are_valid() {
		let config = ChordConfig::default();
		assert!(config.validate().is_ok());
		assert_eq!(config.space().unwrap().bits(), 160);
		assert_eq!(config.stabilize_interval(), Duration::from_secs(10));
	}

	#[test]
	fn partial_json_falls_back_to_defaults() {
		let config: ChordConfig = serde_json::from_str(r#"{"ring_bits": 4, "join_list": ["10.0.0.2:9000"]}"#).unwrap();
		assert_eq!(config.ring_bits, 4);
		assert_eq!(config.fix_fingers_interval_ms, FIX_FINGERS_INTERVAL_MS);
		assert!(config.validate().is_ok());
	}

	#[test]
	fn rejects_bad_settings() {
		let config = ChordConfig{ ring_bits: 0, ..ChordConfig::default() };
		assert!(matches!(config.validate(), Err(Error::Config(_))));

		let config = ChordConfig{ fix_fingers_interval_ms: 10, ..ChordConfig::default() };
		assert!(matches!(config.validate(), Err(Error::Config(_))));

		let config = ChordConfig{ idle_timeout_ms: 0, ..ChordConfig::default() };
		assert!(matches!(config.validate(), Err(Error::Config(_))));

		let config = ChordConfig{ join_list: vec!["nowhere".to_string()], ..ChordConfig::default() };
		assert!(matches!(config.validate(), Err(Error::InvalidAddress(_))));
	}

	#[test]
	fn addresses_need_host_and_port() {
		assert_eq!(parse_address(" 127.0.0.1:9000 ").unwrap(), "127.0.0.1:9000");
		assert!(parse_address("localhost:80").is_ok());
		assert!(parse_address("127.0.0.1").is_err());
		assert!(parse_address(":9000").is_err());
		assert!(parse_address("127.0.0.1:99999").is_err());
	}

	#[tokio::test]
	async fn loads_from_file() {
		let path = std::env::temp_dir().join(format!("chord_kv_config_{}.json", std::process::id()));
		fs::write(&path, r#"{"ring_bits": 8, "stabilize_interval_ms": 50, "fix_fingers_interval_ms": 75}"#).await.unwrap();
		let config = ChordConfig::from_file(&path).await.unwrap();
		let _ = fs::remove_file(&path).await;
		assert_eq!(config.ring_bits, 8);
		assert_eq!(config.fix_fingers_interval(), Duration::from_millis(75));
	}
}
