//! Subscriber setup for the node and client binaries.
//!
//! Library code only emits `tracing` events inside the span each
//! [`Chord`](crate::chord::Chord) owns; installing a subscriber is left to the
//! process. [`init_logging`] installs one that writes to stderr and, when a
//! log sink address is given, also streams plain-text records to it over TCP.
//! The returned [`LoggingGuard`] closes the sink connection when dropped.

use std::{
	io::Write,
	net::{Shutdown, TcpStream, ToSocketAddrs},
	sync::Mutex,
	time::Duration,
};

use clap::ValueEnum;
use tracing::Level;
use tracing_subscriber::{filter::LevelFilter, fmt, layer::SubscriberExt, Layer, Registry};

use crate::error::{Error, Result};

const SINK_CONNECT_TIMEOUT: Duration = Duration::from_secs(2);

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
	Error,
	Warn,
	Info,
	Debug,
	Trace,
}

impl From<LogLevel> for Level {
	fn from(val: LogLevel) -> Self {
		match val {
			LogLevel::Trace => Level::TRACE,
			LogLevel::Debug => Level::DEBUG,
			LogLevel::Info => Level::INFO,
			LogLevel::Warn => Level::WARN,
			LogLevel::Error => Level::ERROR,
		}
	}
}

/// Keeps the log sink connection open. Dropping it flushes and closes it.
#[derive(Debug, Default)]
pub struct LoggingGuard {
	sink: Option<TcpStream>,
}

impl Drop for LoggingGuard {
	fn drop(&mut self) {
		if let Some(mut sink) = self.sink.take() {
			let _ = sink.flush();
			let _ = sink.shutdown(Shutdown::Both);
		}
	}
}

fn connect_sink(addr: &str) -> Result<TcpStream> {
	let target = addr
		.to_socket_addrs()?
		.next()
		.ok_or_else(|| Error::InvalidAddress(addr.to_string()))?;
	let stream = TcpStream::connect_timeout(&target, SINK_CONNECT_TIMEOUT)?;
	stream.set_nodelay(true)?;
	Ok(stream)
}

/// Install the process-wide subscriber. Fails if one is already installed or
/// the sink cannot be reached.
pub fn init_logging(level: LogLevel, sink: Option<&str>) -> Result<LoggingGuard> {
	let level_filter = LevelFilter::from_level(level.into());

	// Stderr
	let subscriber = Registry::default().with(
		fmt::layer()
			.with_writer(std::io::stderr)
			.with_filter(level_filter),
	);

	// Log server
	let (sink_layer, sink) = match sink {
		Some(addr) => {
			let stream = connect_sink(addr)?;
			let handle = stream.try_clone()?;
			let layer = fmt::layer()
				.with_ansi(false)
				.with_writer(Mutex::new(stream))
				.with_filter(level_filter);
			(Some(layer), Some(handle))
		},
		None => (None, None),
	};
	let subscriber = subscriber.with(sink_layer);

	tracing::subscriber::set_global_default(subscriber)
		.map_err(|e| Error::Logging(e.to_string()))?;

	Ok(LoggingGuard { sink })
}
