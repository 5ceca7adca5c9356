use std::{io::ErrorKind, sync::Arc, time::Duration};

use async_trait::async_trait;
use bytes::Bytes;
use futures::{SinkExt, StreamExt};
use rand::Rng;
use serde::{de::DeserializeOwned, Serialize};
use tokio::{
	net::{TcpListener, TcpStream},
	task::JoinHandle,
	time::{sleep, timeout},
};
use tokio_util::codec::{Framed, LengthDelimitedCodec};
use tracing::{debug, info, warn, Instrument};

use super::{ChordAdaptor, ChordService};
use crate::{
	chord::message::{Request, Response},
	config::{ChordConfig, IDLE_TIMEOUT_MS},
	error::{Error, Result},
};

const ACCEPT_BACKOFF: Duration = Duration::from_millis(100);

/// Largest single message accepted, enough for a hand-over of a few
/// thousand sizeable values.
const MAX_FRAME_LENGTH: usize = 256 * 1024 * 1024;

/// An implementation of ChordAdaptor that sends each call as a JSON document
/// over its own TCP connection. Addresses are anything `TcpStream::connect`
/// resolves, usually `host:port`.
#[derive(Debug, Clone)]
pub struct TcpAdaptor{
	timeout: Duration,
	retries: u32,
	idle_timeout: Duration,
}

impl TcpAdaptor{
	pub fn new(timeout: Duration, retries: u32) -> Self{
		TcpAdaptor{
			timeout,
			retries,
			idle_timeout: Duration::from_millis(IDLE_TIMEOUT_MS),
		}
	}

	pub fn from_config(config: &ChordConfig) -> Self{
		Self::new(config.rpc_timeout(), config.rpc_retries).with_idle_timeout(config.idle_timeout())
	}

	/// Close inbound connections that send nothing for `idle_timeout`.
	pub fn with_idle_timeout(mut self, idle_timeout: Duration) -> Self{
		self.idle_timeout = idle_timeout;
		self
	}

	async fn exchange(addr: &str, request: &Request) -> Result<Response>{
		let conn = TcpStream::connect(addr).await.map_err(|e| match e.kind() {
			ErrorKind::ConnectionRefused => Error::Unreachable(addr.to_string()),
			_ => Error::Io(e),
		})?;
		let mut stream = JsonStream::new(conn);
		stream.write(request).await?;
		match stream.read::<Response>().await? {
			Some(response) => Ok(response),
			None => Err(Error::Unreachable(addr.to_string())),
		}
	}
}

#[async_trait]
impl ChordAdaptor for TcpAdaptor{
	async fn call(&self, addr: &str, request: Request) -> Result<Response>{
		let mut last_error = Error::Unreachable(addr.to_string());

		for attempt in 0..=self.retries {
			if attempt > 0 {
				let jitter = rand::thread_rng().gen_range(10..50u64);
				sleep(Duration::from_millis(jitter * u64::from(attempt))).await;
			}
			match timeout(self.timeout, Self::exchange(addr, &request)).await {
				Ok(Ok(response)) => return Ok(response),
				Ok(Err(e)) => {
					debug!("{} to {} failed on attempt {}: {}", request.name(), addr, attempt + 1, e);
					last_error = e;
				},
				Err(_) => {
					debug!("{} to {} timed out on attempt {}", request.name(), addr, attempt + 1);
					last_error = Error::Timeout(addr.to_string());
				},
			}
		}
		Err(last_error)
	}

	async fn listen(&self, addr: &str, service: Arc<dyn ChordService>) -> Result<JoinHandle<()>>{
		let listener = TcpListener::bind(addr).await?;
		info!("Listening on {}", listener.local_addr()?);
		Ok(tokio::spawn(accept_loop(listener, service, self.idle_timeout).in_current_span()))
	}
}

async fn accept_loop(listener: TcpListener, service: Arc<dyn ChordService>, idle_timeout: Duration){
	loop{
		match listener.accept().await {
			Ok((stream, peer)) => {
				let service = service.clone();
				tokio::spawn(
					serve_connection(stream, service, idle_timeout).instrument(tracing::debug_span!("connection", %peer)),
				);
			},
			Err(e) => {
				warn!("Encountered an error in accept: {}", e);
				sleep(ACCEPT_BACKOFF).await;
			},
		}
	}
}

async fn serve_connection(stream: TcpStream, service: Arc<dyn ChordService>, idle_timeout: Duration){
	let mut stream = JsonStream::new(stream);
	loop{
		let next = match timeout(idle_timeout, stream.read::<Request>()).await {
			Ok(next) => next,
			Err(_) => {
				debug!("Closing idle connection");
				break;
			},
		};
		match next {
			Ok(Some(request)) => {
				let response = service.handle(request).await;
				if let Err(e) = stream.write(&response).await {
					debug!("Failed to answer: {}", e);
					break;
				}
			},
			Ok(None) => break,
			Err(e) => {
				debug!("Dropping connection after unreadable request: {}", e);
				let _ = stream.write(&Response::Error{msg: e.to_string()}).await;
				break;
			},
		}
	}
}


/// A TCP stream carrying JSON documents, each in its own length-prefixed frame.
struct JsonStream{
	framed: Framed<TcpStream, LengthDelimitedCodec>,
}

impl JsonStream{
	fn new(stream: TcpStream) -> Self{
		let codec = LengthDelimitedCodec::builder()
			.max_frame_length(MAX_FRAME_LENGTH)
			.new_codec();
		Self{
			framed: Framed::new(stream, codec),
		}
	}

	/// Next document, or `None` once the peer closed the stream cleanly.
	async fn read<T: DeserializeOwned>(&mut self) -> Result<Option<T>>{
		match self.framed.next().await {
			Some(Ok(frame)) => serde_json::from_slice(&frame).map(Some).map_err(Error::Deserialize),
			Some(Err(e)) => Err(e.into()),
			None => Ok(None),
		}
	}

	async fn write<T: Serialize>(&mut self, msg: &T) -> Result<()>{
		let raw_data = serde_json::to_vec(msg).map_err(Error::Serialize)?;
		self.framed.send(Bytes::from(raw_data)).await?;
		Ok(())
	}
}
