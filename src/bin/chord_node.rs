use std::{process::ExitCode, sync::Arc};

use clap::Parser;
use tracing::{error, info};

use chord_kv::{
	config::parse_address,
	logging::{init_logging, LogLevel},
	Chord, ChordConfig, CircularId, Error, Result, TcpAdaptor,
};

#[derive(Parser, Debug)]
#[command(about = "Runs one member of a Chord ring.", version)]
struct Cli {
	#[arg(long, short = 'b', help = "Address to listen on, as host:port")]
	bind: String,

	#[arg(long, short = 'p', help = "A member of the ring to join. Without one a new ring is started")]
	peer: Option<String>,

	#[arg(long, help = "Also stream log records to this host:port")]
	log_server: Option<String>,

	#[arg(long, default_value_t = LogLevel::Info, value_enum)]
	log_level: LogLevel,

	#[arg(long, short = 'c', help = "JSON config file")]
	config: Option<String>,

	#[arg(long, help = "Identifier width m, overrides the config file")]
	ring_bits: Option<u32>,

	#[arg(long, help = "Decimal ring identifier. Defaults to the hash of the bind address")]
	id: Option<String>,
}

async fn run(cli: Cli) -> Result<()> {
	let bind = parse_address(&cli.bind)?;
	let peer = cli.peer.as_deref().map(parse_address).transpose()?;

	let mut config = match &cli.config {
		Some(path) => ChordConfig::from_file(path).await?,
		None => ChordConfig::default(),
	};
	if let Some(bits) = cli.ring_bits {
		config.ring_bits = bits;
	}
	config.validate()?;

	let adaptor = Arc::new(TcpAdaptor::from_config(&config));
	let chord = match &cli.id {
		Some(id) => {
			let id = CircularId::parse(id).ok_or_else(|| Error::Config(format!("`{}` is not a decimal identifier", id)))?;
			Chord::with_id(bind, id, config, adaptor)?
		},
		None => Chord::new(bind, config, adaptor)?,
	};
	info!("Starting node {} at {}", chord.identifier(), chord.address());

	let mut handle = chord.start(peer).await?;
	handle.joined().await?;

	tokio::signal::ctrl_c().await?;
	info!("Shutting down");
	handle.stop().await;
	Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
	let cli = Cli::parse();
	let _guard = match init_logging(cli.log_level, cli.log_server.as_deref()) {
		Ok(guard) => guard,
		Err(e) => {
			eprintln!("Could not set up logging: {}", e);
			return ExitCode::FAILURE;
		},
	};

	match run(cli).await {
		Ok(()) => ExitCode::SUCCESS,
		Err(e) => {
			error!("{}", e);
			ExitCode::FAILURE
		},
	}
}
