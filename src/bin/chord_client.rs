use std::{process::ExitCode, sync::Arc, time::Duration};

use clap::{Parser, Subcommand};

use chord_kv::{
	associate::AssociateClient,
	config::{parse_address, RPC_TIMEOUT_MS},
	logging::{init_logging, LogLevel},
	Result, TcpAdaptor,
};

#[derive(Parser, Debug)]
#[command(about = "Reads and writes keys stored in a Chord ring.", version)]
struct Cli {
	#[command(subcommand)]
	command: Command,

	#[arg(long, short = 'n', help = "Any member of the ring, as host:port")]
	node: String,

	#[arg(long, default_value_t = RPC_TIMEOUT_MS, help = "Per-call timeout in milliseconds")]
	timeout_ms: u64,

	#[arg(long, default_value_t = LogLevel::Warn, value_enum)]
	log_level: LogLevel,
}

#[derive(Subcommand, Debug)]
#[command(rename_all = "kebab-case")]
enum Command {
	#[command(about = "Prints the value stored under a key.")]
	Get { key: String },
	#[command(about = "Stores a value under a key.")]
	Set { key: String, value: String },
	#[command(about = "Removes a key.", alias = "delete")]
	Remove { key: String },
	#[command(about = "Shows the node's successor, predecessor and ring width.")]
	Info,
}

async fn run(cli: Cli) -> Result<()> {
	let node = parse_address(&cli.node)?;
	let adaptor = Arc::new(TcpAdaptor::new(Duration::from_millis(cli.timeout_ms), 2));
	let client = AssociateClient::new(node, adaptor);

	match cli.command {
		Command::Get { key } => match client.get(key.as_bytes()).await? {
			Some(value) => println!("{}", String::from_utf8_lossy(&value)),
			None => println!("(not found)"),
		},
		Command::Set { key, value } => {
			client.set(key.as_bytes(), value.as_bytes()).await?;
			println!("ok");
		},
		Command::Remove { key } => {
			client.remove(key.as_bytes()).await?;
			println!("ok");
		},
		Command::Info => {
			let view = client.info().await?;
			println!("node        {} ({})", view.address, view.identifier);
			println!("successor   {} ({})", view.successor.address, view.successor.identifier);
			match view.predecessor {
				Some(p) => println!("predecessor {} ({})", p.address, p.identifier),
				None => println!("predecessor none"),
			}
			println!("ring bits   {}", view.ring_bits);
		},
	}
	Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
	let cli = Cli::parse();
	let _guard = match init_logging(cli.log_level, None) {
		Ok(guard) => guard,
		Err(e) => {
			eprintln!("Could not set up logging: {}", e);
			return ExitCode::FAILURE;
		},
	};

	match run(cli).await {
		Ok(()) => ExitCode::SUCCESS,
		Err(e) => {
			eprintln!("failed: {}", e);
			ExitCode::FAILURE
		},
	}
}
