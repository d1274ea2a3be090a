use anyhow::Result;
use clap::{Parser, Subcommand};
use guestmem::Config;
use guestmem::config::defaults;
use std::path::PathBuf;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser)]
#[command(name = "guestmem")]
#[command(about = "Inspect guest memory of a running emulator")]
struct Args {
    #[arg(short, long, global = true, default_value = "guestmem.toml")]
    config: PathBuf,

    /// Attach to this process instead of searching by name
    #[arg(short, long, global = true)]
    pid: Option<u32>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Show the attach state and base offset
    Status,

    /// Dump raw bytes at a guest address
    Hexdump {
        /// Guest address (hex)
        address: String,

        #[arg(short, long, default_value_t = 256)]
        size: usize,

        /// Show the ASCII column
        #[arg(short, long)]
        ascii: bool,
    },

    /// Resolve a pointer table into a string dictionary
    Strings {
        /// Guest addresses (hex)
        #[arg(required = true)]
        addresses: Vec<String>,

        /// Characters to drop from the start of every string
        #[arg(short, long, default_value_t = 0)]
        offset: usize,
    },

    /// Resolve a pointer table into a string-array dictionary
    Arrays {
        /// Guest addresses (hex)
        #[arg(required = true)]
        addresses: Vec<String>,
    },

    /// Read one null-terminated string
    ReadString {
        /// Guest address (hex)
        address: String,

        /// Read a double-zero terminated string array instead
        #[arg(long)]
        array: bool,
    },
}

fn main() -> Result<()> {
    // Logs go to stderr so JSON output stays clean
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("guestmem=info".parse()?))
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let config = if args.config.exists() {
        match Config::load(&args.config) {
            Ok(c) => {
                info!("Loaded config from {:?}", args.config);
                c
            }
            Err(e) => {
                warn!("Failed to load config: {}, using defaults", e);
                Config::default()
            }
        }
    } else {
        info!(
            "No config at {:?}, looking for {}",
            args.config,
            defaults::PROCESS_NAME
        );
        Config::default()
    };

    match args.command {
        Command::Status => commands::status::run(&config, args.pid),
        Command::Hexdump {
            address,
            size,
            ascii,
        } => commands::hexdump::run(&config, args.pid, &address, size, ascii),
        Command::Strings { addresses, offset } => {
            commands::strings::run(&config, args.pid, &addresses, offset)
        }
        Command::Arrays { addresses } => commands::arrays::run(&config, args.pid, &addresses),
        Command::ReadString { address, array } => {
            commands::read_string::run(&config, args.pid, &address, array)
        }
    }
}
