//! embedkv CLI Client
//!
//! Operates a namespace on a running emulator through the remote backend.

use std::net::TcpStream;
use std::process;
use std::time::Duration;

use clap::{Parser, Subcommand};
use embedkv::{Config, KvStore, RemoteBackend, ReplyParsing, Result, Value, ValueType};

/// embedkv CLI
#[derive(Parser, Debug)]
#[command(name = "embedkv-cli")]
#[command(about = "CLI for a co-processor owned embedkv store")]
struct Args {
    /// Emulator address
    #[arg(short, long, default_value = "127.0.0.1:7878")]
    server: String,

    /// Namespace to open
    #[arg(short, long, default_value = "arduino")]
    name: String,

    /// Partition holding the namespace
    #[arg(short, long)]
    partition: Option<String>,

    /// Open the namespace read-only
    #[arg(long)]
    read_only: bool,

    /// Read malformed or error replies as zero
    #[arg(long)]
    lenient: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Read a value; the stored type is used unless `--type` is given
    Get {
        key: String,

        #[arg(short = 't', long = "type")]
        value_type: Option<ValueType>,
    },

    /// Store a value
    Put {
        key: String,

        /// Decimal for integer types, text for str and blob
        #[arg(allow_hyphen_values = true)]
        value: String,

        #[arg(short = 't', long = "type", default_value = "str")]
        value_type: ValueType,
    },

    /// Remove a key
    Del { key: String },

    /// Print the stored length (0 when absent)
    Len { key: String },

    /// Print the stored type tag name
    Type { key: String },

    /// Remove every key of the namespace
    Clear,
}

fn main() {
    let args = Args::parse();

    if let Err(e) = run(args) {
        eprintln!("error: {}", e);
        process::exit(1);
    }
}

fn run(args: Args) -> Result<()> {
    let stream = TcpStream::connect(&args.server)?;
    stream.set_nodelay(true)?;

    let mut builder = Config::builder()
        .store_name(&args.name)
        .read_only(args.read_only)
        .reply_parsing(if args.lenient {
            ReplyParsing::Lenient
        } else {
            ReplyParsing::Strict
        });
    if let Some(partition) = &args.partition {
        builder = builder.partition_label(partition);
    }
    let config = builder.build();

    stream.set_read_timeout(Some(Duration::from_millis(config.read_timeout_ms)))?;
    stream.set_write_timeout(Some(Duration::from_millis(config.write_timeout_ms)))?;

    let store = RemoteBackend::new(stream, config)?;
    store.begin()?;
    execute(&store, args.command)?;
    store.end()
}

fn execute(store: &RemoteBackend<TcpStream>, command: Commands) -> Result<()> {
    match command {
        Commands::Get { key, value_type } => {
            let value_type = match value_type {
                Some(value_type) => value_type,
                None => match store.type_of(&key)? {
                    Some(value_type) => value_type,
                    None => {
                        println!("(nil)");
                        return Ok(());
                    }
                },
            };
            println!("{}", store.get_value(&key, value_type)?);
        }
        Commands::Put {
            key,
            value,
            value_type,
        } => {
            let stored = store.put_value(&key, &Value::parse(value_type, &value)?)?;
            println!("{}", stored);
        }
        Commands::Del { key } => {
            println!("{}", if store.remove(&key)? { 1 } else { 0 });
        }
        Commands::Len { key } => {
            println!("{}", store.get_bytes_length(&key)?);
        }
        Commands::Type { key } => match store.type_of(&key)? {
            Some(value_type) => println!("{}", value_type),
            None => println!("(nil)"),
        },
        Commands::Clear => {
            store.clear()?;
            println!("OK");
        }
    }
    Ok(())
}
