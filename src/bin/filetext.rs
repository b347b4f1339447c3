//! filetext CLI
//!
//! Convert a binary file to a hex text container and back.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use filetext::{Decoder, Encoder};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "filetext")]
#[command(author = "nzinfo <li.monan@gmail.com>")]
#[command(version)]
#[command(about = "Binary file <-> hex text container tool")]
struct Cli {
    /// Verbose output (repeat for more detail)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Encode a binary file into a hex text container
    #[command(aliases = ["TEXT", "Text"])]
    Text {
        /// File to encode
        source: PathBuf,

        /// Container to create (overwritten if it exists)
        dest: PathBuf,
    },

    /// Restore the file stored in a container, under its recorded name
    #[command(aliases = ["BIN", "Bin"])]
    Bin {
        /// Container to decode
        source: PathBuf,

        /// Directory to restore into (default: current directory)
        #[arg(short = 'C', long, default_value = ".")]
        directory: PathBuf,

        /// Keep the restored file's current timestamps and attributes
        #[arg(long)]
        no_metadata: bool,
    },

    /// Show the header of a container without decoding it
    #[command(aliases = ["INFO", "Info"])]
    Info {
        /// Container to inspect
        source: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Text { source, dest } => {
            let summary = Encoder::new()
                .encode_file(&source, &dest)
                .with_context(|| format!("Failed to encode {} into {}", source.display(), dest.display()))?;

            if cli.verbose > 0 {
                println!("Encoded: {} ({} bytes) -> {}", summary.name, summary.payload_bytes, dest.display());
            }
        }
        Commands::Bin { source, directory, no_metadata } => {
            let summary = Decoder::new()
                .with_output_dir(directory)
                .with_restore_metadata(!no_metadata)
                .decode_file(&source)
                .with_context(|| format!("Failed to decode {}", source.display()))?;

            if cli.verbose > 0 {
                println!("Restored: {} ({} bytes)", summary.path.display(), summary.bytes);
            }
        }
        Commands::Info { source } => {
            let header = Decoder::new()
                .read_header(&source)
                .with_context(|| format!("Failed to read header of {}", source.display()))?;
            let [attributes, creation, write, access] = header.record.to_fields();

            println!("Name:       {}", header.name);
            println!("Attributes: {}", attributes);
            println!("Created:    {}", creation);
            println!("Modified:   {}", write);
            println!("Accessed:   {}", access);
        }
    }

    Ok(())
}

/// Log to stderr; `RUST_LOG` wins over `-v`
fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();
}
