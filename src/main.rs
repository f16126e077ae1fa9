// Copyright (C) 2026 Brian Johnson
//
// This program is free software; you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation; either version 2 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along
// with this program; if not, write to the Free Software Foundation, Inc.,
// 51 Franklin Street, Fifth Floor, Boston, MA 02110-1301 USA.

use clap::{Parser, Subcommand};
use log::LevelFilter;
use std::path::PathBuf;
use ftp2serial::pipeline::{self, PipelineError};
use ftp2serial::serial::{self, SerialConfig, SystemPorts};
use ftp2serial::source::{FileSource, ReaderSource, RecordSource};

#[derive(Parser)]
#[command(name = "ftp2serial")]
#[command(about = "Format a pipe-delimited record as a ROG frame and send it over RS-232", long_about = None)]
#[command(disable_help_subcommand = true)]
struct Cli {
    /// Enable debug output
    #[arg(long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the formatted frame without sending it
    Format {
        /// Record file, or - for stdin
        input: PathBuf,
    },
    /// Format a record and send it to the serial port
    Send {
        /// Serial port to use (e.g., /dev/ttyUSB0 or COM1)
        #[arg(short, long)]
        port: String,

        /// Baud rate
        #[arg(short, long, default_value = "9600")]
        baud: u32,

        /// Record file, or - for stdin
        input: PathBuf,
    },
    /// List serial ports on this machine
    Ports,
}

fn open_source(input: PathBuf) -> Box<dyn RecordSource> {
    if input.as_os_str() == "-" {
        Box::new(ReaderSource::new(std::io::stdin()))
    } else {
        Box::new(FileSource::new(input))
    }
}

fn main() {
    let cli = Cli::parse();

    env_logger::Builder::new()
        .filter_level(if cli.debug { LevelFilter::Debug } else { LevelFilter::Warn })
        .parse_default_env()
        .init();

    let result = match cli.command {
        Commands::Format { input } => format_record(input),
        Commands::Send { port, baud, input } => send_record(input, SerialConfig::new(port, baud)),
        Commands::Ports => list_ports(),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn format_record(input: PathBuf) -> Result<(), PipelineError> {
    let raw = open_source(input).fetch()?;
    let frame = pipeline::preview(&raw)?;
    println!("{}", frame);
    Ok(())
}

fn send_record(input: PathBuf, config: SerialConfig) -> Result<(), PipelineError> {
    println!("Opening serial port: {}", config.port_name);
    println!("Settings: {} baud, {:?}, {:?}, {:?}", config.baud_rate, serial::DATA_BITS, serial::PARITY, serial::STOP_BITS);

    let mut source = open_source(input);
    let frame = pipeline::fetch_and_send(source.as_mut(), &SystemPorts, &config)?;
    println!("\nSent: {}", frame);
    Ok(())
}

fn list_ports() -> Result<(), PipelineError> {
    let ports = serial::available_ports()?;
    if ports.is_empty() {
        println!("No serial ports found");
    }
    for port in ports {
        println!("{}", port);
    }
    Ok(())
}
