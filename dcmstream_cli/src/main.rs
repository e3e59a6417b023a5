//! Entry point for the dcmstream CLI tool.

mod commands;

use clap::{Parser, Subcommand};

use commands::{get_pixel_data_command, modify_command, print_command};

#[derive(Parser)]
#[command(
  name = "dcmstream",
  bin_name = "dcmstream",
  version = env!("CARGO_PKG_VERSION"),
  about = "dcmstream is a CLI app for working with DICOM P10 files",
  max_term_width = 80
)]
struct Cli {
  #[command(subcommand)]
  command: Commands,
}

#[derive(Subcommand)]
enum Commands {
  #[command(about = get_pixel_data_command::ABOUT)]
  GetPixelData(get_pixel_data_command::GetPixelDataArgs),

  #[command(about = modify_command::ABOUT)]
  Modify(modify_command::ModifyArgs),

  #[command(about = print_command::ABOUT)]
  Print(print_command::PrintArgs),
}

fn main() -> std::process::ExitCode {
  let cli = Cli::parse();

  let result = match &cli.command {
    Commands::GetPixelData(args) => get_pixel_data_command::run(args),
    Commands::Modify(args) => modify_command::run(args),
    Commands::Print(args) => print_command::run(args),
  };

  match result {
    Ok(()) => std::process::ExitCode::SUCCESS,
    Err(()) => std::process::ExitCode::FAILURE,
  }
}
