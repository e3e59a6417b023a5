use std::fs::File;
use std::io::Write;

use clap::Args;

use dcmstream::core::*;
use dcmstream::p10::*;

pub const ABOUT: &str = "Prints the content of a DICOM P10 file";

#[derive(Args)]
pub struct PrintArgs {
  #[arg(help = "The name of the DICOM P10 file to print")]
  input_filename: String,

  #[arg(
    long,
    short,
    help = "\
      The maximum width in characters of the printed output. By default this \
      is set to the width of the active terminal, or 80 characters if the \
      terminal width can't be detected.",
    value_parser = clap::value_parser!(u32).range(0..10000),
  )]
  max_width: Option<u32>,

  #[arg(
    long,
    short,
    help = "\
      Whether to print output using color and bold text. By default this is \
      set based on whether there is an active output terminal that supports \
      colored output."
  )]
  styled: Option<bool>,
}

pub fn run(args: &PrintArgs) -> Result<(), ()> {
  // A small max token size keeps memory usage low. 256 KiB of data is still
  // plenty to preview the content of data element values.
  let config = P10ReadConfig::default().max_token_size(256 * 1024);

  let mut print_options = DataSetPrintOptions::default();
  if let Some(max_width) = args.max_width {
    print_options = print_options.max_width(max_width as usize);
  }
  if let Some(styled) = args.styled {
    print_options = print_options.styled(styled);
  }

  match perform_print(&args.input_filename, config, &print_options) {
    Ok(()) => Ok(()),
    Err(e) => {
      e.print(&format!("printing file \"{}\"", args.input_filename));
      Err(())
    }
  }
}

fn perform_print(
  input_filename: &str,
  config: P10ReadConfig,
  print_options: &DataSetPrintOptions,
) -> Result<(), P10Error> {
  let mut file =
    File::open(input_filename).map_err(|e| P10Error::FileError {
      when: "Opening file".to_string(),
      details: e.to_string(),
    })?;

  let mut context = P10ReadContext::new(Some(config));
  let mut print_transform = P10PrintTransform::new(print_options);

  let mut stdout = std::io::stdout();

  loop {
    let tokens = read_tokens_from_stream(&mut file, &mut context)?;

    for token in tokens.iter() {
      match token {
        P10Token::FilePreambleAndDICMPrefix { .. } => (),

        P10Token::End => return Ok(()),

        token => {
          let s = print_transform.add_token(token);

          stdout.write_all(s.as_bytes()).map_err(|e| {
            P10Error::FileError {
              when: "Writing to stdout".to_string(),
              details: e.to_string(),
            }
          })?;
        }
      };
    }
  }
}
