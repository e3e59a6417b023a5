use std::fs::File;
use std::io::Write;

use clap::Args;

use dcmstream::core::*;
use dcmstream::p10::*;
use dcmstream::pixel_data::*;

pub const ABOUT: &str = "Extracts the frames of pixel data in a DICOM P10 \
  file and writes each one to its own file";

#[derive(Args)]
pub struct GetPixelDataArgs {
  #[arg(help = "The name of the DICOM P10 file to extract pixel data from")]
  input_filename: String,

  #[arg(
    long,
    short,
    help = "The prefix for the output files. Each frame of pixel data is \
      written to a file named '<output-prefix>.<frame-index>.bin'. Defaults \
      to the input filename."
  )]
  output_prefix: Option<String>,
}

pub fn run(args: &GetPixelDataArgs) -> Result<(), ()> {
  let output_prefix =
    args.output_prefix.as_ref().unwrap_or(&args.input_filename);

  match extract_frames(&args.input_filename, output_prefix) {
    Ok(frame_count) => {
      eprintln!("Wrote {frame_count} frame(s)");
      Ok(())
    }

    Err(e) => {
      e.print(&format!(
        "extracting pixel data from \"{}\"",
        args.input_filename
      ));
      Err(())
    }
  }
}

fn extract_frames(
  input_filename: &str,
  output_prefix: &str,
) -> Result<usize, P10PixelDataFrameTransformError> {
  let map_file_error = |when: &str, e: std::io::Error| {
    P10PixelDataFrameTransformError::P10Error(P10Error::FileError {
      when: when.to_string(),
      details: e.to_string(),
    })
  };

  let mut file = File::open(input_filename)
    .map_err(|e| map_file_error("Opening input file", e))?;

  // Keep memory usage low while streaming out frames
  let config = P10ReadConfig::default().max_token_size(256 * 1024);
  let mut context = P10ReadContext::new(Some(config));

  let mut frame_transform = P10PixelDataFrameTransform::new();
  let mut frame_count = 0;

  loop {
    let tokens = read_tokens_from_stream(&mut file, &mut context)
      .map_err(P10PixelDataFrameTransformError::P10Error)?;

    for token in tokens.iter() {
      for frame in frame_transform.add_token(token)? {
        write_frame(output_prefix, &frame).map_err(|e| {
          map_file_error("Writing frame to output file", e)
        })?;

        frame_count += 1;
      }

      if *token == P10Token::End {
        return Ok(frame_count);
      }
    }
  }
}

fn write_frame(
  output_prefix: &str,
  frame: &PixelDataFrame,
) -> Result<(), std::io::Error> {
  let filename = format!("{output_prefix}.{:04}.bin", frame.index());

  let mut file = File::create(&filename)?;

  // Frames with a bit offset have to be written from a shifted copy
  if frame.bit_offset() == 0 {
    for fragment in frame.fragments() {
      file.write_all(fragment)?;
    }
  } else {
    file.write_all(&frame.to_bytes())?;
  }

  file.flush()
}
