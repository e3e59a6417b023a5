use std::fs::File;
use std::io::{Read, Write};

use clap::Args;

use dcmstream::core::*;
use dcmstream::p10::*;

pub const ABOUT: &str = "Reads a DICOM P10 file, applies requested \
  modifications, and writes out a new DICOM P10 file";

#[derive(Args)]
pub struct ModifyArgs {
  #[arg(
    help = "The name of the file to read DICOM P10 content from. Specify '-' \
      to read from stdin."
  )]
  input_filename: String,

  #[arg(
    help = "The name of the file to write DICOM P10 content to. Specify '-' \
      to write to stdout."
  )]
  output_filename: String,

  #[arg(
    long,
    short,
    help = "The transfer syntax for the output DICOM P10 file. Conversion is \
      only supported between the following transfer syntaxes: \
      'implicit-vr-little-endian', 'explicit-vr-little-endian', \
      'deflated-explicit-vr-little-endian', and 'explicit-vr-big-endian'."
  )]
  transfer_syntax: Option<String>,

  #[arg(
    long,
    short,
    help = "\
      The zlib compression level to use when outputting to the 'Deflated \
      Explicit VR Little Endian' transfer syntax. The level ranges from 0, \
      meaning no compression, through to 9, which gives the best compression \
      at the cost of speed.",
    default_value_t = 6,
    value_parser = clap::value_parser!(u32).range(0..=9),
  )]
  zlib_compression_level: u32,

  #[arg(
    long,
    help = "The value to write into the '(0002,0013) Implementation Version \
      Name' data element of the output DICOM P10 file."
  )]
  implementation_version_name: Option<String>,

  #[arg(
    long,
    short,
    help = "The data element tags to delete and not include in the output \
      DICOM P10 file. Separate each tag to be removed with a comma. E.g. \
      --delete-tags 00100010,00100030",
    value_parser = validate_data_element_tag_list,
    default_value_t = String::new()
  )]
  delete_tags: String,
}

fn validate_data_element_tag_list(s: &str) -> Result<String, String> {
  if !s.is_empty() {
    for tag in s.split(',') {
      if DataElementTag::from_hex_string(tag).is_err() {
        return Err(format!("Invalid data element tag: {tag}"));
      }
    }
  }

  Ok(s.to_string())
}

pub fn run(args: &ModifyArgs) -> Result<(), ()> {
  let mut write_config = P10WriteConfig::default()
    .zlib_compression_level(args.zlib_compression_level);

  if let Some(implementation_version_name) = &args.implementation_version_name
  {
    write_config = write_config
      .implementation_version_name(implementation_version_name.clone());
  }

  let tags_to_delete: Vec<DataElementTag> = if args.delete_tags.is_empty() {
    vec![]
  } else {
    args
      .delete_tags
      .split(',')
      .map(DataElementTag::from_hex_string)
      .collect::<Result<_, _>>()
      .unwrap()
  };

  // A filter transform removes the data elements to be deleted
  let filter_transform = if tags_to_delete.is_empty() {
    None
  } else {
    Some(P10FilterTransform::new(Box::new(
      move |tag, _vr, _length, _path| !tags_to_delete.contains(&tag),
    )))
  };

  let modify_result = match parse_transfer_syntax_flag(&args.transfer_syntax) {
    Ok(output_transfer_syntax) => streaming_rewrite(
      &args.input_filename,
      &args.output_filename,
      write_config,
      output_transfer_syntax,
      filter_transform,
    ),

    Err(e) => Err(e),
  };

  match modify_result {
    Ok(()) => Ok(()),
    Err(e) => {
      // Remove any partially written output file
      if args.output_filename != "-" {
        let _ = std::fs::remove_file(&args.output_filename);
      }

      e.print(&format!("modifying file \"{}\"", args.input_filename));
      Err(())
    }
  }
}

/// Validates the value passed to `--transfer-syntax`, if present.
///
fn parse_transfer_syntax_flag(
  transfer_syntax_flag: &Option<String>,
) -> Result<Option<&'static TransferSyntax>, P10Error> {
  match transfer_syntax_flag.as_deref() {
    None => Ok(None),

    Some("implicit-vr-little-endian") => {
      Ok(Some(&transfer_syntax::IMPLICIT_VR_LITTLE_ENDIAN))
    }
    Some("explicit-vr-little-endian") => {
      Ok(Some(&transfer_syntax::EXPLICIT_VR_LITTLE_ENDIAN))
    }
    Some("deflated-explicit-vr-little-endian") => {
      Ok(Some(&transfer_syntax::DEFLATED_EXPLICIT_VR_LITTLE_ENDIAN))
    }
    Some("explicit-vr-big-endian") => {
      Ok(Some(&transfer_syntax::EXPLICIT_VR_BIG_ENDIAN))
    }

    Some(value) => Err(P10Error::OtherError {
      error_type: "Unsupported transfer syntax conversion".to_string(),
      details: format!("The transfer syntax '{value}' is not recognized"),
    }),
  }
}

/// Rewrites by streaming the DICOM P10 tokens of the input file straight to
/// the output file.
///
fn streaming_rewrite(
  input_filename: &str,
  output_filename: &str,
  write_config: P10WriteConfig,
  output_transfer_syntax: Option<&TransferSyntax>,
  mut filter_transform: Option<P10FilterTransform>,
) -> Result<(), P10Error> {
  let mut input_stream: Box<dyn Read> = match input_filename {
    "-" => Box::new(std::io::stdin()),
    _ => Box::new(File::open(input_filename).map_err(|e| {
      P10Error::FileError {
        when: "Opening input file".to_string(),
        details: e.to_string(),
      }
    })?),
  };

  let mut output_stream: Box<dyn Write> = match output_filename {
    "-" => Box::new(std::io::stdout()),
    _ => Box::new(File::create(output_filename).map_err(|e| {
      P10Error::FileError {
        when: format!("Opening output file \"{output_filename}\""),
        details: e.to_string(),
      }
    })?),
  };

  // Keep memory usage low while streaming
  let read_config = P10ReadConfig::default().max_token_size(256 * 1024);

  let mut read_context = P10ReadContext::new(Some(read_config));
  let mut write_context = P10WriteContext::new(Some(write_config));

  loop {
    let tokens =
      read_tokens_from_stream(&mut input_stream, &mut read_context)?;

    // Pass tokens through the filter when one is active
    let tokens: Vec<P10Token> = match filter_transform.as_mut() {
      Some(filter_transform) => {
        let mut filtered = Vec::with_capacity(tokens.len());

        for token in tokens {
          if token.is_header_token() || filter_transform.add_token(&token)? {
            filtered.push(token);
          }
        }

        filtered
      }

      None => tokens,
    };

    // Apply any requested change of transfer syntax to the File Meta
    // Information
    let tokens: Vec<P10Token> = match output_transfer_syntax {
      Some(transfer_syntax) => tokens
        .into_iter()
        .map(|mut token| {
          if let P10Token::FileMetaInformation { data_set } = &token {
            validate_source_transfer_syntax(data_set)?;
            token.change_transfer_syntax(transfer_syntax);
          }

          Ok(token)
        })
        .collect::<Result<_, P10Error>>()?,

      None => tokens,
    };

    let is_ended =
      write_tokens_to_stream(&tokens, &mut output_stream, &mut write_context)?;

    if is_ended {
      return Ok(());
    }
  }
}

/// Errors when the input file's transfer syntax isn't one that this command
/// can convert from, i.e. one of the uncompressed or deflated transfer
/// syntaxes.
///
fn validate_source_transfer_syntax(
  file_meta_information: &DataSet,
) -> Result<(), P10Error> {
  let source_transfer_syntax = file_meta_information
    .get_transfer_syntax()
    .unwrap_or(&transfer_syntax::IMPLICIT_VR_LITTLE_ENDIAN);

  let valid_source_transfer_syntaxes = [
    &transfer_syntax::IMPLICIT_VR_LITTLE_ENDIAN,
    &transfer_syntax::EXPLICIT_VR_LITTLE_ENDIAN,
    &transfer_syntax::DEFLATED_EXPLICIT_VR_LITTLE_ENDIAN,
    &transfer_syntax::EXPLICIT_VR_BIG_ENDIAN,
  ];

  if valid_source_transfer_syntaxes.contains(&source_transfer_syntax) {
    Ok(())
  } else {
    Err(P10Error::OtherError {
      error_type: "Unsupported transfer syntax conversion".to_string(),
      details: format!(
        "The transfer syntax '{}' is not able to be converted from",
        source_transfer_syntax.name
      ),
    })
  }
}
