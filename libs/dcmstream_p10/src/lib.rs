//! Reads and writes the DICOM Part 10 (P10) binary format used to store and
//! transmit DICOM-based medical imaging information.

pub mod data_set_builder;
pub mod p10_error;
pub mod p10_read;
pub mod p10_read_config;
pub mod p10_token;
pub mod p10_write;
pub mod p10_write_config;
pub mod transforms;
pub mod uids;

mod internal;

use std::{fs::File, io::Read, io::Write, path::Path};

use dcmstream_core::{DataElementTag, DataSet, DataSetPath, RcByteSlice};

pub use data_set_builder::DataSetBuilder;
pub use p10_error::P10Error;
pub use p10_read::P10ReadContext;
pub use p10_read_config::P10ReadConfig;
pub use p10_token::P10Token;
pub use p10_write::P10WriteContext;
pub use p10_write_config::P10WriteConfig;
pub use transforms::p10_custom_type_transform::{
  P10CustomTypeTransform, P10CustomTypeTransformError,
};
pub use transforms::p10_filter_transform::P10FilterTransform;
pub use transforms::p10_insert_transform::P10InsertTransform;
pub use transforms::p10_print_transform::P10PrintTransform;

/// The type of read streams accepted by the streaming read functions.
///
pub type IoRead = dyn std::io::Read;

/// The type of write streams accepted by the streaming write functions.
///
pub type IoWrite = dyn std::io::Write;

/// Returns whether a file contains DICOM P10 data, determined by the
/// presence of the 'DICM' prefix at offset 128.
///
pub fn is_valid_file<P: AsRef<Path>>(filename: P) -> bool {
  match File::open(filename) {
    Ok(mut file) => {
      let mut buffer = [0u8; 132];
      match file.read_exact(&mut buffer) {
        Ok(()) => is_valid_bytes(&buffer),
        Err(_) => false,
      }
    }
    Err(_) => false,
  }
}

/// Returns whether the given bytes contain DICOM P10 data, determined by the
/// presence of the 'DICM' prefix at offset 128.
///
pub fn is_valid_bytes(bytes: &[u8]) -> bool {
  bytes.len() >= 132 && &bytes[128..132] == b"DICM"
}

/// Reads DICOM P10 data from a file into an in-memory data set.
///
pub fn read_file<P: AsRef<Path>>(filename: P) -> Result<DataSet, P10Error> {
  read_file_returning_builder_on_error(filename).map_err(|(e, _)| e)
}

/// Reads DICOM P10 data from a file into an in-memory data set. When an
/// error occurs during the read, the data set builder at the time of the
/// error is returned along with the error, allowing the data read prior to
/// the error to be turned into a partially-complete data set.
///
pub fn read_file_returning_builder_on_error<P: AsRef<Path>>(
  filename: P,
) -> Result<DataSet, (P10Error, Box<DataSetBuilder>)> {
  match File::open(filename) {
    Ok(mut file) => read_stream(&mut file),
    Err(e) => Err((
      P10Error::FileError {
        when: "Opening file".to_string(),
        details: e.to_string(),
      },
      Box::new(DataSetBuilder::new()),
    )),
  }
}

/// Reads DICOM P10 data from a read stream into an in-memory data set,
/// consuming all data available in the stream.
///
pub fn read_stream(
  stream: &mut IoRead,
) -> Result<DataSet, (P10Error, Box<DataSetBuilder>)> {
  let mut context = P10ReadContext::new(None);
  let mut builder = Box::new(DataSetBuilder::new());

  loop {
    let tokens = match read_tokens_from_stream(stream, &mut context) {
      Ok(tokens) => tokens,
      Err(e) => return Err((e, builder)),
    };

    for token in tokens {
      if let Err(e) = builder.add_token(&token) {
        return Err((e, builder));
      }
    }

    if let Ok(final_data_set) = builder.final_data_set() {
      return Ok(final_data_set);
    }
  }
}

/// Reads the next DICOM P10 tokens from a read stream. Bytes are read from
/// the stream in 256 KiB chunks until the read context makes at least one
/// token available or errors.
///
pub fn read_tokens_from_stream(
  stream: &mut IoRead,
  context: &mut P10ReadContext,
) -> Result<Vec<P10Token>, P10Error> {
  loop {
    match context.read_tokens() {
      Ok(tokens) => {
        if tokens.is_empty() {
          continue;
        }

        return Ok(tokens);
      }

      // The read context needs more data, so read bytes from the stream,
      // feed them to the read context, and try again
      Err(P10Error::DataRequired { .. }) => {
        let mut buffer = vec![0u8; 256 * 1024];
        match stream.read(&mut buffer) {
          Ok(0) => context.write_bytes(RcByteSlice::empty(), true)?,

          Ok(bytes_count) => {
            buffer.truncate(bytes_count);
            context.write_bytes(buffer.into(), false)?;
          }

          Err(e) => {
            return Err(P10Error::FileError {
              when: "Reading from stream".to_string(),
              details: e.to_string(),
            });
          }
        }
      }

      e => return e,
    }
  }
}

/// Reads DICOM P10 data from a vector of bytes into a data set.
///
pub fn read_bytes(
  bytes: RcByteSlice,
) -> Result<DataSet, (P10Error, Box<DataSetBuilder>)> {
  let mut context = P10ReadContext::new(None);
  let mut builder = Box::new(DataSetBuilder::new());

  if let Err(e) = context.write_bytes(bytes, true) {
    return Err((e, builder));
  }

  loop {
    match context.read_tokens() {
      Ok(tokens) => {
        for token in tokens.iter() {
          if let Err(e) = builder.add_token(token) {
            return Err((e, builder));
          }
        }

        if let Ok(final_data_set) = builder.final_data_set() {
          return Ok(final_data_set);
        }
      }

      Err(e) => return Err((e, builder)),
    }
  }
}

/// Reads DICOM P10 data from a file into an in-memory data set containing
/// only the specified root-level data elements. The file is only read up to
/// the point needed to return the requested data elements.
///
pub fn read_file_partial<P: AsRef<Path>>(
  filename: P,
  tags: &[DataElementTag],
  config: Option<P10ReadConfig>,
) -> Result<DataSet, P10Error> {
  match File::open(filename) {
    Ok(mut file) => read_stream_partial(&mut file, tags, config),
    Err(e) => Err(P10Error::FileError {
      when: "Opening file".to_string(),
      details: e.to_string(),
    }),
  }
}

/// Reads DICOM P10 data from a read stream into an in-memory data set
/// containing only the specified root-level data elements. The stream is
/// only read up to the point needed to return the requested data elements.
///
pub fn read_stream_partial(
  stream: &mut IoRead,
  tags: &[DataElementTag],
  config: Option<P10ReadConfig>,
) -> Result<DataSet, P10Error> {
  let mut context = P10ReadContext::new(config);

  // The read can stop once the largest requested tag has been passed
  let largest_tag = tags.iter().max().copied().unwrap_or(DataElementTag::ZERO);

  let mut filter = {
    let tags = tags.to_vec();
    P10FilterTransform::new(Box::new(move |tag, _vr, _length, path| {
      !path.is_root() || tags.contains(&tag)
    }))
  };

  let mut data_set_builder = DataSetBuilder::new();

  'read: loop {
    let tokens = read_tokens_from_stream(stream, &mut context)?;

    for token in tokens {
      if filter.add_token(&token)? {
        data_set_builder.add_token(&token)?;
      }

      match token {
        P10Token::DataElementHeader { tag, ref path, .. }
        | P10Token::SequenceStart { tag, ref path, .. } => {
          if tag > largest_tag && path.is_root() {
            break 'read;
          }
        }

        P10Token::End => break 'read,

        _ => (),
      }
    }
  }

  data_set_builder.force_end();
  let mut data_set = data_set_builder.final_data_set().unwrap();

  // File Meta Information tags are excluded unless explicitly requested
  data_set.retain(|tag, _value| {
    !tag.is_file_meta_information() || tags.contains(tag)
  });

  Ok(data_set)
}

/// Writes a data set to a DICOM P10 file, overwriting any existing file with
/// the given name.
///
pub fn write_file<P: AsRef<Path>>(
  filename: P,
  data_set: &DataSet,
  config: Option<P10WriteConfig>,
) -> Result<(), P10Error> {
  match File::create(filename) {
    Ok(mut file) => write_stream(&mut file, data_set, config),
    Err(e) => Err(P10Error::FileError {
      when: "Opening file".to_string(),
      details: e.to_string(),
    }),
  }
}

/// Writes a data set as DICOM P10 bytes directly to a write stream.
///
pub fn write_stream(
  stream: &mut IoWrite,
  data_set: &DataSet,
  config: Option<P10WriteConfig>,
) -> Result<(), P10Error> {
  let mut bytes_callback = |p10_bytes: RcByteSlice| -> Result<(), P10Error> {
    stream.write_all(&p10_bytes).map_err(|e| P10Error::FileError {
      when: "Writing DICOM P10 data to stream".to_string(),
      details: e.to_string(),
    })
  };

  p10_write::data_set_to_bytes(
    data_set,
    &DataSetPath::new(),
    &mut bytes_callback,
    config,
  )?;

  stream.flush().map_err(|e| P10Error::FileError {
    when: "Writing DICOM P10 data to stream".to_string(),
    details: e.to_string(),
  })
}

/// Writes DICOM P10 tokens to an output stream using the given write
/// context. Returns whether a [`P10Token::End`] token was present in the
/// tokens, i.e. whether the write is now complete.
///
pub fn write_tokens_to_stream(
  tokens: &[P10Token],
  stream: &mut IoWrite,
  context: &mut P10WriteContext,
) -> Result<bool, P10Error> {
  for token in tokens.iter() {
    context.write_token(token)?;
  }

  for bytes in context.read_bytes() {
    stream.write_all(&bytes).map_err(|e| P10Error::FileError {
      when: "Writing to output stream".to_string(),
      details: e.to_string(),
    })?;
  }

  if tokens.last() == Some(&P10Token::End) {
    stream.flush().map_err(|e| P10Error::FileError {
      when: "Writing to output stream".to_string(),
      details: e.to_string(),
    })?;

    Ok(true)
  } else {
    Ok(false)
  }
}

/// Adds functions to [`DataSet`] for converting to and from the DICOM P10
/// format.
///
pub trait DataSetP10Extensions
where
  Self: Sized,
{
  /// Reads DICOM P10 data from a file into an in-memory data set.
  ///
  fn read_p10_file<P: AsRef<Path>>(filename: P) -> Result<Self, P10Error>;

  /// Reads DICOM P10 data from a read stream into an in-memory data set,
  /// consuming all data available in the stream.
  ///
  fn read_p10_stream(stream: &mut IoRead) -> Result<Self, P10Error>;

  /// Reads DICOM P10 data from a vector of bytes into a data set.
  ///
  fn read_p10_bytes(
    bytes: RcByteSlice,
  ) -> Result<Self, (P10Error, Box<DataSetBuilder>)>;

  /// Writes a data set to a DICOM P10 file, overwriting any existing file
  /// with the given name.
  ///
  fn write_p10_file<P: AsRef<Path>>(
    &self,
    filename: P,
    config: Option<P10WriteConfig>,
  ) -> Result<(), P10Error>;

  /// Writes a data set as DICOM P10 bytes directly to a write stream.
  ///
  fn write_p10_stream(
    &self,
    stream: &mut IoWrite,
    config: Option<P10WriteConfig>,
  ) -> Result<(), P10Error>;

  /// Converts a data set to DICOM P10 tokens returned via a callback.
  ///
  fn to_p10_tokens<E>(
    &self,
    token_callback: &mut impl FnMut(&P10Token) -> Result<(), E>,
  ) -> Result<(), E>;

  /// Converts a data set to DICOM P10 bytes returned via a callback.
  ///
  fn to_p10_bytes(
    &self,
    bytes_callback: &mut impl FnMut(RcByteSlice) -> Result<(), P10Error>,
    config: Option<P10WriteConfig>,
  ) -> Result<(), P10Error>;
}

impl DataSetP10Extensions for DataSet {
  fn read_p10_file<P: AsRef<Path>>(filename: P) -> Result<Self, P10Error> {
    read_file(filename)
  }

  fn read_p10_stream(stream: &mut IoRead) -> Result<DataSet, P10Error> {
    read_stream(stream).map_err(|(e, _)| e)
  }

  fn read_p10_bytes(
    bytes: RcByteSlice,
  ) -> Result<Self, (P10Error, Box<DataSetBuilder>)> {
    read_bytes(bytes)
  }

  fn write_p10_file<P: AsRef<Path>>(
    &self,
    filename: P,
    config: Option<P10WriteConfig>,
  ) -> Result<(), P10Error> {
    write_file(filename, self, config)
  }

  fn write_p10_stream(
    &self,
    stream: &mut IoWrite,
    config: Option<P10WriteConfig>,
  ) -> Result<(), P10Error> {
    write_stream(stream, self, config)
  }

  fn to_p10_tokens<E>(
    &self,
    token_callback: &mut impl FnMut(&P10Token) -> Result<(), E>,
  ) -> Result<(), E> {
    p10_write::data_set_to_tokens(self, &DataSetPath::new(), token_callback)
  }

  fn to_p10_bytes(
    &self,
    bytes_callback: &mut impl FnMut(RcByteSlice) -> Result<(), P10Error>,
    config: Option<P10WriteConfig>,
  ) -> Result<(), P10Error> {
    p10_write::data_set_to_bytes(
      self,
      &DataSetPath::new(),
      bytes_callback,
      config,
    )
  }
}
