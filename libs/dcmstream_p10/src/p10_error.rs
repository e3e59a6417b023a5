//! The error type describing everything that can go wrong when reading and
//! writing DICOM P10 data.

use dcmstream_core::{DataSetPath, DcmError};

use crate::P10Token;

/// An error that occurred when reading or writing DICOM P10 data.
///
#[derive(Clone, Debug, PartialEq)]
pub enum P10Error {
  /// The data specifies a DICOM transfer syntax that isn't supported.
  TransferSyntaxNotSupported { transfer_syntax_uid: String },

  /// The data contains a *'(0008,0005) Specific Character Set'* data element
  /// that is invalid or unable to be decoded.
  SpecificCharacterSetInvalid {
    specific_character_set: String,
    details: String,
  },

  /// A read context requires more data to be written to it before the next
  /// token can be read. The caller should supply further bytes and retry.
  DataRequired { when: String },

  /// The end of the data was reached while the current element was still
  /// incomplete and no further data can be added. The input is malformed or
  /// truncated.
  DataEndedUnexpectedly {
    when: String,
    path: DataSetPath,
    offset: u64,
  },

  /// The supplied data does not have 'DICM' at offset 128 and the read
  /// config requires that it does.
  DicmPrefixNotPresent,

  /// The supplied data is malformed and the next token can't be read, or a
  /// token written to a write context can't be serialized.
  DataInvalid {
    when: String,
    details: String,
    path: DataSetPath,
    offset: u64,
  },

  /// One of the configured maximums was exceeded while reading. These
  /// maximums bound memory usage during a streaming read.
  MaximumExceeded {
    details: String,
    path: DataSetPath,
    offset: u64,
  },

  /// A stream of [`P10Token`]s being ingested contained a token that is
  /// invalid at the current position in the stream, e.g. a
  /// [`P10Token::DataElementValueBytes`] token that doesn't follow a
  /// [`P10Token::DataElementHeader`].
  TokenStreamInvalid {
    when: String,
    details: String,
    token: P10Token,
  },

  /// Bytes were supplied to a read context after its final bytes had already
  /// been written.
  WriteAfterCompletion,

  /// An error with an underlying file or stream.
  FileError { when: String, details: String },

  /// A fallback for errors not covered by the other variants.
  OtherError { error_type: String, details: String },
}

impl core::fmt::Display for P10Error {
  fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
    write!(f, "DICOM P10 error: {}", self.name())
  }
}

impl P10Error {
  /// Returns the name of the error as a human-readable string.
  ///
  pub fn name(&self) -> &str {
    match self {
      Self::TransferSyntaxNotSupported { .. } => {
        "Transfer syntax not supported"
      }
      Self::SpecificCharacterSetInvalid { .. } => {
        "Specific character set invalid"
      }
      Self::DataRequired { .. } => "Data required",
      Self::DataEndedUnexpectedly { .. } => "Unexpected end of data",
      Self::DicmPrefixNotPresent => "'DICM' prefix is not present",
      Self::DataInvalid { .. } => "Invalid data",
      Self::MaximumExceeded { .. } => "Maximum exceeded",
      Self::TokenStreamInvalid { .. } => "P10 token stream invalid",
      Self::WriteAfterCompletion => "Write after completion",
      Self::FileError { .. } => "File I/O failure",
      Self::OtherError { error_type, .. } => error_type,
    }
  }

  /// Returns the `details` field of the error, if it has one.
  ///
  pub fn details(&self) -> &str {
    match self {
      Self::SpecificCharacterSetInvalid { details, .. }
      | Self::DataInvalid { details, .. }
      | Self::MaximumExceeded { details, .. }
      | Self::TokenStreamInvalid { details, .. }
      | Self::FileError { details, .. }
      | Self::OtherError { details, .. } => details,

      _ => "",
    }
  }
}

impl DcmError for P10Error {
  /// Returns lines of text that describe a DICOM P10 error in a
  /// human-readable format.
  ///
  fn to_lines(&self, task_description: &str) -> Vec<String> {
    let mut lines = vec![
      format!("DICOM P10 error {task_description}"),
      "".to_string(),
      format!("  Error: {}", self.name()),
    ];

    match self {
      P10Error::DataRequired { when }
      | P10Error::DataEndedUnexpectedly { when, .. }
      | P10Error::DataInvalid { when, .. }
      | P10Error::TokenStreamInvalid { when, .. }
      | P10Error::FileError { when, .. } => {
        lines.push(format!("  When: {when}"));
      }

      _ => (),
    };

    match self {
      P10Error::TransferSyntaxNotSupported {
        transfer_syntax_uid,
      } => {
        lines.push(format!("  Transfer syntax UID: {transfer_syntax_uid}"));
      }

      P10Error::SpecificCharacterSetInvalid {
        specific_character_set,
        details,
      } => {
        lines.push(format!(
          "  Specific character set: {specific_character_set}"
        ));

        if !details.is_empty() {
          lines.push(format!("  Details: {details}"));
        }
      }

      P10Error::TokenStreamInvalid { details, token, .. } => {
        lines.push(format!("  Details: {details}"));
        lines.push(format!("  Token: {token}"));
      }

      P10Error::DataInvalid { details, .. }
      | P10Error::MaximumExceeded { details, .. }
      | P10Error::FileError { details, .. }
      | P10Error::OtherError { details, .. } => {
        lines.push(format!("  Details: {details}"));
      }

      _ => (),
    };

    match self {
      P10Error::DataEndedUnexpectedly { path, offset, .. }
      | P10Error::DataInvalid { path, offset, .. }
      | P10Error::MaximumExceeded { path, offset, .. } => {
        lines.push(format!("  Path: {}", path.to_detailed_string()));
        lines.push(format!("  Offset: 0x{offset:X}"));
      }

      _ => (),
    };

    lines
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn to_lines_test() {
    let error = P10Error::DataInvalid {
      when: "Reading data element header".to_string(),
      details: "Tag is garbage".to_string(),
      path: DataSetPath::from_string("7FE00010").unwrap(),
      offset: 0x1234,
    };

    assert_eq!(
      error.to_lines("reading file \"a.dcm\"").join("\n"),
      "DICOM P10 error reading file \"a.dcm\"\n\
       \n  \
       Error: Invalid data\n  \
       When: Reading data element header\n  \
       Details: Tag is garbage\n  \
       Path: (7FE0,0010) Pixel Data\n  \
       Offset: 0x1234"
    );
  }
}
