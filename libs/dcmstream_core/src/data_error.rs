//! Provides the [`DataError`] type describing errors that occur when working
//! with data sets and data element values.

use crate::{DataSetPath, DcmError, ValueRepresentation, dictionary};

/// An error that occurred when retrieving or creating data elements in data
/// sets.
///
#[derive(Clone, Debug, PartialEq)]
pub enum DataError {
  /// When retrieving a value, the requested tag was not present in the data
  /// set.
  TagNotPresent { path: DataSetPath },

  /// When retrieving a value, the requested type is not present, e.g. an
  /// integer was requested from a data element holding a string.
  ValueNotPresent { path: Option<DataSetPath> },

  /// When retrieving a value, it did not have the required multiplicity, e.g.
  /// a single string was requested from a multi-valued string element.
  MultiplicityMismatch { path: Option<DataSetPath> },

  /// When retrieving a value, its bytes could not be decoded. When creating a
  /// value, the supplied input was not valid for the kind of data element
  /// being created.
  ValueInvalid {
    details: String,
    path: Option<DataSetPath>,
  },

  /// When creating a value, the supplied data did not meet a length
  /// constraint of the value representation.
  ValueLengthInvalid {
    vr: ValueRepresentation,
    length: u64,
    details: String,
    path: Option<DataSetPath>,
  },
}

impl core::fmt::Display for DataError {
  fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
    fn path_to_string(path: &Option<DataSetPath>) -> String {
      path
        .as_ref()
        .map(|path| path.to_detailed_string())
        .unwrap_or_else(|| "<unknown>".to_string())
    }

    let error = match &self {
      Self::TagNotPresent { path } => {
        format!("Tag not present at {}", path.to_detailed_string())
      }
      Self::ValueNotPresent { path } => {
        format!("Value not present at {}", path_to_string(path))
      }
      Self::MultiplicityMismatch { path } => {
        format!("Multiplicity mismatch at {}", path_to_string(path))
      }
      Self::ValueInvalid { details, path } => {
        format!(
          "Invalid value at {}, details: {}",
          path_to_string(path),
          details
        )
      }
      Self::ValueLengthInvalid { details, path, .. } => {
        format!(
          "Invalid value length at {}, details: {}",
          path_to_string(path),
          details
        )
      }
    };

    write!(f, "DICOM data error: {error}")
  }
}

impl DataError {
  /// Constructs a new 'Tag not present' data error.
  ///
  pub fn new_tag_not_present() -> Self {
    Self::TagNotPresent {
      path: DataSetPath::new(),
    }
  }

  /// Constructs a new 'Value not present' data error.
  ///
  pub fn new_value_not_present() -> Self {
    Self::ValueNotPresent { path: None }
  }

  /// Constructs a new 'Multiplicity mismatch' data error.
  ///
  pub fn new_multiplicity_mismatch() -> Self {
    Self::MultiplicityMismatch { path: None }
  }

  /// Constructs a new 'Value invalid' data error.
  ///
  pub fn new_value_invalid(details: String) -> Self {
    Self::ValueInvalid {
      details,
      path: None,
    }
  }

  /// Constructs a new 'Value length invalid' data error.
  ///
  pub fn new_value_length_invalid(
    vr: ValueRepresentation,
    length: u64,
    details: String,
  ) -> Self {
    Self::ValueLengthInvalid {
      vr,
      length,
      details,
      path: None,
    }
  }

  /// Adds a data set path to a data error, indicating the exact location in a
  /// data set that the error occurred.
  ///
  pub fn with_path(self, path: &DataSetPath) -> Self {
    match self {
      Self::TagNotPresent { .. } => Self::TagNotPresent { path: path.clone() },
      Self::ValueNotPresent { .. } => Self::ValueNotPresent {
        path: Some(path.clone()),
      },
      Self::MultiplicityMismatch { .. } => Self::MultiplicityMismatch {
        path: Some(path.clone()),
      },
      Self::ValueInvalid { details, .. } => Self::ValueInvalid {
        details,
        path: Some(path.clone()),
      },
      Self::ValueLengthInvalid {
        vr,
        length,
        details,
        ..
      } => Self::ValueLengthInvalid {
        vr,
        length,
        details,
        path: Some(path.clone()),
      },
    }
  }

  /// Returns the name of a data error as a human-readable string.
  ///
  pub fn name(&self) -> &'static str {
    match &self {
      Self::TagNotPresent { .. } => "Tag not present",
      Self::ValueNotPresent { .. } => "Value not present",
      Self::MultiplicityMismatch { .. } => "Multiplicity mismatch",
      Self::ValueInvalid { .. } => "Invalid value",
      Self::ValueLengthInvalid { .. } => "Invalid value length",
    }
  }
}

impl DcmError for DataError {
  fn to_lines(&self, task_description: &str) -> Vec<String> {
    let mut lines = vec![
      format!("DICOM data error {task_description}"),
      "".to_string(),
      format!("  Error: {}", self.name()),
    ];

    match &self {
      Self::TagNotPresent { path }
      | Self::ValueNotPresent {
        path: Some(path), ..
      }
      | Self::MultiplicityMismatch {
        path: Some(path), ..
      }
      | Self::ValueInvalid {
        path: Some(path), ..
      }
      | Self::ValueLengthInvalid {
        path: Some(path), ..
      } => {
        if let Ok(tag) = path.final_data_element() {
          lines.push(format!("  Tag: {tag}"));
          lines.push(format!("  Name: {}", dictionary::tag_name(tag, None)));
        }

        lines.push(format!("  Path: {}", path.to_detailed_string()));
      }
      _ => (),
    };

    match &self {
      Self::ValueInvalid { details, .. } => {
        lines.push(format!("  Details: {details}"))
      }
      Self::ValueLengthInvalid {
        vr,
        length,
        details,
        ..
      } => {
        lines.push(format!("  VR: {vr}"));
        lines.push(format!("  Length: {length} bytes"));
        lines.push(format!("  Details: {details}"));
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
    assert_eq!(
      DataError::new_tag_not_present()
        .with_path(&DataSetPath::from_string("7FE00010").unwrap())
        .to_lines("reading file")
        .join("\n"),
      "DICOM data error reading file\n\
       \n  \
       Error: Tag not present\n  \
       Tag: (7FE0,0010)\n  \
       Name: Pixel Data\n  \
       Path: (7FE0,0010) Pixel Data"
    );

    assert_eq!(
      DataError::new_value_length_invalid(
        ValueRepresentation::AgeString,
        5,
        "Test 123".to_string(),
      )
      .to_lines("testing")
      .join("\n"),
      "DICOM data error testing\n\
       \n  \
       Error: Invalid value length\n  \
       VR: AS\n  \
       Length: 5 bytes\n  \
       Details: Test 123"
    );
  }
}
