use dcmstream_core::{DataElementTag, DataError, DataSet, DcmError};

use crate::{DataSetBuilder, P10Error, P10FilterTransform, P10Token};

/// Transform that gathers a declared subset of root-level data elements out
/// of a stream of DICOM P10 tokens and constructs a custom type from them:
///
/// 1. The tags of the data elements needed by the custom type are declared
///    up front.
/// 2. Those data elements are extracted from the token stream into a data
///    set as the stream passes through.
/// 3. Once the stream has moved past the highest declared tag, or has ended,
///    the data set is passed to the construction function.
///
/// The constructed value is accessed with
/// [`P10CustomTypeTransform::get_output`], which returns `None` until it is
/// available.
///
pub struct P10CustomTypeTransform<T> {
  filter: Option<(P10FilterTransform, DataSetBuilder)>,
  highest_tag: DataElementTag,
  target_from_data_set: TargetFromDataSetFn<T>,
  target: Option<T>,
}

type TargetFromDataSetFn<T> = fn(&DataSet) -> Result<T, DataError>;

/// An error from converting a stream of DICOM P10 tokens to a custom type.
///
#[derive(Clone, Debug, PartialEq)]
pub enum P10CustomTypeTransformError {
  /// The stream of DICOM P10 tokens was itself invalid.
  P10Error(P10Error),

  /// The custom type could not be created from the gathered data set.
  DataError(DataError),
}

impl core::fmt::Display for P10CustomTypeTransformError {
  fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
    match self {
      Self::P10Error(e) => e.fmt(f),
      Self::DataError(e) => e.fmt(f),
    }
  }
}

impl DcmError for P10CustomTypeTransformError {
  fn to_lines(&self, task_description: &str) -> Vec<String> {
    match self {
      Self::P10Error(e) => e.to_lines(task_description),
      Self::DataError(e) => e.to_lines(task_description),
    }
  }
}

impl<T> P10CustomTypeTransform<T> {
  /// Creates a new transform that gathers the given root-level tags and
  /// constructs the custom type with the given function once they have all
  /// been seen.
  ///
  pub fn new(
    tags: &'static [DataElementTag],
    target_from_data_set: TargetFromDataSetFn<T>,
  ) -> Self {
    let filter =
      P10FilterTransform::new(Box::new(move |tag, _vr, _length, path| {
        path.is_root() && tags.contains(&tag)
      }));

    let highest_tag = tags.iter().max().copied().unwrap_or(DataElementTag::ZERO);

    Self {
      filter: Some((filter, DataSetBuilder::new())),
      highest_tag,
      target_from_data_set,
      target: None,
    }
  }

  /// Adds the next token in the DICOM P10 token stream.
  ///
  pub fn add_token(
    &mut self,
    token: &P10Token,
  ) -> Result<(), P10CustomTypeTransformError> {
    let Some((filter, data_set_builder)) = self.filter.as_mut() else {
      return Ok(());
    };

    let is_at_root = filter.is_at_root();

    if filter
      .add_token(token)
      .map_err(P10CustomTypeTransformError::P10Error)?
    {
      data_set_builder
        .add_token(token)
        .map_err(P10CustomTypeTransformError::P10Error)?;
    }

    // Once the stream has moved past the highest tag of interest all the
    // relevant data elements have been seen and the final type can be
    // constructed
    let is_complete = is_at_root
      && match token {
        P10Token::DataElementHeader { tag, .. }
        | P10Token::SequenceStart { tag, .. } => *tag > self.highest_tag,

        P10Token::DataElementValueBytes {
          tag,
          bytes_remaining: 0,
          ..
        }
        | P10Token::SequenceDelimiter { tag } => *tag == self.highest_tag,

        P10Token::End => true,

        _ => false,
      };

    if is_complete {
      data_set_builder.force_end();
      let data_set = data_set_builder.final_data_set().unwrap();

      let target = (self.target_from_data_set)(&data_set)
        .map_err(P10CustomTypeTransformError::DataError)?;

      self.target = Some(target);
      self.filter = None;
    }

    Ok(())
  }

  /// Returns the custom type created by this transform, once all its data
  /// elements have been gathered and it has been successfully constructed.
  ///
  pub fn get_output(&self) -> Option<&T> {
    self.target.as_ref()
  }

  /// Like [`Self::get_output`], but allows the constructed value to be taken
  /// or replaced.
  ///
  pub fn get_output_mut(&mut self) -> &mut Option<T> {
    &mut self.target
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  use dcmstream_core::{
    DataSetPath, ValueRepresentation, dictionary,
  };

  #[derive(Debug, PartialEq)]
  struct ImageSize {
    rows: u16,
    columns: u16,
  }

  impl ImageSize {
    fn from_data_set(data_set: &DataSet) -> Result<Self, DataError> {
      Ok(Self {
        rows: data_set.get_int(dictionary::ROWS.tag)?,
        columns: data_set.get_int(dictionary::COLUMNS.tag)?,
      })
    }
  }

  const IMAGE_SIZE_TAGS: [DataElementTag; 2] =
    [dictionary::ROWS.tag, dictionary::COLUMNS.tag];

  fn unsigned_short_tokens(tag: DataElementTag, value: u16) -> Vec<P10Token> {
    vec![
      P10Token::DataElementHeader {
        tag,
        vr: ValueRepresentation::UnsignedShort,
        length: 2,
        path: DataSetPath::new_with_data_element(tag),
      },
      P10Token::DataElementValueBytes {
        tag,
        vr: ValueRepresentation::UnsignedShort,
        data: value.to_le_bytes().to_vec().into(),
        bytes_remaining: 0,
      },
    ]
  }

  #[test]
  fn output_is_available_after_highest_tag_test() {
    let mut transform = P10CustomTypeTransform::<ImageSize>::new(
      &IMAGE_SIZE_TAGS,
      ImageSize::from_data_set,
    );

    for token in unsigned_short_tokens(dictionary::ROWS.tag, 4) {
      transform.add_token(&token).unwrap();
    }

    assert_eq!(transform.get_output(), None);

    for token in unsigned_short_tokens(dictionary::COLUMNS.tag, 6) {
      transform.add_token(&token).unwrap();
    }

    assert_eq!(
      transform.get_output(),
      Some(&ImageSize {
        rows: 4,
        columns: 6
      })
    );
  }

  #[test]
  fn construction_failure_errors_test() {
    let mut transform = P10CustomTypeTransform::<ImageSize>::new(
      &IMAGE_SIZE_TAGS,
      ImageSize::from_data_set,
    );

    // Ending the stream without the required data elements fails
    assert!(matches!(
      transform.add_token(&P10Token::End),
      Err(P10CustomTypeTransformError::DataError(_))
    ));
  }
}
