use dcmstream_core::{DataElementTag, DataSetPath, ValueRepresentation};

use crate::{P10Error, P10Token};

/// Transform that applies a data element filter to a stream of DICOM P10
/// tokens. Incoming data elements are passed to a predicate function that
/// decides whether they, and everything nested inside them, appear in the
/// output token stream.
///
pub struct P10FilterTransform {
  predicate: Box<PredicateFunction>,
  path: DataSetPath,
  path_filter_results: Vec<bool>,
}

/// The predicate function called by a [`P10FilterTransform`] to decide
/// whether a data element passes the filter. It receives the data element's
/// tag, VR, length (`None` for sequences), and the path to it.
///
pub type PredicateFunction = dyn FnMut(
  DataElementTag,
  ValueRepresentation,
  Option<u32>,
  &DataSetPath,
) -> bool;

impl P10FilterTransform {
  /// Creates a new filter transform. The predicate function is called for
  /// each data element as tokens are added, and only data elements for which
  /// it returns true pass through the filter. Data elements nested inside a
  /// filtered-out data element are dropped wholesale without consulting the
  /// predicate.
  ///
  pub fn new(predicate: Box<PredicateFunction>) -> Self {
    Self {
      predicate,
      path: DataSetPath::new(),
      path_filter_results: vec![],
    }
  }

  /// Returns whether the filter transform's current position is in the root
  /// data set, i.e. no data element or sequence is currently open.
  ///
  pub fn is_at_root(&self) -> bool {
    self.path.len() == 0
  }

  /// Adds the next token to the filter transform and returns whether the
  /// token should be included in the filtered token stream.
  ///
  pub fn add_token(&mut self, token: &P10Token) -> Result<bool, P10Error> {
    let current_filter_state =
      *self.path_filter_results.last().unwrap_or(&true);

    let map_data_set_path_error = |details: String| -> P10Error {
      P10Error::TokenStreamInvalid {
        when: "Filtering P10 token stream".to_string(),
        details,
        token: token.clone(),
      }
    };

    match token {
      // A new data element or sequence runs the predicate, unless an
      // ancestor has already been filtered out
      P10Token::SequenceStart { tag, vr, .. } => {
        self.run_predicate(*tag, *vr, None, map_data_set_path_error)
      }

      P10Token::DataElementHeader {
        tag, vr, length, ..
      } => self.run_predicate(*tag, *vr, Some(*length), map_data_set_path_error),

      P10Token::SequenceItemStart { index } => {
        self
          .path
          .add_sequence_item(*index)
          .map_err(map_data_set_path_error)?;

        Ok(current_filter_state)
      }

      P10Token::SequenceItemDelimiter => {
        self.path.pop().map_err(map_data_set_path_error)?;

        Ok(current_filter_state)
      }

      // A pixel data item extends the path but inherits its sequence's
      // filter state rather than running the predicate
      P10Token::PixelDataItem { index, .. } => {
        self
          .path
          .add_sequence_item(*index)
          .map_err(map_data_set_path_error)?;

        self.path_filter_results.push(current_filter_state);

        Ok(current_filter_state)
      }

      // The end of the data element or sequence at the head of the path
      P10Token::SequenceDelimiter { .. }
      | P10Token::DataElementValueBytes {
        bytes_remaining: 0, ..
      } => {
        self.path.pop().map_err(map_data_set_path_error)?;
        self.path_filter_results.pop();

        Ok(current_filter_state)
      }

      _ => Ok(current_filter_state),
    }
  }

  fn run_predicate(
    &mut self,
    tag: DataElementTag,
    vr: ValueRepresentation,
    length: Option<u32>,
    map_data_set_path_error: impl Fn(String) -> P10Error,
  ) -> Result<bool, P10Error> {
    let filter_result = match self.path_filter_results.as_slice() {
      [] | [.., true] => (self.predicate)(tag, vr, length, &self.path),

      // The predicate is skipped when an ancestor was filtered out
      _ => false,
    };

    self
      .path
      .add_data_element(tag)
      .map_err(map_data_set_path_error)?;

    self.path_filter_results.push(filter_result);

    Ok(filter_result)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  use dcmstream_core::dictionary;

  fn add_tokens(
    filter: &mut P10FilterTransform,
    tokens: &[P10Token],
  ) -> Vec<bool> {
    tokens
      .iter()
      .map(|token| filter.add_token(token).unwrap())
      .collect()
  }

  #[test]
  fn filters_data_elements_and_subtrees_test() {
    let mut filter =
      P10FilterTransform::new(Box::new(|tag, _vr, _length, _path| {
        tag != dictionary::ANATOMIC_REGION_SEQUENCE.tag
          && tag != dictionary::PATIENT_ID.tag
      }));

    let modality_tokens = [
      P10Token::DataElementHeader {
        tag: dictionary::MODALITY.tag,
        vr: ValueRepresentation::CodeString,
        length: 2,
        path: DataSetPath::new_with_data_element(dictionary::MODALITY.tag),
      },
      P10Token::DataElementValueBytes {
        tag: dictionary::MODALITY.tag,
        vr: ValueRepresentation::CodeString,
        data: b"US".to_vec().into(),
        bytes_remaining: 0,
      },
    ];

    assert_eq!(add_tokens(&mut filter, &modality_tokens), vec![true, true]);

    // A filtered-out sequence drops everything nested inside it, without
    // running the predicate on nested data elements
    let sequence_tokens = [
      P10Token::SequenceStart {
        tag: dictionary::ANATOMIC_REGION_SEQUENCE.tag,
        vr: ValueRepresentation::Sequence,
        path: DataSetPath::new_with_data_element(
          dictionary::ANATOMIC_REGION_SEQUENCE.tag,
        ),
      },
      P10Token::SequenceItemStart { index: 0 },
      P10Token::DataElementHeader {
        tag: dictionary::MODALITY.tag,
        vr: ValueRepresentation::CodeString,
        length: 2,
        path: DataSetPath::new(),
      },
      P10Token::DataElementValueBytes {
        tag: dictionary::MODALITY.tag,
        vr: ValueRepresentation::CodeString,
        data: b"US".to_vec().into(),
        bytes_remaining: 0,
      },
      P10Token::SequenceItemDelimiter,
      P10Token::SequenceDelimiter {
        tag: dictionary::ANATOMIC_REGION_SEQUENCE.tag,
      },
    ];

    assert_eq!(
      add_tokens(&mut filter, &sequence_tokens),
      vec![false; 6]
    );

    // The filter state resets once the filtered subtree has been passed
    assert_eq!(add_tokens(&mut filter, &modality_tokens), vec![true, true]);
  }
}
