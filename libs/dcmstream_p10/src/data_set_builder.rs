//! Materializes a stream of DICOM P10 tokens into an in-memory data set.
//!
//! The token stream most commonly comes from reading raw DICOM P10 bytes
//! with the [`crate::p10_read`] module.

use dcmstream_core::{
  DataElementTag, DataElementValue, DataSet, RcByteSlice,
  ValueRepresentation, dictionary,
};

use crate::{P10Error, P10Token};

/// A data set builder is fed a stream of DICOM P10 tokens and materializes
/// them into an in-memory data set.
///
#[derive(Debug, PartialEq)]
pub struct DataSetBuilder {
  file_preamble: Option<Box<[u8; 128]>>,
  file_meta_information: Option<DataSet>,
  location: Vec<BuilderLocation>,
  pending_data_element: Option<PendingDataElement>,
  is_complete: bool,
}

/// Tracks where in the data set tree the builder currently is: the sequences
/// and items in the process of being built.
///
#[derive(Debug, PartialEq)]
enum BuilderLocation {
  RootDataSet {
    data_set: DataSet,
  },
  Sequence {
    tag: DataElementTag,
    items: Vec<DataSet>,
  },
  SequenceItem {
    data_set: DataSet,
  },
  EncapsulatedPixelDataSequence {
    vr: ValueRepresentation,
    items: Vec<RcByteSlice>,
  },
}

/// A data element whose header token has been received but whose final value
/// bytes token hasn't arrived yet.
///
#[derive(Debug, PartialEq)]
struct PendingDataElement {
  tag: DataElementTag,
  vr: ValueRepresentation,
  data: Vec<RcByteSlice>,
}

impl DataSetBuilder {
  /// Creates a new data set builder.
  ///
  pub fn new() -> Self {
    Self {
      file_preamble: None,
      file_meta_information: None,
      location: vec![BuilderLocation::RootDataSet {
        data_set: DataSet::new(),
      }],
      pending_data_element: None,
      is_complete: false,
    }
  }

  /// Returns whether the builder has received the final [`P10Token::End`]
  /// token and its data set is complete.
  ///
  pub fn is_complete(&self) -> bool {
    self.is_complete
  }

  /// Returns the 128-byte File Preamble received by the builder, or an error
  /// when none has been received. The content of these bytes is
  /// application-defined and is commonly all zeroes.
  ///
  #[allow(clippy::result_unit_err)]
  pub fn file_preamble(&self) -> Result<&[u8; 128], ()> {
    self.file_preamble.as_deref().ok_or(())
  }

  /// Returns the final data set constructed by the builder, or an error when
  /// the token stream hasn't been fully read. The File Meta Information data
  /// elements are merged into the returned data set.
  ///
  #[allow(clippy::result_unit_err)]
  pub fn final_data_set(&mut self) -> Result<DataSet, ()> {
    let mut data_set = match (self.is_complete, self.location.as_mut_slice()) {
      (true, [BuilderLocation::RootDataSet { data_set }]) => {
        core::mem::take(data_set)
      }
      _ => return Err(()),
    };

    if let Some(file_meta_information) = self.file_meta_information.take() {
      data_set.merge(file_meta_information);
    }

    Ok(data_set)
  }

  /// Adds the delimiter and end tokens needed for an incomplete builder to
  /// be complete, so that its data set can be read out. This allows a
  /// partially built data set to be retrieved when the source of the P10
  /// tokens errored partway through.
  ///
  pub fn force_end(&mut self) {
    if self.is_complete {
      return;
    }

    self.pending_data_element = None;

    while let Some(location) = self.location.last() {
      match location {
        BuilderLocation::Sequence { tag, .. } => {
          let tag = *tag;
          self.add_token(&P10Token::SequenceDelimiter { tag }).unwrap();
        }

        BuilderLocation::EncapsulatedPixelDataSequence { .. } => {
          self
            .add_token(&P10Token::SequenceDelimiter {
              tag: dictionary::PIXEL_DATA.tag,
            })
            .unwrap();
        }

        BuilderLocation::SequenceItem { .. } => {
          self.add_token(&P10Token::SequenceItemDelimiter).unwrap();
        }

        BuilderLocation::RootDataSet { .. } => {
          self.add_token(&P10Token::End).unwrap();
          return;
        }
      };
    }
  }

  /// Adds the next DICOM P10 token to the builder, progressively
  /// constructing the data set and checking that the tokens received are in
  /// a valid order.
  ///
  pub fn add_token(&mut self, token: &P10Token) -> Result<(), P10Error> {
    if self.is_complete {
      return Err(P10Error::TokenStreamInvalid {
        when: "Building data set".to_string(),
        details: "Token received after the token stream has ended".to_string(),
        token: token.clone(),
      });
    }

    // A pending data element must be completed by value bytes tokens before
    // anything else can arrive
    if self.pending_data_element.is_some() {
      return self.add_token_to_pending_data_element(token);
    }

    match (token, self.location.last()) {
      (P10Token::FilePreambleAndDICMPrefix { preamble }, _) => {
        self.file_preamble = Some(preamble.clone());
        Ok(())
      }

      (P10Token::FileMetaInformation { data_set }, _) => {
        self.file_meta_information = Some(data_set.clone());
        Ok(())
      }

      (token, Some(BuilderLocation::Sequence { .. })) => {
        self.add_token_to_sequence(token)
      }

      (token, Some(BuilderLocation::EncapsulatedPixelDataSequence { .. })) => {
        self.add_token_to_encapsulated_pixel_data_sequence(token)
      }

      (token, _) => self.add_token_to_data_set(token),
    }
  }

  /// Ingests the next token when the current location is a sequence. Only a
  /// new item or the end of the sequence is valid.
  ///
  fn add_token_to_sequence(&mut self, token: &P10Token) -> Result<(), P10Error> {
    match token {
      P10Token::SequenceItemStart { .. } => {
        self.location.push(BuilderLocation::SequenceItem {
          data_set: DataSet::new(),
        });

        Ok(())
      }

      P10Token::SequenceDelimiter { .. } => {
        if let Some(BuilderLocation::Sequence { tag, items }) =
          self.location.pop()
        {
          let sequence = DataElementValue::new_sequence(items);
          self.insert_data_element_at_current_location(tag, sequence);
        }

        Ok(())
      }

      token => self.unexpected_token_error(token),
    }
  }

  /// Ingests the next token when the current location is an encapsulated
  /// pixel data sequence. Only a new pixel data item or the end of the
  /// sequence is valid.
  ///
  fn add_token_to_encapsulated_pixel_data_sequence(
    &mut self,
    token: &P10Token,
  ) -> Result<(), P10Error> {
    match token {
      P10Token::PixelDataItem { .. } => {
        self.pending_data_element = Some(PendingDataElement {
          tag: dictionary::ITEM.tag,
          vr: ValueRepresentation::OtherByteString,
          data: vec![],
        });

        Ok(())
      }

      P10Token::SequenceDelimiter { .. } => {
        if let Some(BuilderLocation::EncapsulatedPixelDataSequence {
          vr,
          items,
        }) = self.location.pop()
        {
          self.insert_data_element_at_current_location(
            dictionary::PIXEL_DATA.tag,
            DataElementValue::new_encapsulated_pixel_data_unchecked(vr, items),
          );
        }

        Ok(())
      }

      token => self.unexpected_token_error(token),
    }
  }

  /// Ingests the next token when the current location is the root data set
  /// or a sequence item.
  ///
  fn add_token_to_data_set(&mut self, token: &P10Token) -> Result<(), P10Error> {
    match token {
      // A data element header opens a new pending data element that will be
      // filled in by subsequent value bytes tokens
      P10Token::DataElementHeader { tag, vr, .. } => {
        self.pending_data_element = Some(PendingDataElement {
          tag: *tag,
          vr: *vr,
          data: vec![],
        });

        Ok(())
      }

      P10Token::SequenceStart { tag, vr, .. } => {
        let new_location = match vr {
          ValueRepresentation::OtherByteString
          | ValueRepresentation::OtherWordString => {
            BuilderLocation::EncapsulatedPixelDataSequence {
              vr: *vr,
              items: vec![],
            }
          }

          _ => BuilderLocation::Sequence {
            tag: *tag,
            items: vec![],
          },
        };

        self.location.push(new_location);

        Ok(())
      }

      // An item delimiter closes the current item and appends its data set
      // to the enclosing sequence
      P10Token::SequenceItemDelimiter => match self.location.as_slice() {
        [
          ..,
          BuilderLocation::Sequence { .. },
          BuilderLocation::SequenceItem { .. },
        ] => {
          if let Some(BuilderLocation::SequenceItem { data_set }) =
            self.location.pop()
            && let Some(BuilderLocation::Sequence { items, .. }) =
              self.location.last_mut()
          {
            items.push(data_set);
          }

          Ok(())
        }

        _ => Err(P10Error::TokenStreamInvalid {
          when: "Building data set".to_string(),
          details: "Received sequence item delimiter token outside of an item"
            .to_string(),
          token: token.clone(),
        }),
      },

      // The end token completes the builder, valid only in the root data set
      P10Token::End => match self.location.as_slice() {
        [BuilderLocation::RootDataSet { .. }] => {
          self.is_complete = true;

          Ok(())
        }

        _ => Err(P10Error::TokenStreamInvalid {
          when: "Building data set".to_string(),
          details: "Received end token outside of the root data set"
            .to_string(),
          token: token.clone(),
        }),
      },

      token => self.unexpected_token_error(token),
    }
  }

  /// Ingests the next token when there is a pending data element expecting
  /// value bytes tokens.
  ///
  fn add_token_to_pending_data_element(
    &mut self,
    token: &P10Token,
  ) -> Result<(), P10Error> {
    match (token, self.pending_data_element.as_mut()) {
      (
        P10Token::DataElementValueBytes {
          data,
          bytes_remaining,
          ..
        },
        Some(pending_data_element),
      ) => {
        pending_data_element.data.push(data.clone());

        if *bytes_remaining == 0 {
          let tag = pending_data_element.tag;
          let value = build_final_data_element_value(
            tag,
            pending_data_element.vr,
            core::mem::take(&mut pending_data_element.data),
          );

          self.pending_data_element = None;

          self.insert_data_element_at_current_location(tag, value);
        }

        Ok(())
      }

      (token, _) => self.unexpected_token_error(token),
    }
  }

  /// Inserts a completed data element at the builder's current location.
  ///
  fn insert_data_element_at_current_location(
    &mut self,
    tag: DataElementTag,
    value: DataElementValue,
  ) {
    match (self.location.as_mut_slice(), value.bytes()) {
      ([BuilderLocation::RootDataSet { data_set }], _)
      | ([.., BuilderLocation::SequenceItem { data_set }], _) => {
        data_set.insert(tag, value);
      }

      (
        [.., BuilderLocation::EncapsulatedPixelDataSequence { items, .. }],
        Ok(bytes),
      ) => items.push(bytes.clone()),

      // Other locations can't receive a completed data element. This isn't
      // logically reachable via `add_token`.
      _ => unreachable!(),
    };
  }

  fn unexpected_token_error(&self, token: &P10Token) -> Result<(), P10Error> {
    Err(P10Error::TokenStreamInvalid {
      when: "Building data set".to_string(),
      details: format!(
        "Received unexpected P10 token at location: {}",
        location_to_string(&self.location),
      ),
      token: token.clone(),
    })
  }
}

impl Default for DataSetBuilder {
  fn default() -> Self {
    Self::new()
  }
}

/// Concatenates the received value bytes for a data element and builds the
/// `DataElementValue` to insert into the data set.
///
fn build_final_data_element_value(
  tag: DataElementTag,
  vr: ValueRepresentation,
  value_bytes: Vec<RcByteSlice>,
) -> DataElementValue {
  let bytes: RcByteSlice = match value_bytes.as_slice() {
    // A single chunk is passed through without copying
    [bytes] => bytes.clone(),

    chunks => {
      let total_length = chunks.iter().fold(0, |acc, c| acc + c.len());

      let mut bytes = Vec::with_capacity(total_length);
      for chunk in chunks {
        bytes.extend_from_slice(chunk);
      }

      bytes.into()
    }
  };

  // Lookup table descriptors have a non-standard relationship between their
  // VR and their bytes, and store their raw bytes unaltered
  if dictionary::is_lut_descriptor_tag(tag) {
    DataElementValue::new_lookup_table_descriptor_unchecked(vr, bytes)
  } else {
    DataElementValue::new_binary_unchecked(vr, bytes)
  }
}

/// Converts a builder location to a human-readable string for error
/// reporting.
///
fn location_to_string(location: &[BuilderLocation]) -> String {
  location
    .iter()
    .map(|entry| match entry {
      BuilderLocation::RootDataSet { .. } => "RootDataSet".to_string(),
      BuilderLocation::Sequence { tag, .. } => format!("Sequence{tag}"),
      BuilderLocation::SequenceItem { .. } => "SequenceItem".to_string(),
      BuilderLocation::EncapsulatedPixelDataSequence { .. } => {
        "EncapsulatedPixelDataSequence".to_string()
      }
    })
    .collect::<Vec<_>>()
    .join(".")
}

#[cfg(test)]
mod tests {
  use super::*;

  use dcmstream_core::DataSetPath;

  fn value_bytes_token(
    tag: DataElementTag,
    vr: ValueRepresentation,
    data: &[u8],
    bytes_remaining: u32,
  ) -> P10Token {
    P10Token::DataElementValueBytes {
      tag,
      vr,
      data: data.to_vec().into(),
      bytes_remaining,
    }
  }

  #[test]
  fn build_simple_data_set_test() {
    let mut builder = DataSetBuilder::new();

    let tag = dictionary::PATIENT_ID.tag;
    let vr = ValueRepresentation::LongString;

    builder
      .add_token(&P10Token::DataElementHeader {
        tag,
        vr,
        length: 4,
        path: DataSetPath::new_with_data_element(tag),
      })
      .unwrap();

    // Value bytes split across two tokens
    builder.add_token(&value_bytes_token(tag, vr, b"12", 2)).unwrap();
    builder.add_token(&value_bytes_token(tag, vr, b"34", 0)).unwrap();

    assert!(builder.final_data_set().is_err());

    builder.add_token(&P10Token::End).unwrap();

    let data_set = builder.final_data_set().unwrap();
    assert_eq!(data_set.get_string(tag), Ok("1234"));

    // No further tokens are accepted
    assert!(builder.add_token(&P10Token::End).is_err());
  }

  #[test]
  fn build_sequence_test() {
    let mut builder = DataSetBuilder::new();

    let sequence_tag = dictionary::ANATOMIC_REGION_SEQUENCE.tag;
    let tag = dictionary::MODALITY.tag;
    let vr = ValueRepresentation::CodeString;

    builder
      .add_token(&P10Token::SequenceStart {
        tag: sequence_tag,
        vr: ValueRepresentation::Sequence,
        path: DataSetPath::new_with_data_element(sequence_tag),
      })
      .unwrap();
    builder
      .add_token(&P10Token::SequenceItemStart { index: 0 })
      .unwrap();
    builder
      .add_token(&P10Token::DataElementHeader {
        tag,
        vr,
        length: 2,
        path: DataSetPath::new(),
      })
      .unwrap();
    builder.add_token(&value_bytes_token(tag, vr, b"US", 0)).unwrap();
    builder.add_token(&P10Token::SequenceItemDelimiter).unwrap();
    builder
      .add_token(&P10Token::SequenceDelimiter { tag: sequence_tag })
      .unwrap();
    builder.add_token(&P10Token::End).unwrap();

    let data_set = builder.final_data_set().unwrap();
    let items = data_set
      .get_value(sequence_tag)
      .unwrap()
      .sequence_items()
      .unwrap();

    assert_eq!(items.len(), 1);
    assert_eq!(items[0].get_string(tag), Ok("US"));
  }

  #[test]
  fn build_encapsulated_pixel_data_test() {
    let mut builder = DataSetBuilder::new();

    let tag = dictionary::PIXEL_DATA.tag;
    let vr = ValueRepresentation::OtherByteString;

    builder
      .add_token(&P10Token::SequenceStart {
        tag,
        vr,
        path: DataSetPath::new_with_data_element(tag),
      })
      .unwrap();

    builder
      .add_token(&P10Token::PixelDataItem {
        index: 0,
        length: 0,
      })
      .unwrap();
    builder
      .add_token(&value_bytes_token(dictionary::ITEM.tag, vr, b"", 0))
      .unwrap();

    builder
      .add_token(&P10Token::PixelDataItem {
        index: 1,
        length: 2,
      })
      .unwrap();
    builder
      .add_token(&value_bytes_token(dictionary::ITEM.tag, vr, &[1, 2], 0))
      .unwrap();

    builder.add_token(&P10Token::SequenceDelimiter { tag }).unwrap();
    builder.add_token(&P10Token::End).unwrap();

    let data_set = builder.final_data_set().unwrap();
    let items = data_set
      .get_value(tag)
      .unwrap()
      .encapsulated_pixel_data()
      .unwrap();

    assert_eq!(items.len(), 2);
    assert_eq!(&*items[1], &[1u8, 2u8]);
  }

  #[test]
  fn value_bytes_before_header_is_rejected_test() {
    let mut builder = DataSetBuilder::new();

    assert!(matches!(
      builder.add_token(&value_bytes_token(
        dictionary::PATIENT_ID.tag,
        ValueRepresentation::LongString,
        b"12",
        0
      )),
      Err(P10Error::TokenStreamInvalid { .. })
    ));
  }

  #[test]
  fn force_end_salvages_partial_data_set_test() {
    let mut builder = DataSetBuilder::new();

    let sequence_tag = dictionary::ANATOMIC_REGION_SEQUENCE.tag;

    builder
      .add_token(&P10Token::SequenceStart {
        tag: sequence_tag,
        vr: ValueRepresentation::Sequence,
        path: DataSetPath::new_with_data_element(sequence_tag),
      })
      .unwrap();
    builder
      .add_token(&P10Token::SequenceItemStart { index: 0 })
      .unwrap();

    assert!(builder.final_data_set().is_err());

    builder.force_end();

    let data_set = builder.final_data_set().unwrap();
    let items = data_set
      .get_value(sequence_tag)
      .unwrap()
      .sequence_items()
      .unwrap();

    assert_eq!(items.len(), 1);
    assert!(items[0].is_empty());
  }

  #[test]
  fn duplicate_tags_keep_last_occurrence_test() {
    let mut builder = DataSetBuilder::new();

    let tag = dictionary::PATIENT_ID.tag;
    let vr = ValueRepresentation::LongString;

    for value in [b"11", b"22"] {
      builder
        .add_token(&P10Token::DataElementHeader {
          tag,
          vr,
          length: 2,
          path: DataSetPath::new_with_data_element(tag),
        })
        .unwrap();
      builder.add_token(&value_bytes_token(tag, vr, value, 0)).unwrap();
    }

    builder.add_token(&P10Token::End).unwrap();

    assert_eq!(builder.final_data_set().unwrap().get_string(tag), Ok("22"));
  }
}
