use dcmstream_core::{DataElementTag, DataElementValue, DataSet, DataSetPath};

use crate::{P10Error, P10FilterTransform, P10Token, p10_token};

/// Transform that inserts data elements into the root data set of a stream
/// of DICOM P10 tokens. Inserted data elements are emitted in tag order
/// interleaved with the stream's own data elements, and data elements in the
/// stream with the same tag as an inserted data element are removed.
///
pub struct P10InsertTransform {
  data_elements_to_insert: Vec<(DataElementTag, DataElementValue)>,
  filter_transform: P10FilterTransform,
}

impl P10InsertTransform {
  /// Creates a new insert transform that will insert the data elements of
  /// the given data set into the root data set of a token stream.
  ///
  pub fn new(data_elements_to_insert: DataSet) -> Self {
    let tags_to_insert = data_elements_to_insert.tags();

    // Filter out the data elements that are going to be inserted so the
    // resulting token stream has no duplicates
    let filter_transform =
      P10FilterTransform::new(Box::new(move |tag, _vr, _length, path| {
        !path.is_root() || !tags_to_insert.contains(&tag)
      }));

    Self {
      data_elements_to_insert: data_elements_to_insert
        .into_iter()
        .rev()
        .collect(),
      filter_transform,
    }
  }

  /// Adds the next token to the insert transform and returns the resulting
  /// tokens.
  ///
  pub fn add_token(
    &mut self,
    token: &P10Token,
  ) -> Result<Vec<P10Token>, P10Error> {
    // Once all insertions have been made, tokens pass straight through
    if self.data_elements_to_insert.is_empty() {
      return Ok(vec![token.clone()]);
    }

    let is_at_root = self.filter_transform.is_at_root();

    if !self.filter_transform.add_token(token)? {
      return Ok(vec![]);
    }

    // Insertion only happens in the root data set; tokens inside sequences
    // and items pass through unchanged
    if !is_at_root {
      return Ok(vec![token.clone()]);
    }

    let mut output_tokens = vec![];

    match token {
      // At the start of the next root-level data element, insert any pending
      // data elements with a lower tag
      P10Token::SequenceStart { tag, path, .. }
      | P10Token::DataElementHeader { tag, path, .. } => {
        while let Some(data_element) = self.data_elements_to_insert.pop() {
          if data_element.0 >= *tag {
            self.data_elements_to_insert.push(data_element);
            break;
          }

          let mut insert_path = path.clone();
          insert_path
            .pop()
            .and_then(|_| insert_path.add_data_element(data_element.0))
            .map_err(|_| P10Error::TokenStreamInvalid {
              when: "Adding token to insert transform".to_string(),
              details: "Failed altering path for data element to insert"
                .to_string(),
              token: token.clone(),
            })?;

          append_data_element_tokens(
            data_element,
            &insert_path,
            &mut output_tokens,
          );
        }

        output_tokens.push(token.clone());
      }

      // Any data elements still pending at the end of the stream are
      // inserted before the end token
      P10Token::End => {
        while let Some(data_element) = self.data_elements_to_insert.pop() {
          let path = DataSetPath::new_with_data_element(data_element.0);

          append_data_element_tokens(
            data_element,
            &path,
            &mut output_tokens,
          );
        }

        output_tokens.push(P10Token::End);
      }

      _ => output_tokens.push(token.clone()),
    };

    Ok(output_tokens)
  }
}

fn append_data_element_tokens(
  data_element: (DataElementTag, DataElementValue),
  path: &DataSetPath,
  output_tokens: &mut Vec<P10Token>,
) {
  p10_token::data_element_to_tokens::<()>(
    data_element.0,
    &data_element.1,
    path,
    &mut |token: &P10Token| {
      output_tokens.push(token.clone());
      Ok(())
    },
  )
  .unwrap();
}

#[cfg(test)]
mod tests {
  use super::*;

  use dcmstream_core::ValueRepresentation;

  #[test]
  fn insert_interleaves_and_replaces_test() {
    let data_elements_to_insert: DataSet = [0u16, 1, 3, 4, 6, 7]
      .into_iter()
      .map(|group| {
        (
          DataElementTag::new(group, 0),
          DataElementValue::new_long_text(&format!("0{group}")).unwrap(),
        )
      })
      .collect();

    let mut insert_transform = P10InsertTransform::new(data_elements_to_insert);

    let input_tokens: Vec<P10Token> = [
      tokens_for_tag(DataElementTag::new(2, 0), b"12"),
      tokens_for_tag(DataElementTag::new(5, 0), b"15"),
      tokens_for_tag(DataElementTag::new(6, 0), b"16"),
      vec![P10Token::End],
    ]
    .into_iter()
    .flatten()
    .collect();

    let mut output_tokens = vec![];
    for token in input_tokens {
      output_tokens
        .extend_from_slice(&insert_transform.add_token(&token).unwrap());
    }

    assert_eq!(
      output_tokens,
      [
        tokens_for_tag(DataElementTag::new(0, 0), b"00"),
        tokens_for_tag(DataElementTag::new(1, 0), b"01"),
        tokens_for_tag(DataElementTag::new(2, 0), b"12"),
        tokens_for_tag(DataElementTag::new(3, 0), b"03"),
        tokens_for_tag(DataElementTag::new(4, 0), b"04"),
        tokens_for_tag(DataElementTag::new(5, 0), b"15"),
        tokens_for_tag(DataElementTag::new(6, 0), b"06"),
        tokens_for_tag(DataElementTag::new(7, 0), b"07"),
        vec![P10Token::End],
      ]
      .into_iter()
      .flatten()
      .collect::<Vec<P10Token>>()
    );
  }

  fn tokens_for_tag(tag: DataElementTag, value_bytes: &[u8]) -> Vec<P10Token> {
    vec![
      P10Token::DataElementHeader {
        tag,
        vr: ValueRepresentation::LongText,
        length: value_bytes.len() as u32,
        path: DataSetPath::new_with_data_element(tag),
      },
      P10Token::DataElementValueBytes {
        tag,
        vr: ValueRepresentation::LongText,
        data: value_bytes.to_vec().into(),
        bytes_remaining: 0,
      },
    ]
  }
}
