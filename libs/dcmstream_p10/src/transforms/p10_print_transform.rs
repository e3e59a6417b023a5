use dcmstream_core::{
  DataElementTag, DataElementValue, DataSet, DataSetPrintOptions,
  ValueRepresentation, data_set::print, dictionary,
};

use crate::P10Token;

/// Transform that converts a stream of DICOM P10 tokens into printable text
/// describing the structure and content of the DICOM data.
///
/// This is what prints data sets on the command line. The output can be
/// styled via [`DataSetPrintOptions`].
///
pub struct P10PrintTransform {
  print_options: DataSetPrintOptions,

  indent: usize,
  current_data_element: DataElementTag,
  ignore_data_element_value_bytes: bool,
  value_max_width: usize,

  // Private creator values are tracked per sequence item so that private
  // tags can be displayed with the correct names, as each item gets its own
  // private creator scope
  private_creators: Vec<DataSet>,
  pending_private_creator_tag: Option<DataElementTag>,
}

impl P10PrintTransform {
  /// Creates a new print transform with the given print options.
  ///
  pub fn new(print_options: &DataSetPrintOptions) -> Self {
    Self {
      print_options: print_options.clone(),
      indent: 0,
      current_data_element: DataElementTag::ZERO,
      ignore_data_element_value_bytes: false,
      value_max_width: 0,
      private_creators: vec![DataSet::new()],
      pending_private_creator_tag: None,
    }
  }

  /// Adds the next DICOM P10 token and returns the next piece of text output
  /// to display.
  ///
  pub fn add_token(&mut self, token: &P10Token) -> String {
    match token {
      P10Token::FileMetaInformation { data_set } => {
        let mut s = String::new();

        data_set.to_lines(&self.print_options, &mut |line| {
          s.push_str(&line);
          s.push('\n');
        });

        s
      }

      P10Token::DataElementHeader {
        tag, vr, length, ..
      } => {
        let (s, width) = print::format_data_element_prefix(
          *tag,
          self.private_creators.last().unwrap().tag_name(*tag),
          Some(*vr),
          Some(*length as usize),
          self.indent,
          &self.print_options,
        );

        self.current_data_element = *tag;

        // The width remaining for previewing the value
        self.value_max_width = core::cmp::max(
          self.print_options.max_width.saturating_sub(width),
          10,
        );

        // The next value bytes token prints a preview of the value
        self.ignore_data_element_value_bytes = false;

        // Private creator values are stored so that well-known private tag
        // names can be displayed
        if *vr == ValueRepresentation::LongString && tag.is_private_creator() {
          self.pending_private_creator_tag = Some(*tag);
        } else {
          self.pending_private_creator_tag = None;
        }

        s
      }

      P10Token::DataElementValueBytes { vr, data, .. }
        if !self.ignore_data_element_value_bytes =>
      {
        let value = DataElementValue::new_binary_unchecked(*vr, data.clone());

        // Only the first value bytes token is previewed
        self.ignore_data_element_value_bytes = true;

        if let Some(tag) = self.pending_private_creator_tag {
          self.private_creators.last_mut().unwrap().insert(
            tag,
            DataElementValue::new_binary_unchecked(
              ValueRepresentation::LongString,
              data.clone(),
            ),
          );
        }

        format!(
          "{}\n",
          value.to_string(self.current_data_element, self.value_max_width)
        )
      }

      P10Token::SequenceStart { tag, vr, .. } => {
        let mut s = print::format_data_element_prefix(
          *tag,
          self.private_creators.last().unwrap().tag_name(*tag),
          Some(*vr),
          None,
          self.indent,
          &self.print_options,
        )
        .0;

        s.push('\n');

        self.indent += 1;

        s
      }

      P10Token::SequenceDelimiter { .. } => {
        self.indent = self.indent.saturating_sub(1);

        let mut s = print::format_data_element_prefix(
          dictionary::SEQUENCE_DELIMITATION_ITEM.tag,
          dictionary::SEQUENCE_DELIMITATION_ITEM.name,
          None,
          None,
          self.indent,
          &self.print_options,
        )
        .0;

        s.push('\n');

        s
      }

      P10Token::SequenceItemStart { .. } => {
        let mut s = print::format_data_element_prefix(
          dictionary::ITEM.tag,
          dictionary::ITEM.name,
          None,
          None,
          self.indent,
          &self.print_options,
        )
        .0;

        s.push('\n');

        self.indent += 1;
        self.private_creators.push(DataSet::new());

        s
      }

      P10Token::SequenceItemDelimiter => {
        self.indent = self.indent.saturating_sub(1);
        if self.private_creators.len() > 1 {
          self.private_creators.pop();
        }

        let mut s = print::format_data_element_prefix(
          dictionary::ITEM_DELIMITATION_ITEM.tag,
          dictionary::ITEM_DELIMITATION_ITEM.name,
          None,
          None,
          self.indent,
          &self.print_options,
        )
        .0;

        s.push('\n');

        s
      }

      P10Token::PixelDataItem { length, .. } => {
        let (s, width) = print::format_data_element_prefix(
          dictionary::ITEM.tag,
          dictionary::ITEM.name,
          None,
          Some(*length as usize),
          self.indent,
          &self.print_options,
        );

        self.value_max_width = core::cmp::max(
          self.print_options.max_width.saturating_sub(width),
          10,
        );

        self.ignore_data_element_value_bytes = false;

        s
      }

      _ => String::new(),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  use dcmstream_core::DataSetPath;

  #[test]
  fn print_data_element_test() {
    let print_options = DataSetPrintOptions::new().styled(false).max_width(70);
    let mut transform = P10PrintTransform::new(&print_options);

    let tag = dictionary::MODALITY.tag;
    let vr = ValueRepresentation::CodeString;

    let header_output = transform.add_token(&P10Token::DataElementHeader {
      tag,
      vr,
      length: 2,
      path: DataSetPath::new_with_data_element(tag),
    });

    assert!(header_output.starts_with("(0008,0060) CS Modality"));

    let value_output = transform.add_token(&P10Token::DataElementValueBytes {
      tag,
      vr,
      data: b"US".to_vec().into(),
      bytes_remaining: 0,
    });

    assert_eq!(value_output, "\"US\"\n");

    // Subsequent value bytes tokens for the same data element print nothing
    let value_output = transform.add_token(&P10Token::DataElementValueBytes {
      tag,
      vr,
      data: b"XX".to_vec().into(),
      bytes_remaining: 0,
    });

    assert_eq!(value_output, "");
  }

  #[test]
  fn sequence_indentation_test() {
    let print_options = DataSetPrintOptions::new().styled(false).max_width(70);
    let mut transform = P10PrintTransform::new(&print_options);

    let tag = dictionary::ANATOMIC_REGION_SEQUENCE.tag;

    transform.add_token(&P10Token::SequenceStart {
      tag,
      vr: ValueRepresentation::Sequence,
      path: DataSetPath::new_with_data_element(tag),
    });

    let item_output =
      transform.add_token(&P10Token::SequenceItemStart { index: 0 });
    assert!(item_output.starts_with("  (FFFE,E000) Item"));

    let header_output = transform.add_token(&P10Token::DataElementHeader {
      tag: dictionary::MODALITY.tag,
      vr: ValueRepresentation::CodeString,
      length: 2,
      path: DataSetPath::new(),
    });
    assert!(header_output.starts_with("    (0008,0060) CS Modality"));
  }
}
