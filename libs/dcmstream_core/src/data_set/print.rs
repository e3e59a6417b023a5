//! Prints the content of data sets to lines of styled text.

use std::io::IsTerminal;

use crate::{DataElementTag, DataSet, ValueRepresentation, dictionary};

/// Configurable options used when printing a data set to stdout.
///
#[derive(Clone, Debug, PartialEq)]
pub struct DataSetPrintOptions {
  /// Whether to style output with color and bold text. Defaults to detecting
  /// whether the output stream supports color.
  pub styled: bool,

  /// The maximum output width for the printed data set. Lines that exceed
  /// this length are truncated with an ellipsis. Defaults to the width of
  /// the stdout terminal, or 80 when it can't be detected.
  pub max_width: usize,
}

#[cfg(not(target_arch = "wasm32"))]
fn terminal_width() -> Option<usize> {
  terminal_size::terminal_size()
    .map(|(terminal_size::Width(width), _)| width as usize)
}

#[cfg(target_arch = "wasm32")]
fn terminal_width() -> Option<usize> {
  None
}

impl DataSetPrintOptions {
  /// Constructs new data set print options, auto-detecting output settings
  /// where possible.
  ///
  pub fn new() -> Self {
    let is_terminal = std::io::stdout().is_terminal();
    let color_support =
      supports_color::on(supports_color::Stream::Stdout).is_some();

    Self {
      styled: is_terminal && color_support,
      max_width: terminal_width().unwrap_or(80),
    }
  }

  /// Sets the [`DataSetPrintOptions::styled`] value.
  ///
  pub fn styled(self, styled: bool) -> Self {
    Self { styled, ..self }
  }

  /// Sets the [`DataSetPrintOptions::max_width`] value.
  ///
  pub fn max_width(self, max_width: usize) -> Self {
    Self { max_width, ..self }
  }
}

impl Default for DataSetPrintOptions {
  fn default() -> Self {
    Self::new()
  }
}

/// Recursively converts a data set to printable lines using the specified
/// print options.
///
pub fn data_set_to_lines(
  data_set: &DataSet,
  print_options: &DataSetPrintOptions,
  callback: &mut impl FnMut(String),
  indent: usize,
) {
  for (tag, value) in data_set.iter() {
    let (header, header_width) = format_data_element_prefix(
      *tag,
      data_set.tag_name(*tag),
      Some(value.value_representation()),
      value.bytes().map(|bytes| bytes.len()).ok(),
      indent,
      print_options,
    );

    if let Ok(items) = value.sequence_items() {
      callback(header);

      for item in items.iter() {
        callback(
          format_data_element_prefix(
            dictionary::ITEM.tag,
            dictionary::ITEM.name,
            None,
            None,
            indent + 1,
            print_options,
          )
          .0,
        );

        data_set_to_lines(item, print_options, callback, indent + 2);

        callback(
          format_data_element_prefix(
            dictionary::ITEM_DELIMITATION_ITEM.tag,
            dictionary::ITEM_DELIMITATION_ITEM.name,
            None,
            None,
            indent + 1,
            print_options,
          )
          .0,
        );
      }

      callback(
        format_data_element_prefix(
          dictionary::SEQUENCE_DELIMITATION_ITEM.tag,
          dictionary::SEQUENCE_DELIMITATION_ITEM.name,
          None,
          None,
          indent,
          print_options,
        )
        .0,
      );
    } else if let Ok(items) = value.encapsulated_pixel_data() {
      callback(header);

      for item in items {
        callback(
          format_data_element_prefix(
            dictionary::ITEM.tag,
            dictionary::ITEM.name,
            None,
            Some(item.len()),
            indent + 1,
            print_options,
          )
          .0,
        );
      }

      callback(
        format_data_element_prefix(
          dictionary::SEQUENCE_DELIMITATION_ITEM.tag,
          dictionary::SEQUENCE_DELIMITATION_ITEM.name,
          None,
          None,
          indent,
          print_options,
        )
        .0,
      );
    } else {
      let value_max_width = core::cmp::max(
        print_options.max_width.saturating_sub(header_width),
        10,
      );

      callback(format!("{header}{}", value.to_string(*tag, value_max_width)));
    }
  }
}

/// Formats the details of a data element for display, excluding its value.
/// Returns the string to display along with its printable width.
///
pub fn format_data_element_prefix(
  tag: DataElementTag,
  tag_name: &str,
  vr: Option<ValueRepresentation>,
  length: Option<usize>,
  indent: usize,
  print_options: &DataSetPrintOptions,
) -> (String, usize) {
  let tag_text = if print_options.styled {
    text_blue(&tag.to_string())
  } else {
    tag.to_string()
  };

  let tag_name_len = tag_name.len();

  let tag_name = if print_options.styled {
    text_reset_to_bold(tag_name)
  } else {
    tag_name.to_string()
  };

  let output = match vr {
    Some(vr) => {
      let vr_text = if print_options.styled {
        text_green(&vr.to_string())
      } else {
        vr.to_string()
      };

      format!("{tag_text} {vr_text} {tag_name}")
    }
    None => format!("{tag_text} {tag_name}"),
  };

  let tag_and_vr_width = if vr.is_some() { 15 } else { 12 };

  let has_length = length.is_some();

  let length = match length {
    Some(length) => {
      let mut s = format!("[{length:6} bytes]");
      if vr.is_some() {
        s.push(' ');
      }
      s
    }
    None => "".to_string(),
  };

  let length_width = length.len();

  let length = if print_options.styled {
    text_cyan_and_reset(&length)
  } else {
    length
  };

  let padding = if has_length {
    core::cmp::max(50i64 - (tag_and_vr_width + tag_name_len) as i64, 0)
      as usize
      + 2
  } else {
    0
  };

  let empty = "";
  let s = format!(
    "{empty:indent$}{output}{empty:<padding$}{length}",
    indent = indent * 2,
    padding = padding
  );

  let width =
    indent * 2 + tag_and_vr_width + tag_name_len + padding + length_width;

  (s, width)
}

// Simple helpers for coloring and styling terminal text. These are used
// instead of a 3rd party crate because the requirements are very simple and
// the functions below avoid unnecessary reset sequences.

fn text_blue(s: &str) -> String {
  format!("\u{001b}[34m{s}")
}

fn text_cyan_and_reset(s: &str) -> String {
  format!("\u{001b}[36m{s}\u{001b}[0m")
}

fn text_reset_to_bold(s: &str) -> String {
  format!("\u{001b}[0m\u{001b}[1m{s}")
}

fn text_green(s: &str) -> String {
  format!("\u{001b}[32m{s}")
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn format_data_element_prefix_test() {
    let print_options =
      DataSetPrintOptions::new().styled(false).max_width(80);

    let (s, _) = format_data_element_prefix(
      dictionary::PATIENT_NAME.tag,
      dictionary::PATIENT_NAME.name,
      Some(ValueRepresentation::PersonName),
      Some(12),
      0,
      &print_options,
    );

    assert_eq!(
      s,
      "(0010,0010) PN Patient's Name                       [    12 bytes] "
    );
  }
}
