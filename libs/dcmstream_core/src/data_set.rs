//! A DICOM data set, defined as an ordered map of data element tags to data
//! element values.

pub mod print;

use std::collections::BTreeMap;

use crate::data_set_path::DataSetPathEntry;
use crate::{
  DataElementTag, DataElementValue, DataError, DataSetPath,
  DataSetPrintOptions, RcByteSlice, TransferSyntax, ValueRepresentation,
  dictionary,
};

/// A DICOM data set: a mapping of data element tags to data element values
/// that iterates in ascending tag order.
///
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DataSet(BTreeMap<DataElementTag, DataElementValue>);

/// The result of looking up a [`DataSetPath`] in a data set: either a data
/// element value, or a sequence item (i.e. a nested data set).
///
enum LookupResult<'a> {
  DataElementValue(&'a DataElementValue),
  DataSet(&'a DataSet),
}

impl DataSet {
  /// Returns a new empty data set.
  ///
  pub fn new() -> Self {
    Self(BTreeMap::new())
  }

  /// Returns the number of data elements in a data set.
  ///
  pub fn size(&self) -> usize {
    self.0.len()
  }

  /// Returns whether a data set contains no data elements.
  ///
  pub fn is_empty(&self) -> bool {
    self.0.is_empty()
  }

  /// Returns whether a data element with the specified tag exists in a data
  /// set.
  ///
  pub fn has(&self, tag: DataElementTag) -> bool {
    self.0.contains_key(&tag)
  }

  /// Inserts a data element tag and value into a data set, replacing any
  /// existing value for the tag.
  ///
  pub fn insert(&mut self, tag: DataElementTag, value: DataElementValue) {
    self.0.insert(tag, value);
  }

  /// Inserts a new binary value into a data set.
  ///
  pub fn insert_binary_value(
    &mut self,
    tag: DataElementTag,
    vr: ValueRepresentation,
    bytes: RcByteSlice,
  ) -> Result<(), DataError> {
    self.insert(tag, DataElementValue::new_binary(vr, bytes)?);

    Ok(())
  }

  /// Inserts a data element with a string value into a data set. The data
  /// element is referenced through its dictionary entry, which determines the
  /// VR to use.
  ///
  pub fn insert_string_value(
    &mut self,
    item: &dictionary::Item,
    values: &[&str],
  ) -> Result<(), DataError> {
    if !item.multiplicity.contains(values.len()) {
      return Err(DataError::new_multiplicity_mismatch()
        .with_path(&DataSetPath::new_with_data_element(item.tag)));
    }

    let value = match (item.vrs, values) {
      ([ValueRepresentation::CodeString], _) => {
        DataElementValue::new_code_string(values)
      }
      ([ValueRepresentation::LongString], _) => {
        DataElementValue::new_long_string(values)
      }
      ([ValueRepresentation::LongText], [value]) => {
        DataElementValue::new_long_text(value)
      }
      ([ValueRepresentation::PersonName], _) => {
        DataElementValue::new_person_name(values)
      }
      ([ValueRepresentation::ShortString], _) => {
        DataElementValue::new_short_string(values)
      }
      ([ValueRepresentation::UniqueIdentifier], _) => {
        DataElementValue::new_unique_identifier(values)
      }

      _ => Err(DataError::new_value_invalid(format!(
        "Data element '{}' does not support the provided string data",
        item.name
      ))),
    }?;

    self.0.insert(item.tag, value);

    Ok(())
  }

  /// Inserts a data element with integer values into a data set. The data
  /// element is referenced through its dictionary entry, which determines the
  /// VR to use.
  ///
  pub fn insert_int_value(
    &mut self,
    item: &dictionary::Item,
    values: &[i64],
  ) -> Result<(), DataError> {
    fn convert<U: TryFrom<i64>>(
      values: &[i64],
      vr: ValueRepresentation,
    ) -> Result<Vec<U>, DataError> {
      values
        .iter()
        .map(|i| {
          U::try_from(*i).map_err(|_| {
            DataError::new_value_invalid(format!(
              "Value {i} is out of range for the {vr} VR"
            ))
          })
        })
        .collect()
    }

    if !item.multiplicity.contains(values.len()) {
      return Err(DataError::new_multiplicity_mismatch()
        .with_path(&DataSetPath::new_with_data_element(item.tag)));
    }

    let value = match item.vrs {
      [ValueRepresentation::IntegerString] => {
        DataElementValue::new_integer_string(&convert::<i32>(
          values,
          ValueRepresentation::IntegerString,
        )?)
      }
      [ValueRepresentation::SignedShort, ..] => DataElementValue::new_signed_short(
        &convert::<i16>(values, ValueRepresentation::SignedShort)?,
      ),
      [ValueRepresentation::UnsignedLong] => DataElementValue::new_unsigned_long(
        &convert::<u32>(values, ValueRepresentation::UnsignedLong)?,
      ),
      [ValueRepresentation::UnsignedShort, ..] => {
        DataElementValue::new_unsigned_short(&convert::<u16>(
          values,
          ValueRepresentation::UnsignedShort,
        )?)
      }

      _ => Err(DataError::new_value_invalid(format!(
        "Data element '{}' does not support the provided integer data",
        item.name
      ))),
    }?;

    self.0.insert(item.tag, value);

    Ok(())
  }

  /// Merges two data sets together. Data elements from the second data set
  /// take precedence.
  ///
  pub fn merge(&mut self, other: Self) {
    self.0.extend(other.0);
  }

  /// Deletes a data element from a data set, if present.
  ///
  pub fn delete(&mut self, tag: DataElementTag) {
    self.0.remove(&tag);
  }

  /// Retains only the data elements for which the predicate returns true.
  ///
  pub fn retain(
    &mut self,
    f: impl FnMut(&DataElementTag, &mut DataElementValue) -> bool,
  ) {
    self.0.retain(f);
  }

  /// Returns the tags in a data set, in ascending order.
  ///
  pub fn tags(&self) -> Vec<DataElementTag> {
    self.0.keys().copied().collect()
  }

  /// Returns an iterator over a data set's elements, in ascending tag order.
  ///
  pub fn iter(
    &self,
  ) -> std::collections::btree_map::Iter<'_, DataElementTag, DataElementValue>
  {
    self.0.iter()
  }

  /// Returns a new data set containing this data set's File Meta Information
  /// data elements, i.e. those whose group equals 2. The *'(0002,0002) Media
  /// Storage SOP Class UID'* and *'(0002,0003) Media Storage SOP Instance
  /// UID'* data elements are set to match the *'(0008,0016) SOP Class UID'*
  /// and *'(0008,0018) SOP Instance UID'* data elements when present.
  ///
  pub fn file_meta_information(&self) -> DataSet {
    let mut fmi: DataSet = self
      .0
      .range(
        DataElementTag::new(2, 0x0000)..=DataElementTag::new(2, 0xFFFF),
      )
      .map(|(tag, value)| (*tag, value.clone()))
      .collect();

    // Sequences and encapsulated pixel data aren't allowed in File Meta
    // Information
    fmi.0.retain(|_tag, value| value.bytes().is_ok());

    for (source, target) in [
      (
        dictionary::SOP_CLASS_UID.tag,
        dictionary::MEDIA_STORAGE_SOP_CLASS_UID.tag,
      ),
      (
        dictionary::SOP_INSTANCE_UID.tag,
        dictionary::MEDIA_STORAGE_SOP_INSTANCE_UID.tag,
      ),
    ] {
      match self.get_value(source) {
        Ok(value) => fmi.insert(target, value.clone()),
        Err(_) => fmi.delete(target),
      }
    }

    fmi
  }

  /// Looks up a data set path in a data set and returns the data element or
  /// nested data set it points at.
  ///
  fn lookup(&self, path: &DataSetPath) -> Result<LookupResult<'_>, DataError> {
    let mut result = LookupResult::DataSet(self);

    for entry in path.entries().iter() {
      let next = match (result, entry) {
        (
          LookupResult::DataSet(data_set),
          DataSetPathEntry::DataElement { tag },
        ) => data_set.0.get(tag).map(LookupResult::DataElementValue),

        (
          LookupResult::DataElementValue(value),
          DataSetPathEntry::SequenceItem { index },
        ) => value
          .sequence_items()
          .ok()
          .and_then(|items| items.get(*index))
          .map(LookupResult::DataSet),

        _ => None,
      };

      match next {
        Some(next) => result = next,
        None => {
          return Err(DataError::new_tag_not_present().with_path(path));
        }
      }
    }

    Ok(result)
  }

  /// Returns the data element value for the specified tag in a data set.
  ///
  pub fn get_value(
    &self,
    tag: DataElementTag,
  ) -> Result<&DataElementValue, DataError> {
    self.0.get(&tag).ok_or_else(|| {
      DataError::new_tag_not_present()
        .with_path(&DataSetPath::new_with_data_element(tag))
    })
  }

  /// Returns the data element value at the specified path in a data set. The
  /// path must end with a data element tag.
  ///
  pub fn get_value_at_path(
    &self,
    path: &DataSetPath,
  ) -> Result<&DataElementValue, DataError> {
    match self.lookup(path) {
      Ok(LookupResult::DataElementValue(value)) => Ok(value),
      _ => Err(DataError::new_tag_not_present().with_path(path)),
    }
  }

  /// Returns the nested data set at the specified path in a data set. The
  /// path must be empty or end with a sequence item index.
  ///
  pub fn get_data_set_at_path(
    &self,
    path: &DataSetPath,
  ) -> Result<&DataSet, DataError> {
    match self.lookup(path) {
      Ok(LookupResult::DataSet(data_set)) => Ok(data_set),
      _ => Err(DataError::new_tag_not_present().with_path(path)),
    }
  }

  /// Returns the singular string value for a data element in a data set.
  ///
  pub fn get_string(&self, tag: DataElementTag) -> Result<&str, DataError> {
    self
      .get_value(tag)?
      .get_string()
      .map_err(|e| e.with_path(&DataSetPath::new_with_data_element(tag)))
  }

  /// Returns all of the string values for a data element in a data set.
  ///
  pub fn get_strings(
    &self,
    tag: DataElementTag,
  ) -> Result<Vec<&str>, DataError> {
    self
      .get_value(tag)?
      .get_strings()
      .map_err(|e| e.with_path(&DataSetPath::new_with_data_element(tag)))
  }

  /// Returns the singular integer value for a data element in a data set,
  /// converted to the requested integer type.
  ///
  pub fn get_int<T: num_traits::NumCast>(
    &self,
    tag: DataElementTag,
  ) -> Result<T, DataError> {
    self
      .get_value(tag)?
      .get_int()
      .map_err(|e| e.with_path(&DataSetPath::new_with_data_element(tag)))
  }

  /// Returns the singular integer value for a data element in a data set, or
  /// the given default when the data element isn't present.
  ///
  pub fn get_int_with_default<T: num_traits::NumCast>(
    &self,
    tag: DataElementTag,
    default: T,
  ) -> Result<T, DataError> {
    if self.has(tag) {
      self.get_int(tag)
    } else {
      Ok(default)
    }
  }

  /// Returns all of the integer values for a data element in a data set.
  ///
  pub fn get_ints<T: num_traits::NumCast>(
    &self,
    tag: DataElementTag,
  ) -> Result<Vec<T>, DataError> {
    self
      .get_value(tag)?
      .get_ints()
      .map_err(|e| e.with_path(&DataSetPath::new_with_data_element(tag)))
  }

  /// Returns the singular floating point value for a data element in a data
  /// set.
  ///
  pub fn get_float(&self, tag: DataElementTag) -> Result<f64, DataError> {
    self
      .get_value(tag)?
      .get_float()
      .map_err(|e| e.with_path(&DataSetPath::new_with_data_element(tag)))
  }

  /// Looks up the *'(0002,0010) Transfer Syntax UID'* data element in this
  /// data set and converts it to a known transfer syntax definition.
  ///
  pub fn get_transfer_syntax(
    &self,
  ) -> Result<&'static TransferSyntax, DataError> {
    let uid = self.get_string(dictionary::TRANSFER_SYNTAX_UID.tag)?;

    TransferSyntax::from_uid(uid).map_err(|_| {
      DataError::new_value_invalid(format!(
        "Unrecognized transfer syntax UID: '{uid}'"
      ))
    })
  }

  /// Returns the size in bytes of all data elements in a data set.
  ///
  pub fn total_byte_size(&self) -> u64 {
    self
      .iter()
      .map(|(_, value)| value.total_byte_size())
      .sum()
  }

  /// Returns the human-readable name for a data element tag in a data set,
  /// using the data set's own data elements to determine the private creator
  /// when the tag is private.
  ///
  pub fn tag_name(&self, tag: DataElementTag) -> &'static str {
    let private_creator = self.private_creator_for_tag(tag).ok();

    dictionary::tag_name(tag, private_creator)
  }

  /// Returns the value of the *'(gggg,00xx) Private Creator'* data element in
  /// this data set for the specified private tag.
  ///
  #[allow(clippy::result_unit_err)]
  pub fn private_creator_for_tag(
    &self,
    tag: DataElementTag,
  ) -> Result<&str, ()> {
    if !tag.is_private() {
      return Err(());
    }

    let private_creator_tag = tag.with_element(tag.element >> 8);

    if !private_creator_tag.is_private_creator() {
      return Err(());
    }

    self.get_string(private_creator_tag).map_err(|_| ())
  }

  /// Prints a data set to stdout formatted for readability.
  ///
  pub fn print(&self) {
    self.print_with_options(&DataSetPrintOptions::default());
  }

  /// Prints a data set to stdout formatted for readability using the given
  /// print options.
  ///
  pub fn print_with_options(&self, print_options: &DataSetPrintOptions) {
    self.to_lines(print_options, &mut |line| println!("{line}"));
  }

  /// Converts a data set to a list of printable lines using the specified
  /// print options. The lines are returned via a callback.
  ///
  pub fn to_lines(
    &self,
    print_options: &DataSetPrintOptions,
    callback: &mut impl FnMut(String),
  ) {
    print::data_set_to_lines(self, print_options, callback, 0);
  }
}

impl FromIterator<(DataElementTag, DataElementValue)> for DataSet {
  fn from_iter<T: IntoIterator<Item = (DataElementTag, DataElementValue)>>(
    iter: T,
  ) -> Self {
    Self(iter.into_iter().collect())
  }
}

impl IntoIterator for DataSet {
  type Item = (DataElementTag, DataElementValue);

  type IntoIter =
    std::collections::btree_map::IntoIter<DataElementTag, DataElementValue>;

  fn into_iter(self) -> Self::IntoIter {
    self.0.into_iter()
  }
}

impl Extend<(DataElementTag, DataElementValue)> for DataSet {
  fn extend<T: IntoIterator<Item = (DataElementTag, DataElementValue)>>(
    &mut self,
    iter: T,
  ) {
    self.0.extend(iter);
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn test_data_set() -> DataSet {
    let mut data_set = DataSet::new();

    data_set
      .insert_string_value(&dictionary::PATIENT_ID, &["123"])
      .unwrap();
    data_set
      .insert_int_value(&dictionary::ROWS, &[256])
      .unwrap();

    let mut item = DataSet::new();
    item
      .insert_string_value(&dictionary::MODALITY, &["US"])
      .unwrap();

    data_set.insert(
      dictionary::ANATOMIC_REGION_SEQUENCE.tag,
      DataElementValue::new_sequence(vec![item]),
    );

    data_set
  }

  #[test]
  fn iteration_is_in_tag_order_test() {
    let data_set = test_data_set();

    assert_eq!(
      data_set.tags(),
      vec![
        dictionary::ANATOMIC_REGION_SEQUENCE.tag,
        dictionary::PATIENT_ID.tag,
        dictionary::ROWS.tag,
      ]
    );
  }

  #[test]
  fn getters_test() {
    let data_set = test_data_set();

    assert_eq!(data_set.get_string(dictionary::PATIENT_ID.tag), Ok("123"));
    assert_eq!(data_set.get_int::<u16>(dictionary::ROWS.tag), Ok(256));
    assert_eq!(
      data_set.get_int_with_default(dictionary::NUMBER_OF_FRAMES.tag, 1),
      Ok(1)
    );
    assert!(data_set.get_string(dictionary::PATIENT_NAME.tag).is_err());
  }

  #[test]
  fn path_lookup_test() {
    let data_set = test_data_set();

    let path = DataSetPath::from_string("00082218/[0]/00080060").unwrap();
    assert_eq!(
      data_set.get_value_at_path(&path).unwrap().get_string(),
      Ok("US")
    );

    let path = DataSetPath::from_string("00082218/[0]").unwrap();
    assert!(data_set.get_data_set_at_path(&path).is_ok());

    let path = DataSetPath::from_string("00082218/[1]").unwrap();
    assert!(data_set.get_data_set_at_path(&path).is_err());
  }

  #[test]
  fn file_meta_information_test() {
    let mut data_set = test_data_set();

    data_set
      .insert_string_value(&dictionary::TRANSFER_SYNTAX_UID, &[
        "1.2.840.10008.1.2.1",
      ])
      .unwrap();
    data_set
      .insert_string_value(&dictionary::SOP_INSTANCE_UID, &["1.2.3"])
      .unwrap();

    let fmi = data_set.file_meta_information();

    assert_eq!(
      fmi.tags(),
      vec![
        dictionary::MEDIA_STORAGE_SOP_INSTANCE_UID.tag,
        dictionary::TRANSFER_SYNTAX_UID.tag,
      ]
    );
    assert_eq!(
      fmi.get_string(dictionary::MEDIA_STORAGE_SOP_INSTANCE_UID.tag),
      Ok("1.2.3")
    );
  }

  #[test]
  fn private_creator_for_tag_test() {
    let mut data_set = DataSet::new();
    data_set
      .insert(
        DataElementTag::new(0x0009, 0x0010),
        DataElementValue::new_long_string(&["ACME 1.1"]).unwrap(),
      );

    assert_eq!(
      data_set.private_creator_for_tag(DataElementTag::new(0x0009, 0x1001)),
      Ok("ACME 1.1")
    );
    assert_eq!(
      data_set.private_creator_for_tag(DataElementTag::new(0x0008, 0x1001)),
      Err(())
    );
  }
}
