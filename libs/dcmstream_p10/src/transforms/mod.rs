//! Transforms that operate on a stream of DICOM P10 tokens to filter its
//! content, add to it, extract data from it, or convert it to a different
//! format.

pub mod p10_custom_type_transform;
pub mod p10_filter_transform;
pub mod p10_insert_transform;
pub mod p10_print_transform;
