//! Provides core DICOM concepts including data element tags, value
//! representations, data element values, data sets, data set paths, transfer
//! syntaxes, and a dictionary of the well-known data elements that this
//! library works with.

pub mod data_element_tag;
pub mod data_element_value;
pub mod data_error;
pub mod data_set;
pub mod data_set_path;
pub mod dictionary;
pub mod error;
pub mod transfer_syntax;
pub mod utils;
pub mod value_multiplicity;
pub mod value_representation;

pub use data_element_tag::DataElementTag;
pub use data_element_value::DataElementValue;
pub use data_error::DataError;
pub use data_set::DataSet;
pub use data_set::print::DataSetPrintOptions;
pub use data_set_path::DataSetPath;
pub use error::DcmError;
pub use transfer_syntax::TransferSyntax;
pub use utils::RcByteSlice;
pub use value_multiplicity::ValueMultiplicity;
pub use value_representation::ValueRepresentation;
