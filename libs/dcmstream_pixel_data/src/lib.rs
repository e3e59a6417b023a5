//! Extracts frames of pixel data from DICOM P10 data in a streaming
//! fashion.
//!
//! Frames are returned as lists of borrowed byte fragments, so no pixel data
//! is copied during extraction. Decoding and encoding of the image data held
//! in the frames (JPEG, RLE, and friends) is not a concern of this crate;
//! frames are handed to such codecs as opaque bytes.

pub mod pixel_data_frame;
pub mod transforms;

pub use pixel_data_frame::PixelDataFrame;
pub use transforms::p10_pixel_data_frame_transform::{
  P10PixelDataFrameTransform, P10PixelDataFrameTransformError,
};
