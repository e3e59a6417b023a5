//! Transforms that extract pixel data from a stream of DICOM P10 tokens.

pub mod p10_pixel_data_frame_transform;
