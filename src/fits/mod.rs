//! FITS image files: header cards, checksums, writing and read-back.

pub mod checksum;
pub mod header;
pub mod reader;
pub mod writer;

pub use header::{Card, Header, Value};
pub use reader::FitsImage;
pub use writer::ImageWriter;
