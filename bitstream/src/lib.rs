//! Bit packing for fieldsync packets.
//!
//! [`BitWriter`] appends values most significant bit first and zero-pads the
//! last byte; [`BitReader`] reads them back with every access bounds-checked.
//! Nothing here knows about entities or masks.
//!
//! ```
//! use bitstream::{BitReader, BitWriter};
//!
//! let mut writer = BitWriter::new();
//! writer.write_bits(5, 3).unwrap();
//! writer.write_u8(0xC3);
//! let bytes = writer.finish();
//! assert_eq!(bytes, vec![0b1011_1000, 0b0110_0000]);
//!
//! let mut reader = BitReader::new(&bytes);
//! assert_eq!(reader.read_bits(3).unwrap(), 5);
//! assert_eq!(reader.read_u8().unwrap(), 0xC3);
//! assert!(reader.remaining_is_padding());
//! ```

mod error;
mod reader;
mod writer;

pub use error::{BitError, BitResult};
pub use reader::BitReader;
pub use writer::BitWriter;
