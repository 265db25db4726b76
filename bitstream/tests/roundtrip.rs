use bitstream::{BitError, BitReader, BitWriter};

#[test]
fn mask_words_then_values() {
    // Shape of an update packet: a block mask word, a field mask word,
    // then a 10-bit value and a flag.
    let mut writer = BitWriter::new();
    writer.write_u32(0b10);
    writer.write_u32(0b101);
    writer.write_bits(777, 10).unwrap();
    writer.write_bool(true);
    let bytes = writer.finish();
    assert_eq!(bytes.len(), 10);

    let mut reader = BitReader::new(&bytes);
    assert_eq!(reader.read_u32().unwrap(), 0b10);
    assert_eq!(reader.read_u32().unwrap(), 0b101);
    assert_eq!(reader.read_bits(10).unwrap(), 777);
    assert!(reader.read_bool().unwrap());
    assert!(reader.remaining_is_padding());
}

#[test]
fn length_prefixed_string_after_odd_offset() {
    let mut writer = BitWriter::new();
    writer.write_bits(0b11, 2).unwrap();
    writer.write_u8(5);
    writer.write_bytes("sword".as_bytes());
    let bytes = writer.finish();

    let mut reader = BitReader::new(&bytes);
    assert_eq!(reader.read_bits(2).unwrap(), 0b11);
    let len = usize::from(reader.read_u8().unwrap());
    assert_eq!(reader.read_bytes(len).unwrap(), b"sword".to_vec());
}

#[test]
fn truncated_packet_reports_shortfall() {
    let mut writer = BitWriter::new();
    writer.write_u32(7);
    let mut bytes = writer.finish();
    bytes.pop();

    let mut reader = BitReader::new(&bytes);
    assert_eq!(
        reader.read_u32().unwrap_err(),
        BitError::EndOfBuffer {
            requested: 32,
            available: 24
        }
    );
}
