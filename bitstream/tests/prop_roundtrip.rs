use bitstream::{BitReader, BitWriter};
use proptest::prelude::*;

#[derive(Clone, Debug)]
enum Item {
    Flag(bool),
    Packed { width: usize, value: u64 },
    Byte(u8),
    Word(u32),
    Float(u32),
    Run(Vec<u8>),
}

fn item() -> impl Strategy<Value = Item> {
    prop_oneof![
        any::<bool>().prop_map(Item::Flag),
        (1usize..=64, any::<u64>()).prop_map(|(width, raw)| Item::Packed {
            width,
            value: if width == 64 { raw } else { raw & ((1 << width) - 1) },
        }),
        any::<u8>().prop_map(Item::Byte),
        any::<u32>().prop_map(Item::Word),
        any::<u32>().prop_map(Item::Float),
        prop::collection::vec(any::<u8>(), 0..6).prop_map(Item::Run),
    ]
}

fn encode(items: &[Item]) -> (Vec<u8>, usize) {
    let mut writer = BitWriter::new();
    for item in items {
        match item {
            Item::Flag(v) => writer.write_bool(*v),
            Item::Packed { width, value } => writer.write_bits(*value, *width).unwrap(),
            Item::Byte(v) => writer.write_u8(*v),
            Item::Word(v) => writer.write_u32(*v),
            Item::Float(raw) => writer.write_f32(f32::from_bits(*raw)),
            Item::Run(bytes) => writer.write_bytes(bytes),
        }
    }
    let bits = writer.bits_written();
    (writer.finish(), bits)
}

proptest! {
    #[test]
    fn every_item_reads_back(items in prop::collection::vec(item(), 1..48)) {
        let (bytes, bits) = encode(&items);
        prop_assert_eq!(bytes.len(), bits.div_ceil(8));

        let mut reader = BitReader::new(&bytes);
        for item in &items {
            match item {
                Item::Flag(v) => prop_assert_eq!(reader.read_bool().unwrap(), *v),
                Item::Packed { width, value } => {
                    prop_assert_eq!(reader.read_bits(*width).unwrap(), *value);
                }
                Item::Byte(v) => prop_assert_eq!(reader.read_u8().unwrap(), *v),
                Item::Word(v) => prop_assert_eq!(reader.read_u32().unwrap(), *v),
                Item::Float(raw) => prop_assert_eq!(reader.read_f32().unwrap().to_bits(), *raw),
                Item::Run(expected) => {
                    prop_assert_eq!(&reader.read_bytes(expected.len()).unwrap(), expected);
                }
            }
        }
        prop_assert_eq!(reader.bit_position(), bits);
        prop_assert!(reader.remaining_is_padding());
    }

    #[test]
    fn arbitrary_input_only_errors(
        data in prop::collection::vec(any::<u8>(), 0..16),
        widths in prop::collection::vec(0usize..=70, 1..24),
    ) {
        let mut reader = BitReader::new(&data);
        for width in widths {
            let before = reader.bit_position();
            match reader.read_bits(width) {
                Ok(_) => prop_assert_eq!(reader.bit_position(), before + width),
                Err(_) => prop_assert_eq!(reader.bit_position(), before),
            }
        }
    }
}
