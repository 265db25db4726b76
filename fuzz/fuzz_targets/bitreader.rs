#![no_main]

use bitstream::BitReader;
use libfuzzer_sys::fuzz_target;

// The first half of the input scripts reads over the whole input.
fuzz_target!(|data: &[u8]| {
    let script = &data[..data.len() / 2];
    let mut reader = BitReader::new(data);
    for pair in script.chunks_exact(2).take(512) {
        let (op, arg) = (pair[0], usize::from(pair[1]));
        let before = reader.bit_position();
        let ok = match op % 5 {
            0 => reader.read_bool().is_ok(),
            1 => reader.read_bits(arg % 72).is_ok(),
            2 => reader.read_u32().is_ok(),
            3 => reader.read_bytes(arg % 24).is_ok(),
            _ => {
                let _ = reader.remaining_is_padding();
                true
            }
        };
        if !ok {
            assert_eq!(reader.bit_position(), before);
        }
    }
});
