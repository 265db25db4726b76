#![no_main]

use codec::{decode_create, decode_update, CodecLimits, EntityLayout};
use libfuzzer_sys::fuzz_target;
use schema::{BlockDef, EntitySchema, FieldCodec, FieldDef, VisibilityFlags};

fn layout() -> EntityLayout {
    let schema = EntitySchema::new(vec![
        BlockDef::new(1, "object", 4)
            .field(FieldDef::new(0, FieldCodec::guid()))
            .field(FieldDef::new(1, FieldCodec::f32()))
            .field(FieldDef::new(2, FieldCodec::sint(12)).visibility(VisibilityFlags::OWNER))
            .field(FieldDef::new(3, FieldCodec::string())),
        BlockDef::new(2, "container", 34)
            .field(FieldDef::new(0, FieldCodec::uint(6)))
            .field(FieldDef::array(1, 30, FieldCodec::guid()).sized_by(0))
            .field(FieldDef::new(32, FieldCodec::bool()))
            .field(FieldDef::new(33, FieldCodec::uint(64))),
    ])
    .unwrap();
    EntityLayout::compile(schema, &CodecLimits::for_testing()).unwrap()
}

fuzz_target!(|data: &[u8]| {
    let layout = layout();
    let _ = decode_update(&layout, data);
    let _ = decode_create(&layout, data);
});
