use std::sync::Arc;

use codec::{encode_update, flush_updates, CodecLimits, EntityLayout, EntityValueSet, FlushOptions};
use criterion::{criterion_group, criterion_main, BatchSize, BenchmarkId, Criterion};
use schema::{BlockDef, EntitySchema, FieldCodec, FieldDef, VisibilityFlags};

fn layout(blocks: u16, fields: u16) -> Arc<EntityLayout> {
    let defs = (0..blocks)
        .map(|id| {
            (0..fields).fold(BlockDef::new(id, format!("block{id}"), fields), |block, bit| {
                let def = FieldDef::new(bit, FieldCodec::uint(16));
                block.field(if bit % 5 == 0 {
                    def.visibility(VisibilityFlags::OWNER)
                } else {
                    def
                })
            })
        })
        .collect();
    let schema = EntitySchema::new(defs).expect("bench schema");
    Arc::new(EntityLayout::compile(schema, &CodecLimits::unlimited()).expect("bench layout"))
}

fn dirty_set(layout: &Arc<EntityLayout>, stride: usize) -> EntityValueSet {
    let mut set = EntityValueSet::new(layout.clone());
    for block in 0..layout.block_count() {
        let fields = layout.block(block).field_count();
        for bit in (0..fields).step_by(stride) {
            set.set_value(block, bit as u16, codec::FieldValue::UInt(bit as u64 + 1));
        }
    }
    set
}

fn bench_encode_update(c: &mut Criterion) {
    let mut group = c.benchmark_group("encode_update");
    for &(blocks, fields, stride) in &[(4u16, 32u16, 7usize), (8, 256, 31), (16, 1024, 97)] {
        let layout = layout(blocks, fields);
        let set = dirty_set(&layout, stride);
        group.bench_with_input(
            BenchmarkId::new("sparse", format!("{blocks}x{fields}")),
            &set,
            |b, set| b.iter(|| encode_update(set, VisibilityFlags::OWNER, false).expect("encode")),
        );
        group.bench_with_input(
            BenchmarkId::new("force_all", format!("{blocks}x{fields}")),
            &set,
            |b, set| b.iter(|| encode_update(set, VisibilityFlags::NONE, true).expect("encode")),
        );
    }
    group.finish();
}

fn bench_flush(c: &mut Criterion) {
    let layout = layout(8, 256);
    let observers: Vec<VisibilityFlags> = (0..64)
        .map(|i| VisibilityFlags::from_raw((i % 8) as u8))
        .collect();
    c.bench_function("flush_64_observers", |b| {
        b.iter_batched(
            || dirty_set(&layout, 13),
            |mut set| {
                flush_updates(&mut set, &observers, FlushOptions::default(), |_, _| {})
                    .expect("flush")
            },
            BatchSize::SmallInput,
        );
    });
}

criterion_group!(benches, bench_encode_update, bench_flush);
criterion_main!(benches);
