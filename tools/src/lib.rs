//! Introspection and debugging tools for fieldsync packets.
//!
//! This crate provides utilities for inspecting encoded packets:
//!
//! - Load and validate schema JSON
//! - Decode create/update packets into structured reports
//! - Render reports as JSON or human-readable text
//!
//! # Design Principles
//!
//! - **First-class tooling** - These tools are part of the product, not afterthoughts.
//! - **Human-readable output** - Make it easy to understand what the codec is doing.

use std::fmt::Write as _;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use codec::{
    decode_create, decode_update, CodecLimits, DecodedEntity, EntityLayout, FieldValue,
};
use schema::EntitySchema;
use serde::Serialize;

/// Packet kinds understood by the decoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PacketKind {
    Create,
    Update,
}

/// A decoded packet in report form.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PacketReport {
    pub kind: PacketKind,
    pub bytes: usize,
    pub schema_hash: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recipient_flags: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub block_mask: Option<u32>,
    pub blocks: Vec<BlockReport>,
}

/// One decoded block.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BlockReport {
    pub index: usize,
    pub id: u16,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mask: Option<Vec<u32>>,
    pub fields: Vec<FieldReport>,
}

/// One decoded field value.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldReport {
    pub bit: u16,
    pub value: ReportValue,
}

/// Field value in report form; guids are rendered as hex strings.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum ReportValue {
    Bool(bool),
    #[serde(rename = "uint")]
    UInt(u64),
    #[serde(rename = "sint")]
    SInt(i64),
    F32(f32),
    Guid(String),
    Str(String),
}

impl From<&FieldValue> for ReportValue {
    fn from(value: &FieldValue) -> Self {
        match value {
            FieldValue::Bool(v) => Self::Bool(*v),
            FieldValue::UInt(v) => Self::UInt(*v),
            FieldValue::SInt(v) => Self::SInt(*v),
            FieldValue::F32(v) => Self::F32(*v),
            FieldValue::Guid(v) => Self::Guid(v.to_string()),
            FieldValue::Str(v) => Self::Str(v.clone()),
        }
    }
}

/// Parses and validates schema JSON.
pub fn parse_schema(json: &str) -> Result<EntitySchema> {
    let schema: EntitySchema = serde_json::from_str(json).context("parse schema json")?;
    schema.validate().context("schema validation failed")?;
    Ok(schema)
}

/// Reads, parses and validates a schema file.
pub fn load_schema(path: &Path) -> Result<EntitySchema> {
    let contents =
        fs::read_to_string(path).with_context(|| format!("read schema {}", path.display()))?;
    parse_schema(&contents)
}

/// Compiles a schema with default limits.
pub fn compile_layout(schema: EntitySchema) -> Result<EntityLayout> {
    EntityLayout::compile(schema, &CodecLimits::default()).context("compile layout")
}

/// Formats a schema hash the way reports print it.
#[must_use]
pub fn format_schema_hash(hash: u64) -> String {
    format!("0x{hash:016x}")
}

/// Decodes a packet into a report.
pub fn decode_packet(layout: &EntityLayout, bytes: &[u8], kind: PacketKind) -> Result<PacketReport> {
    let decoded = match kind {
        PacketKind::Create => decode_create(layout, bytes).context("decode create packet")?,
        PacketKind::Update => decode_update(layout, bytes).context("decode update packet")?,
    };
    Ok(build_report(layout, bytes.len(), kind, &decoded))
}

fn build_report(
    layout: &EntityLayout,
    bytes: usize,
    kind: PacketKind,
    decoded: &DecodedEntity,
) -> PacketReport {
    let block_mask = (kind == PacketKind::Update).then(|| {
        decoded
            .blocks
            .iter()
            .fold(0u32, |acc, block| acc | (1 << block.index))
    });
    let blocks = decoded
        .blocks
        .iter()
        .map(|block| BlockReport {
            index: block.index,
            id: block.id,
            name: layout.block(block.index).def().name.clone(),
            mask: block
                .mask
                .as_ref()
                .map(|mask| (0..mask.word_count()).map(|word| mask.block(word)).collect()),
            fields: block
                .fields
                .iter()
                .map(|(bit, value)| FieldReport {
                    bit: *bit,
                    value: value.into(),
                })
                .collect(),
        })
        .collect();
    PacketReport {
        kind,
        bytes,
        schema_hash: format_schema_hash(layout.schema_hash()),
        recipient_flags: decoded.recipient.map(schema::VisibilityFlags::raw),
        block_mask,
        blocks,
    }
}

/// Renders a report as indented text.
#[must_use]
pub fn format_report_pretty(report: &PacketReport) -> String {
    let mut out = String::new();
    let kind = match report.kind {
        PacketKind::Create => "create",
        PacketKind::Update => "update",
    };
    let _ = writeln!(
        out,
        "{kind} packet: {} bytes schema_hash: {}",
        report.bytes, report.schema_hash
    );
    if let Some(flags) = report.recipient_flags {
        let _ = writeln!(out, "recipient flags: 0b{flags:08b}");
    }
    if let Some(mask) = report.block_mask {
        let _ = writeln!(out, "block mask: 0b{mask:b}");
    }
    for block in &report.blocks {
        let _ = writeln!(
            out,
            "block {} '{}' (index {}): {} fields",
            block.id,
            block.name,
            block.index,
            block.fields.len()
        );
        if let Some(mask) = &block.mask {
            let words: Vec<String> = mask.iter().map(|word| format!("0x{word:08x}")).collect();
            let _ = writeln!(out, "  mask: [{}]", words.join(", "));
        }
        for field in &block.fields {
            let _ = writeln!(out, "  [{}] {}", field.bit, format_value(&field.value));
        }
    }
    out
}

fn format_value(value: &ReportValue) -> String {
    match value {
        ReportValue::Bool(v) => format!("bool {v}"),
        ReportValue::UInt(v) => format!("uint {v}"),
        ReportValue::SInt(v) => format!("sint {v}"),
        ReportValue::F32(v) => format!("f32 {v}"),
        ReportValue::Guid(v) => format!("guid {v}"),
        ReportValue::Str(v) => format!("str {v:?}"),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use codec::{encode_create, encode_update, EntityValueSet, Guid};
    use schema::VisibilityFlags;

    const SCHEMA: &str = r#"{
        "blocks": [
            {
                "id": 1,
                "name": "object",
                "field_count": 2,
                "fields": [
                    { "bit": 0, "codec": "guid" },
                    { "bit": 1, "codec": { "uint": { "bits": 12 } }, "visibility": 1 }
                ]
            },
            {
                "id": 2,
                "name": "item",
                "field_count": 5,
                "fields": [
                    { "bit": 0, "codec": "str" },
                    { "bit": 1, "codec": "bool", "shape": { "array": { "len": 2 } } },
                    { "bit": 4, "codec": "f32" }
                ]
            }
        ]
    }"#;

    fn layout() -> Arc<EntityLayout> {
        Arc::new(compile_layout(parse_schema(SCHEMA).unwrap()).unwrap())
    }

    #[test]
    fn parse_schema_reads_codecs_and_shapes() {
        let schema = parse_schema(SCHEMA).unwrap();
        assert_eq!(schema.blocks.len(), 2);
        assert_eq!(schema.blocks[0].fields[1].visibility, VisibilityFlags::OWNER);
        assert!(matches!(
            schema.blocks[1].fields[1].shape,
            schema::FieldShape::Array { len: 2, size_bit: None }
        ));
    }

    #[test]
    fn parse_schema_rejects_invalid_layout() {
        let json = r#"{ "blocks": [ { "id": 1, "name": "a", "field_count": 2,
            "fields": [ { "bit": 0, "codec": "bool" } ] } ] }"#;
        let err = parse_schema(json).unwrap_err();
        assert!(format!("{err:#}").contains("validation"));
    }

    #[test]
    fn update_report_json() {
        let layout = layout();
        let mut entity = EntityValueSet::new(layout.clone());
        entity.set(layout.field::<String>(2, 0), "axe".to_string());
        entity.set_element(layout.array::<bool>(2, 1), 1, true);
        let bytes = encode_update(&entity, VisibilityFlags::NONE, false).unwrap();

        let report = decode_packet(&layout, &bytes, PacketKind::Update).unwrap();
        assert_eq!(report.block_mask, Some(0b10));
        assert_eq!(report.blocks.len(), 1);
        assert_eq!(report.blocks[0].name, "item");
        assert_eq!(report.blocks[0].mask, Some(vec![0b1011]));

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["kind"], "update");
        assert_eq!(json["blocks"][0]["fields"][0]["value"]["type"], "str");
        assert_eq!(json["blocks"][0]["fields"][0]["value"]["value"], "axe");
        assert_eq!(json["blocks"][0]["fields"][1]["bit"], 3);
        assert!(json.get("recipient_flags").is_none());
    }

    #[test]
    fn create_report_pretty() {
        let layout = layout();
        let mut entity = EntityValueSet::new(layout.clone());
        entity.set(layout.field::<Guid>(1, 0), Guid::new(0x10));
        entity.set(layout.field::<u16>(1, 1), 4000);
        let bytes = encode_create(&entity, VisibilityFlags::OWNER).unwrap();

        let report = decode_packet(&layout, &bytes, PacketKind::Create).unwrap();
        assert_eq!(report.recipient_flags, Some(1));
        let text = format_report_pretty(&report);
        assert!(text.starts_with("create packet"));
        assert!(text.contains("block 1 'object'"));
        assert!(text.contains("[0] guid 0x0000000000000010"));
        assert!(text.contains("[1] uint 4000"));
    }

    #[test]
    fn corrupt_packet_reports_context() {
        let layout = layout();
        let err = decode_packet(&layout, &[0, 0, 0, 0b100], PacketKind::Update).unwrap_err();
        let message = format!("{err:#}");
        assert!(message.contains("decode update packet"));
        assert!(message.contains("block mask"));
    }

    #[test]
    fn schema_hash_is_hex() {
        assert_eq!(format_schema_hash(0xAB), "0x00000000000000ab");
    }
}
