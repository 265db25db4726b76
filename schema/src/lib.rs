//! Replication block and field schema definitions for fieldsync.
//!
//! This crate defines how an entity's replicated state is laid out:
//! - Entity schemas as an ordered list of blocks (at most [`MAX_BLOCKS`])
//! - Blocks with a declared field count and stable bit indices
//! - Field codecs (bool, fixed-width integers, floats, packed guids, strings)
//! - Array fields with a summary bit and per-element bits
//! - Per-field visibility flags
//! - Deterministic schema hashing
//!
//! # Design Principles
//!
//! - **Static schemas** - Declared once at startup, validated before any entity exists.
//! - **Explicit layout** - Every bit below a block's field count belongs to exactly one field.
//! - **Deterministic hashing** - Schema hash is stable given the same definition.

mod error;
mod field;
mod hash;
mod schema;

pub use error::{SchemaError, SchemaResult};
pub use field::{FieldCodec, FieldDef, FieldShape, VisibilityFlags};
pub use hash::schema_hash;
pub use schema::{BlockDef, EntitySchema, SchemaBuilder};

/// A block identifier within an entity schema.
pub type BlockId = u16;

/// A bit index within a block's change mask.
pub type BitIndex = u16;

/// Maximum number of blocks per entity (one bit each in a `u32` word).
pub const MAX_BLOCKS: usize = 32;
