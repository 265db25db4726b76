//! Change tracking and packet encoding for fieldsync.
//!
//! Ties together `bitstream` and `schema`: an [`EntityLayout`] is compiled
//! once per entity type and shared; each entity owns an [`EntityValueSet`]
//! whose writes mark dirty bits in per-block [`ChangeMask`]s. Create and
//! update packets are serialized per recipient, filtered by visibility, and
//! a [`FlushCycle`] clears the masks exactly once after every recipient was
//! served.
//!
//! # Design Principles
//!
//! - **Dirty on change** - Bitwise-equal writes never mark a field.
//! - **Fail closed** - Unknown recipient flags never grant visibility.
//! - **Deterministic** - Same state and recipient produce the same bytes.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use codec::{encode_update, CodecLimits, EntityLayout, EntityValueSet, Field};
//! use schema::{BlockDef, EntitySchema, FieldCodec, FieldDef, VisibilityFlags};
//!
//! let schema = EntitySchema::new(vec![
//!     BlockDef::new(1, "object", 1).field(FieldDef::new(0, FieldCodec::uint(32))),
//! ])
//! .unwrap();
//! let layout = Arc::new(EntityLayout::compile(schema, &CodecLimits::default()).unwrap());
//! let health: Field<u32> = layout.field(1, 0);
//!
//! let mut entity = EntityValueSet::new(layout);
//! entity.set(health, 100);
//! let packet = encode_update(&entity, VisibilityFlags::NONE, false).unwrap();
//! assert_eq!(packet, [0, 0, 0, 1, 0, 0, 0, 1, 0, 0, 0, 100]);
//! entity.clear_changes_mask();
//! ```

mod block;
mod change_mask;
mod decode;
mod error;
mod field_codec;
mod flush;
mod layout;
mod limits;
mod serialize;
mod value;
mod value_set;
mod visibility;

pub use block::ReplicationBlock;
pub use change_mask::{words_for, ChangeMask};
pub use decode::{decode_create, decode_update, DecodedBlock, DecodedEntity};
pub use error::{CodecError, CodecResult, LimitKind, MaskKind, MaskReason, ValueReason};
pub use flush::{flush_updates, FlushCycle, FlushOptions, FlushStats, Recipient};
pub use layout::{ArrayField, BlockLayout, EntityLayout, Field, Slot};
pub use limits::CodecLimits;
pub use serialize::{encode_create, encode_update, update_block_mask, write_create, write_update};
pub use value::{FieldType, FieldValue, Guid};
pub use value_set::EntityValueSet;
pub use visibility::VisibilityFilter;
