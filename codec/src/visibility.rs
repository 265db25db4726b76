//! Per-recipient field visibility.

use schema::{EntitySchema, VisibilityFlags};
use tracing::warn;

use crate::change_mask::ChangeMask;

/// Removes fields a recipient may not see from a requested mask.
///
/// Built once from the schema's per-field visibility flags. For every block
/// and every combination of known recipient flags it precomputes the mask of
/// allowed bits, so filtering is a single AND. A field with no visibility
/// flags is public; otherwise the recipient must hold at least one of them.
/// Array summary and element bits follow their array's flags.
#[derive(Debug, Clone)]
pub struct VisibilityFilter {
    /// `[block][class]` allowed bits, `class` being the raw known flags.
    allowed: Vec<Vec<ChangeMask>>,
}

impl VisibilityFilter {
    /// Precomputes allowed masks for every block of `schema`.
    #[must_use]
    pub fn new(schema: &EntitySchema) -> Self {
        let allowed = schema
            .blocks
            .iter()
            .map(|block| {
                (0..VisibilityFlags::CLASS_COUNT)
                    .map(|class| {
                        let recipient = VisibilityFlags::from_raw(class as u8);
                        let mut mask = ChangeMask::new(block.field_count as usize);
                        for field in &block.fields {
                            if !is_visible(field.visibility, recipient) {
                                continue;
                            }
                            let start = field.bit as usize;
                            for bit in start..start + field.bits_used() {
                                mask.set(bit);
                            }
                        }
                        mask
                    })
                    .collect()
            })
            .collect();
        Self { allowed }
    }

    /// Strips recipient flag bits this version does not understand.
    ///
    /// Unknown bits never grant access.
    #[must_use]
    pub fn effective_flags(recipient: VisibilityFlags) -> VisibilityFlags {
        let unknown = recipient.unknown_bits();
        if unknown != 0 {
            warn!(
                raw = recipient.raw(),
                unknown, "ignoring unknown recipient visibility flags"
            );
        }
        recipient.known()
    }

    /// Returns every bit of block `block` that `recipient` may see.
    #[must_use]
    pub fn allow_mask(&self, block: usize, recipient: VisibilityFlags) -> &ChangeMask {
        let class = Self::effective_flags(recipient).raw() as usize;
        &self.allowed[block][class]
    }

    /// Returns `requested` restricted to the bits `recipient` may see.
    ///
    /// Never adds bits that are not in `requested`.
    #[must_use]
    pub fn filter(
        &self,
        block: usize,
        requested: &ChangeMask,
        recipient: VisibilityFlags,
    ) -> ChangeMask {
        requested & self.allow_mask(block, recipient)
    }
}

fn is_visible(field: VisibilityFlags, recipient: VisibilityFlags) -> bool {
    field.is_empty() || field.intersects(recipient)
}
