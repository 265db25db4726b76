//! Serving one round of updates to every observer, then clearing once.

use schema::VisibilityFlags;
use tracing::trace;

use crate::error::CodecResult;
use crate::serialize::{encode_update, update_block_mask};
use crate::value_set::EntityValueSet;
use crate::visibility::VisibilityFilter;

/// Something that receives update packets.
pub trait Recipient {
    /// Visibility flags used to filter what this recipient may see.
    fn visibility(&self) -> VisibilityFlags;
}

impl Recipient for VisibilityFlags {
    fn visibility(&self) -> VisibilityFlags {
        *self
    }
}

/// Options for [`flush_updates`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlushOptions {
    /// Do not deliver packets whose filtered diff is empty.
    pub skip_empty: bool,
}

impl Default for FlushOptions {
    fn default() -> Self {
        Self { skip_empty: true }
    }
}

/// Summary of one flush.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FlushStats {
    /// Recipients a packet was delivered to.
    pub recipients_served: usize,
    /// Recipients skipped because they could see none of the changes.
    pub recipients_skipped: usize,
    /// Distinct packets serialized (at most one per visibility class).
    pub packets_encoded: usize,
    /// Total size of the distinct packets.
    pub bytes_encoded: usize,
    /// Whether the change masks were cleared.
    pub cleared: bool,
}

enum ClassPacket {
    Empty,
    Encoded(Vec<u8>),
}

/// One flush round over a value set.
///
/// Holds the value set exclusively from [`begin`](Self::begin) to
/// [`finish`](Self::finish), so nothing can write or clear in between.
/// Packets are serialized once per visibility class and reused for every
/// recipient of that class. Dropping the cycle without finishing leaves
/// every change mask untouched.
pub struct FlushCycle<'a> {
    set: &'a mut EntityValueSet,
    options: FlushOptions,
    cache: [Option<ClassPacket>; VisibilityFlags::CLASS_COUNT],
    packets_encoded: usize,
    bytes_encoded: usize,
}

impl<'a> FlushCycle<'a> {
    /// Starts a flush round.
    pub fn begin(set: &'a mut EntityValueSet, options: FlushOptions) -> Self {
        Self {
            set,
            options,
            cache: Default::default(),
            packets_encoded: 0,
            bytes_encoded: 0,
        }
    }

    /// The update packet for `recipient`, or `None` if it would carry
    /// nothing and empty packets are skipped.
    pub fn packet(&mut self, recipient: VisibilityFlags) -> CodecResult<Option<&[u8]>> {
        let flags = VisibilityFilter::effective_flags(recipient);
        let class = flags.raw() as usize;
        if self.cache[class].is_none() {
            let packet = if self.options.skip_empty && update_block_mask(self.set, flags, false) == 0
            {
                ClassPacket::Empty
            } else {
                let bytes = encode_update(self.set, flags, false)?;
                self.packets_encoded += 1;
                self.bytes_encoded += bytes.len();
                ClassPacket::Encoded(bytes)
            };
            self.cache[class] = Some(packet);
        }
        Ok(match &self.cache[class] {
            Some(ClassPacket::Encoded(bytes)) => Some(bytes.as_slice()),
            _ => None,
        })
    }

    /// Ends the round and clears every change mask once.
    pub fn finish(self) -> FlushStats {
        self.set.clear_changes_mask();
        trace!(
            packets = self.packets_encoded,
            bytes = self.bytes_encoded,
            "flush cycle cleared change masks"
        );
        FlushStats {
            packets_encoded: self.packets_encoded,
            bytes_encoded: self.bytes_encoded,
            cleared: true,
            ..FlushStats::default()
        }
    }
}

/// Serves pending changes to every recipient, then clears once.
///
/// With no recipients nothing is serialized and the changes stay pending
/// for the next flush. With no changes nothing is delivered. Every packet
/// is serialized before the first delivery, so a serialization error
/// delivers nothing and leaves the change masks untouched.
pub fn flush_updates<R: Recipient>(
    set: &mut EntityValueSet,
    recipients: &[R],
    options: FlushOptions,
    mut deliver: impl FnMut(&R, &[u8]),
) -> CodecResult<FlushStats> {
    if recipients.is_empty() {
        trace!(
            pending = set.changed_block_mask(),
            "no recipients, keeping changes"
        );
        return Ok(FlushStats::default());
    }
    if !set.is_any_changed() {
        return Ok(FlushStats::default());
    }

    let mut cycle = FlushCycle::begin(set, options);
    for recipient in recipients {
        cycle.packet(recipient.visibility())?;
    }

    let mut served = 0;
    let mut skipped = 0;
    for recipient in recipients {
        match cycle.packet(recipient.visibility())? {
            Some(bytes) => {
                deliver(recipient, bytes);
                served += 1;
            }
            None => skipped += 1,
        }
    }

    let stats = cycle.finish();
    Ok(FlushStats {
        recipients_served: served,
        recipients_skipped: skipped,
        ..stats
    })
}
