//! Overlap detection between a proposed range and existing bookings.

use crate::booking::Booking;
use crate::slot::SlotRange;
use crate::types::BookingId;

/// Something that occupies part of a day's grid.
///
/// This trait lets detection work over different representations
/// (e.g., a full [`Booking`] or a lightweight storage row).
pub trait Occupancy {
    fn booking_id(&self) -> BookingId;

    /// The occupied range. Legacy single-slot rows report `[s, s+1)`.
    fn range(&self) -> SlotRange;

    /// Cancelled occupancies never conflict.
    fn is_active(&self) -> bool;
}

impl Occupancy for Booking {
    fn booking_id(&self) -> BookingId {
        self.id
    }

    fn range(&self) -> SlotRange {
        self.range
    }

    fn is_active(&self) -> bool {
        !self.is_cancelled()
    }
}

/// Returns the first active occupancy overlapping `candidate`.
///
/// All existing items are assumed to share the candidate's date.
pub fn find_conflict<'a, O: Occupancy>(
    existing: &'a [O],
    candidate: &SlotRange,
    excluding: Option<BookingId>,
) -> Option<&'a O> {
    existing
        .iter()
        .filter(|item| item.is_active())
        .filter(|item| Some(item.booking_id()) != excluding)
        .find(|item| item.range().overlaps(candidate))
}

/// Returns true if `candidate` overlaps any active occupancy.
pub fn has_conflict<O: Occupancy>(
    existing: &[O],
    candidate: &SlotRange,
    excluding: Option<BookingId>,
) -> bool {
    find_conflict(existing, candidate, excluding).is_some()
}
