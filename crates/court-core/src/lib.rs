//! Core domain logic for court reservations.
//!
//! This crate contains the fundamental types and logic for:
//! - Slot calendar: the fixed hourly grid and range arithmetic
//! - Conflict detection between bookings on the same day
//! - Rate blending and per-participant payment allocation
//! - Coin ledger and payment record rules
//! - Day and week availability views

mod allocation;
pub mod account;
pub mod booking;
pub mod conflict;
pub mod error;
pub mod events;
pub mod ledger;
pub mod payment;
pub mod policy;
pub mod rates;
pub mod schedule;
pub mod slot;
pub mod types;

pub use account::{Account, AccountRole, Actor, MembershipClass};
pub use allocation::{Allocation, AllocationSummary, MemberShare, RosterMember, allocate};
pub use booking::{Booking, BookingRequest, BookingStatus, PaymentStatus};
pub use error::EngineError;
pub use events::{EventSink, LifecycleEvent, RecordingSink, TracingSink};
pub use ledger::{CreditKind, EntryStatus, GrantDecision, LedgerEntry, LedgerKind};
pub use payment::{
    OpenPlaySession, PaymentDecision, PaymentRecord, PaymentRecordStatus, PaymentTarget,
};
pub use policy::Policy;
pub use rates::{BlendedRates, RatePolicy};
pub use schedule::{DayView, NoWeather, SlotAvailability, Weather, WeatherProvider, WeekView};
pub use slot::{Slot, SlotRange};
pub use types::{AccountId, BookingId, EntryId, PaymentId};
