//! Booking and cancellation commands.

use std::io::Write;

use anyhow::Result;
use chrono::NaiveDateTime;
use court_core::{AccountId, Booking, BookingId, BookingRequest};
use court_db::Database;

fn roster_label(booking: &Booking) -> String {
    booking
        .roster
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Books the court for `actor` and the players in `request.roster`.
///
/// The actor always plays; it is placed first on the roster.
pub fn run<W: Write>(
    writer: &mut W,
    db: &mut Database,
    actor: AccountId,
    mut request: BookingRequest,
    now: NaiveDateTime,
) -> Result<()> {
    let snapshot = db.actor(actor)?;
    request.roster.insert(0, actor);
    let booking = db.create_booking_at(&snapshot, &request, now)?;

    writeln!(
        writer,
        "Booked #{}: {} {} ({}h) for {} coins",
        booking.id,
        booking.date,
        booking.range,
        booking.duration_hours(),
        booking.coin_cost
    )?;
    writeln!(writer, "Roster: {}", roster_label(&booking))?;
    writeln!(writer, "Balance: {} coins", db.balance(actor)?)?;
    Ok(())
}

pub fn cancel<W: Write>(
    writer: &mut W,
    db: &mut Database,
    booking_id: BookingId,
    actor: AccountId,
    now: NaiveDateTime,
) -> Result<()> {
    let snapshot = db.actor(actor)?;
    let booking = db.cancel_booking_at(booking_id, &snapshot, now)?;
    writeln!(
        writer,
        "Cancelled #{}: {} {}; refunded {} coins to account {}",
        booking.id, booking.date, booking.range, booking.coin_cost, booking.owner_id
    )?;
    Ok(())
}
