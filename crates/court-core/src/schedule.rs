//! Availability views over the slot calendar.

use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::conflict::Occupancy;
use crate::error::EngineError;
use crate::slot::{self, Slot};
use crate::types::BookingId;

/// Forecast for one slot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Weather {
    pub temperature: f64,
    pub condition: String,
}

/// Source of per-slot forecasts.
///
/// Returning `None` means "no data" and never fails a view.
pub trait WeatherProvider {
    fn forecast(&self, date: NaiveDate, slot: Slot) -> Option<Weather>;
}

/// Provider used when no forecasts are configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoWeather;

impl WeatherProvider for NoWeather {
    fn forecast(&self, _date: NaiveDate, _slot: Slot) -> Option<Weather> {
        None
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SlotAvailability {
    pub slot: Slot,
    pub is_available: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub occupying_booking_id: Option<BookingId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weather: Option<Weather>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DayView {
    pub date: NaiveDate,
    pub slots: Vec<SlotAvailability>,
}

impl DayView {
    pub fn available_slots(&self) -> impl Iterator<Item = Slot> + '_ {
        self.slots
            .iter()
            .filter(|entry| entry.is_available)
            .map(|entry| entry.slot)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeekView {
    pub days: Vec<DayView>,
}

/// Projects one day's bookings onto the grid.
///
/// Bookings are assumed to fall on `date`; cancelled ones are ignored.
pub fn day_view<O: Occupancy>(
    date: NaiveDate,
    bookings: &[O],
    weather: &dyn WeatherProvider,
) -> DayView {
    let slots = slot::slots()
        .map(|mark| {
            let occupying_booking_id = bookings
                .iter()
                .filter(|booking| booking.is_active())
                .find(|booking| booking.range().contains(mark))
                .map(Occupancy::booking_id);
            SlotAvailability {
                slot: mark,
                is_available: occupying_booking_id.is_none(),
                occupying_booking_id,
                weather: weather.forecast(date, mark),
            }
        })
        .collect();
    DayView { date, slots }
}

/// Dates a week view should cover, skipping days before `today`.
pub fn week_dates(
    start: NaiveDate,
    num_days: u32,
    today: NaiveDate,
    max_days: u32,
) -> Result<Vec<NaiveDate>, EngineError> {
    if num_days == 0 || num_days > max_days {
        return Err(EngineError::InvalidRange {
            reason: format!("view must cover 1 to {max_days} days, got {num_days}"),
        });
    }
    Ok((0..num_days)
        .filter_map(|offset| start.checked_add_days(Days::new(u64::from(offset))))
        .filter(|date| *date >= today)
        .collect())
}
