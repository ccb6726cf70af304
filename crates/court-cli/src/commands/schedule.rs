//! Availability views.

use std::io::Write;

use anyhow::Result;
use chrono::{NaiveDate, NaiveDateTime};
use court_core::{DayView, WeatherProvider, WeekView};
use court_db::Database;

/// Writes one line per slot of the day.
pub fn format_day<W: Write>(writer: &mut W, view: &DayView) -> Result<()> {
    writeln!(writer, "{} ({})", view.date, view.date.format("%A"))?;
    for entry in &view.slots {
        let status = entry
            .occupying_booking_id
            .map_or_else(|| "free".to_string(), |id| format!("#{id}"));
        let weather = entry
            .weather
            .as_ref()
            .map(|w| format!("{:.1}°C {}", w.temperature, w.condition))
            .unwrap_or_default();
        let line = format!("{}  {:<6}  {}", entry.slot, status, weather);
        writeln!(writer, "{}", line.trim_end())?;
    }
    Ok(())
}

/// Writes one summary line per day.
pub fn format_week<W: Write>(writer: &mut W, view: &WeekView) -> Result<()> {
    if view.days.is_empty() {
        writeln!(writer, "No days to show.")?;
        return Ok(());
    }
    for day in &view.days {
        let taken: Vec<String> = day
            .slots
            .iter()
            .filter_map(|entry| {
                entry
                    .occupying_booking_id
                    .map(|id| format!("{} #{id}", entry.slot))
            })
            .collect();
        let line = format!(
            "{} {}  {:>2} free  {}",
            day.date,
            day.date.format("%a"),
            day.available_slots().count(),
            taken.join(", ")
        );
        writeln!(writer, "{}", line.trim_end())?;
    }
    Ok(())
}

pub fn day<W: Write>(
    writer: &mut W,
    db: &Database,
    date: NaiveDate,
    weather: &dyn WeatherProvider,
    json: bool,
) -> Result<()> {
    let view = db.day_view(date, weather)?;
    if json {
        writeln!(writer, "{}", serde_json::to_string_pretty(&view)?)?;
    } else {
        format_day(writer, &view)?;
    }
    Ok(())
}

pub fn week<W: Write>(
    writer: &mut W,
    db: &Database,
    start: NaiveDate,
    days: u32,
    weather: &dyn WeatherProvider,
    json: bool,
    now: NaiveDateTime,
) -> Result<()> {
    let view = db.week_view_at(start, days, weather, now)?;
    if json {
        writeln!(writer, "{}", serde_json::to_string_pretty(&view)?)?;
    } else {
        format_week(writer, &view)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use court_core::{
        AccountId, BookingRequest, MembershipClass, NoWeather, Slot, SlotRange, Weather,
    };
    use court_db::NewAccount;
    use insta::assert_snapshot;

    struct Sunny;

    impl WeatherProvider for Sunny {
        fn forecast(&self, _date: NaiveDate, slot: Slot) -> Option<Weather> {
            (slot.hour() == 9).then(|| Weather {
                temperature: 21.5,
                condition: "sunny".to_string(),
            })
        }
    }

    fn now() -> NaiveDateTime {
        "2026-03-01T08:00:00".parse().unwrap()
    }

    fn date(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    fn setup() -> Database {
        let mut db = Database::open_in_memory().unwrap();
        let mut ana = NewAccount::member("Ana", MembershipClass::Standard);
        ana.opening_balance = 100;
        let ana = db.create_account(&ana).unwrap().actor();
        for (day, start, end) in [
            ("2026-03-02", "09:00", "11:00"),
            ("2026-03-02", "20:00", "22:00"),
            ("2026-03-03", "05:00", "06:00"),
        ] {
            db.create_booking_at(
                &ana,
                &BookingRequest {
                    date: date(day),
                    range: SlotRange::parse(start, end).unwrap(),
                    roster: vec![AccountId::new(1)],
                    notes: None,
                },
                now(),
            )
            .unwrap();
        }
        db
    }

    #[test]
    fn test_day_view_marks_taken_slots() {
        let db = setup();
        let mut out = Vec::new();
        day(&mut out, &db, date("2026-03-02"), &Sunny, false).unwrap();
        assert_snapshot!(String::from_utf8(out).unwrap(), @r"
        2026-03-02 (Monday)
        05:00  free
        06:00  free
        07:00  free
        08:00  free
        09:00  #1      21.5°C sunny
        10:00  #1
        11:00  free
        12:00  free
        13:00  free
        14:00  free
        15:00  free
        16:00  free
        17:00  free
        18:00  free
        19:00  free
        20:00  #2
        21:00  #2
        22:00  free
        ");
    }

    #[test]
    fn test_week_view_summarizes_days() {
        let db = setup();
        let mut out = Vec::new();
        week(&mut out, &db, date("2026-02-28"), 4, &NoWeather, false, now()).unwrap();
        assert_snapshot!(String::from_utf8(out).unwrap(), @r"
        2026-03-01 Sun  18 free
        2026-03-02 Mon  14 free  09:00 #1, 10:00 #1, 20:00 #2, 21:00 #2
        2026-03-03 Tue  17 free  05:00 #3
        ");
    }

    #[test]
    fn test_week_view_rejects_long_ranges() {
        let db = setup();
        let err = week(&mut Vec::new(), &db, date("2026-03-01"), 30, &NoWeather, false, now())
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "invalid range: view must cover 1 to 14 days, got 30"
        );
    }

    #[test]
    fn test_day_json_omits_missing_weather() {
        let db = setup();
        let mut out = Vec::new();
        day(&mut out, &db, date("2026-03-03"), &NoWeather, true).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&out).unwrap();
        assert_eq!(value["slots"][0]["slot"], "05:00");
        assert_eq!(value["slots"][0]["occupying_booking_id"], 3);
        assert!(value["slots"][1].get("occupying_booking_id").is_none());
        assert!(value["slots"][1].get("weather").is_none());
    }
}
