use chrono::{NaiveTime, Weekday};
use serde::{Deserialize, Serialize};

use crate::models::timefmt;

/// One row of a barber's weekly availability. At most one entry exists per
/// (barber_id, day); the day is a lowercase English weekday name.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScheduleEntry {
    pub barber_id: String,
    pub day: String,
    #[serde(with = "timefmt::hhmm")]
    pub start_time: NaiveTime,
    #[serde(with = "timefmt::hhmm")]
    pub end_time: NaiveTime,
    #[serde(default, with = "timefmt::hhmm_opt")]
    pub lunch_start: Option<NaiveTime>,
    #[serde(default, with = "timefmt::hhmm_opt")]
    pub lunch_end: Option<NaiveTime>,
    pub is_working: bool,
}

impl ScheduleEntry {
    pub fn lunch_window(&self) -> Option<(NaiveTime, NaiveTime)> {
        match (self.lunch_start, self.lunch_end) {
            (Some(start), Some(end)) => Some((start, end)),
            _ => None,
        }
    }
}

pub fn weekday_name(day: Weekday) -> &'static str {
    match day {
        Weekday::Mon => "monday",
        Weekday::Tue => "tuesday",
        Weekday::Wed => "wednesday",
        Weekday::Thu => "thursday",
        Weekday::Fri => "friday",
        Weekday::Sat => "saturday",
        Weekday::Sun => "sunday",
    }
}

pub fn parse_day(s: &str) -> Option<Weekday> {
    match s {
        "monday" => Some(Weekday::Mon),
        "tuesday" => Some(Weekday::Tue),
        "wednesday" => Some(Weekday::Wed),
        "thursday" => Some(Weekday::Thu),
        "friday" => Some(Weekday::Fri),
        "saturday" => Some(Weekday::Sat),
        "sunday" => Some(Weekday::Sun),
        _ => None,
    }
}
