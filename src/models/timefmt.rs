//! Times of day travel as zero-padded "HH:MM" strings on the wire and in the
//! database; dates as "YYYY-MM-DD".

use chrono::{NaiveDate, NaiveTime};

pub const HHMM: &str = "%H:%M";
pub const DATE: &str = "%Y-%m-%d";

pub fn parse_hhmm(s: &str) -> Option<NaiveTime> {
    NaiveTime::parse_from_str(s, HHMM).ok()
}

pub fn fmt_hhmm(t: NaiveTime) -> String {
    t.format(HHMM).to_string()
}

pub fn parse_date(s: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(s, DATE).ok()
}

pub mod hhmm {
    use chrono::NaiveTime;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(t: &NaiveTime, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&super::fmt_hhmm(*t))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<NaiveTime, D::Error> {
        let s = String::deserialize(d)?;
        super::parse_hhmm(&s)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid HH:MM time: {s}")))
    }
}

pub mod hhmm_opt {
    use chrono::NaiveTime;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(t: &Option<NaiveTime>, s: S) -> Result<S::Ok, S::Error> {
        match t {
            Some(t) => s.serialize_some(&super::fmt_hhmm(*t)),
            None => s.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<NaiveTime>, D::Error> {
        let opt: Option<String> = Option::deserialize(d)?;
        opt.map(|s| {
            super::parse_hhmm(&s)
                .ok_or_else(|| serde::de::Error::custom(format!("invalid HH:MM time: {s}")))
        })
        .transpose()
    }
}
