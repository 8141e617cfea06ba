//! Weekly schedule normalization for published opening hours.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// Marker for days with no published hours.
pub const CLOSED: &str = "выходной";

const DAY_CODES: [&str; 7] = ["mo", "tu", "we", "th", "fr", "sa", "su"];

static DAY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)^\s*(mo|tu|we|th|fr|sa|su)(?:\s*-\s*(mo|tu|we|th|fr|sa|su))?\s+(.+?)\s*$",
    )
    .expect("valid regex")
});

/// One venue's hours, one entry per weekday.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeeklyHours {
    pub mon: String,
    pub tue: String,
    pub wed: String,
    pub thu: String,
    pub fri: String,
    pub sat: String,
    pub sun: String,
}

impl WeeklyHours {
    fn from_days(days: [String; 7]) -> Self {
        let [mon, tue, wed, thu, fri, sat, sun] = days;
        Self {
            mon,
            tue,
            wed,
            thu,
            fri,
            sat,
            sun,
        }
    }

    /// `(day code, hours)` pairs, Monday first.
    #[must_use]
    pub fn days(&self) -> [(&'static str, &str); 7] {
        [
            ("mon", self.mon.as_str()),
            ("tue", self.tue.as_str()),
            ("wed", self.wed.as_str()),
            ("thu", self.thu.as_str()),
            ("fri", self.fri.as_str()),
            ("sat", self.sat.as_str()),
            ("sun", self.sun.as_str()),
        ]
    }
}

fn day_index(code: &str) -> Option<usize> {
    let code = code.to_ascii_lowercase();
    DAY_CODES.iter().position(|d| *d == code)
}

/// Turn raw `"Mo 10:00-22:00"` strings into a full week.
///
/// Ranges like `"Mo-Fr 09:00-18:00"` cover every day in between, wrapping
/// past Sunday. Later entries override earlier ones for the same day.
/// Days never mentioned are [`CLOSED`]; unparsable entries are ignored.
#[must_use]
pub fn normalize_opening_hours(raw: &[String]) -> WeeklyHours {
    let mut days: [String; 7] = std::array::from_fn(|_| CLOSED.to_string());

    for entry in raw {
        let Some(caps) = DAY_RE.captures(entry) else {
            tracing::debug!(entry, "unrecognized opening hours entry");
            continue;
        };
        let Some(start) = caps.get(1).and_then(|m| day_index(m.as_str())) else {
            continue;
        };
        let end = caps
            .get(2)
            .and_then(|m| day_index(m.as_str()))
            .unwrap_or(start);
        let hours = caps.get(3).map_or("", |m| m.as_str()).to_string();

        let span = (end + 7 - start) % 7;
        for offset in 0..=span {
            days[(start + offset) % 7].clone_from(&hours);
        }
    }

    WeeklyHours::from_days(days)
}
