use chrono::{NaiveTime, Timelike};
use serde::Serialize;
use std::{collections::HashSet, fmt, str::FromStr};
use thiserror::Error;

/// Serializes as its display name.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum Category {
    Morning,
    Afternoon,
    Evening,
    Night,
}

impl Category {
    /// Display and reporting order.
    pub const ALL: [Category; 4] = [
        Category::Morning,
        Category::Afternoon,
        Category::Evening,
        Category::Night,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Category::Morning => "Morning",
            Category::Afternoon => "Afternoon",
            Category::Evening => "Evening",
            Category::Night => "Night",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TimeParseError {
    #[error("time '{0}' has no AM/PM marker (12-hour format expected)")]
    MissingMarker(String),
    #[error("time '{0}' is not in H:MM form")]
    BadClock(String),
    #[error("hour {hour} in '{input}' is outside 1-12")]
    HourOutOfRange { input: String, hour: u16 },
    #[error("minute {minute} in '{input}' is outside 0-59")]
    MinuteOutOfRange { input: String, minute: u16 },
}

/// Wall-clock time of day, stored as minutes since midnight.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimeOfDay {
    minutes: u16,
}

impl TimeOfDay {
    const fn at(hour: u16, minute: u16) -> Self {
        Self {
            minutes: hour * 60 + minute,
        }
    }

    /// Parses `H:MM AM` / `H:MM PM`.
    ///
    /// 12:00 AM is midnight (0 minutes) and 12:00 PM is noon (720); every
    /// other PM hour gets 12 added. 24-hour strings are rejected.
    pub fn parse_12h(input: &str) -> Result<Self, TimeParseError> {
        let trimmed = input.trim();
        let Some((clock, marker)) = trimmed.rsplit_once(char::is_whitespace) else {
            return Err(TimeParseError::MissingMarker(input.to_string()));
        };
        let pm = if marker.eq_ignore_ascii_case("AM") {
            false
        } else if marker.eq_ignore_ascii_case("PM") {
            true
        } else {
            return Err(TimeParseError::MissingMarker(input.to_string()));
        };

        let bad_clock = || TimeParseError::BadClock(input.to_string());
        let (h, m) = clock.trim().split_once(':').ok_or_else(bad_clock)?;
        let digits = |s: &str, max_len: usize| {
            !s.is_empty() && s.len() <= max_len && s.bytes().all(|b| b.is_ascii_digit())
        };
        if !digits(h, 2) || !digits(m, 2) || m.len() != 2 {
            return Err(bad_clock());
        }
        let hour: u16 = h.parse().map_err(|_| bad_clock())?;
        let minute: u16 = m.parse().map_err(|_| bad_clock())?;

        if !(1..=12).contains(&hour) {
            return Err(TimeParseError::HourOutOfRange {
                input: input.to_string(),
                hour,
            });
        }
        if minute > 59 {
            return Err(TimeParseError::MinuteOutOfRange {
                input: input.to_string(),
                minute,
            });
        }

        let hour24 = match (hour, pm) {
            (12, false) => 0,
            (12, true) => 12,
            (h, false) => h,
            (h, true) => h + 12,
        };
        Ok(Self::at(hour24, minute))
    }

    pub fn from_naive_time(t: NaiveTime) -> Self {
        // hour() < 24 and minute() < 60, so this always fits.
        Self::at(t.hour() as u16, t.minute() as u16)
    }

    pub fn minutes(self) -> u16 {
        self.minutes
    }
}

impl fmt::Display for TimeOfDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let h24 = self.minutes / 60;
        let m = self.minutes % 60;
        let (h12, marker) = match h24 {
            0 => (12, "AM"),
            1..=11 => (h24, "AM"),
            12 => (12, "PM"),
            _ => (h24 - 12, "PM"),
        };
        write!(f, "{h12}:{m:02} {marker}")
    }
}

impl FromStr for TimeOfDay {
    type Err = TimeParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse_12h(s)
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CatalogError {
    #[error("duplicate routine id '{0}'")]
    DuplicateId(String),
    #[error("routine '{id}' has an invalid time: {source}")]
    BadTime {
        id: String,
        #[source]
        source: TimeParseError,
    },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RoutineItem {
    pub id: String,
    pub time: TimeOfDay,
    pub activity: String,
    pub emoji: String,
    pub category: Category,
}

impl RoutineItem {
    pub fn new(
        id: &str,
        time: &str,
        activity: &str,
        emoji: &str,
        category: Category,
    ) -> Result<Self, CatalogError> {
        let time = TimeOfDay::parse_12h(time).map_err(|source| CatalogError::BadTime {
            id: id.to_string(),
            source,
        })?;
        Ok(Self {
            id: id.to_string(),
            time,
            activity: activity.to_string(),
            emoji: emoji.to_string(),
            category,
        })
    }
}

const BUILTIN: &[(&str, TimeOfDay, &str, &str, Category)] = &[
    ("1", TimeOfDay::at(5, 0), "Wake Up, Clean, Fresh & Run 🏃‍♂️", "☀️", Category::Morning),
    ("2", TimeOfDay::at(6, 0), "Gym Workout or Study 🏋️‍♂️", "💪", Category::Morning),
    ("3", TimeOfDay::at(7, 0), "Rest, Freshup & Tiffan 🍱", "🚿", Category::Morning),
    ("4", TimeOfDay::at(7, 45), "College Bus Waiting 🚌", "🕙", Category::Morning),
    ("5", TimeOfDay::at(8, 20), "College Hours 🎓", "📚", Category::Afternoon),
    ("6", TimeOfDay::at(16, 15), "Rest, Freshup & Snacks ☕", "🛋️", Category::Afternoon),
    ("7", TimeOfDay::at(18, 0), "Excellence Python Class 🐍", "💻", Category::Evening),
    ("8", TimeOfDay::at(19, 0), "Evening Study Session 📖", "✍️", Category::Evening),
    ("9", TimeOfDay::at(21, 30), "Dinner Time 🍽️", "🥘", Category::Night),
    ("10", TimeOfDay::at(22, 30), "Night Workout 💪", "🏃", Category::Night),
    ("11", TimeOfDay::at(23, 0), "Late Study / Other Work 🖋️", "🌙", Category::Night),
    ("12", TimeOfDay::at(0, 0), "Deep Sleep 💤", "🛌", Category::Night),
];

/// Ordered, immutable list of routine items. Ids are unique.
#[derive(Clone, Debug)]
pub struct Catalog {
    items: Vec<RoutineItem>,
}

impl Catalog {
    pub fn new(items: Vec<RoutineItem>) -> Result<Self, CatalogError> {
        let mut seen: HashSet<&str> = HashSet::new();
        for it in &items {
            if !seen.insert(it.id.as_str()) {
                return Err(CatalogError::DuplicateId(it.id.clone()));
            }
        }
        Ok(Self { items })
    }

    /// The fixed daily routine.
    pub fn builtin() -> Self {
        let items = BUILTIN
            .iter()
            .map(|&(id, time, activity, emoji, category)| RoutineItem {
                id: id.to_string(),
                time,
                activity: activity.to_string(),
                emoji: emoji.to_string(),
                category,
            })
            .collect();
        Self { items }
    }

    pub fn items(&self) -> &[RoutineItem] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&RoutineItem> {
        self.items.iter().find(|it| it.id == id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.get(id).is_some()
    }

    pub fn in_category(&self, category: Category) -> impl Iterator<Item = &RoutineItem> + '_ {
        self.items.iter().filter(move |it| it.category == category)
    }
}
