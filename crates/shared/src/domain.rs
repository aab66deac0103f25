use std::{fmt, str::FromStr};

use chrono::NaiveTime;
use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

macro_rules! id_newtype {
    ($name:ident) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub struct $name(pub i64);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

id_newtype!(RoomId);
id_newtype!(TimeslotId);
id_newtype!(LessonId);
id_newtype!(FacilityId);
id_newtype!(ConsumerId);

/// Whether the remote optimizer is currently searching.
///
/// Backends report finer states such as `SOLVING_ACTIVE`, `SOLVING_SCHEDULED`
/// or `TERMINATED`; everything except `NOT_SOLVING` decodes as [`Solving`].
///
/// [`Solving`]: SolverStatus::Solving
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SolverStatus {
    #[default]
    NotSolving,
    Solving,
}

impl SolverStatus {
    pub fn is_solving(self) -> bool {
        self == SolverStatus::Solving
    }

    pub fn from_wire(raw: &str) -> Self {
        if raw == "NOT_SOLVING" {
            SolverStatus::NotSolving
        } else {
            SolverStatus::Solving
        }
    }
}

impl<'de> Deserialize<'de> for SolverStatus {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        Ok(SolverStatus::from_wire(&raw))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DayOfWeek {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
    Sunday,
}

impl fmt::Display for DayOfWeek {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DayOfWeek::Monday => "Monday",
            DayOfWeek::Tuesday => "Tuesday",
            DayOfWeek::Wednesday => "Wednesday",
            DayOfWeek::Thursday => "Thursday",
            DayOfWeek::Friday => "Friday",
            DayOfWeek::Saturday => "Saturday",
            DayOfWeek::Sunday => "Sunday",
        };
        f.write_str(name)
    }
}

impl DayOfWeek {
    pub const ALL: [DayOfWeek; 7] = [
        DayOfWeek::Monday,
        DayOfWeek::Tuesday,
        DayOfWeek::Wednesday,
        DayOfWeek::Thursday,
        DayOfWeek::Friday,
        DayOfWeek::Saturday,
        DayOfWeek::Sunday,
    ];
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown day of week '{0}'")]
pub struct ParseDayOfWeekError(pub String);

/// Accepts the display name or the wire name, case-insensitively.
impl FromStr for DayOfWeek {
    type Err = ParseDayOfWeekError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        DayOfWeek::ALL
            .into_iter()
            .find(|day| day.to_string().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| ParseDayOfWeekError(s.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Timeslot {
    pub id: TimeslotId,
    pub day_of_week: DayOfWeek,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
}

impl Timeslot {
    /// Row label used by every timetable grid, e.g. `Monday 08:30 - 09:30`.
    pub fn label(&self) -> String {
        format!(
            "{} {} - {}",
            self.day_of_week,
            self.start_time.format("%H:%M"),
            self.end_time.format("%H:%M")
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Room {
    pub id: RoomId,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Lesson {
    pub id: LessonId,
    pub subject: String,
    pub teacher: String,
    pub student_group: String,
    #[serde(default)]
    pub timeslot: Option<Timeslot>,
    #[serde(default)]
    pub room: Option<Room>,
}

impl Lesson {
    /// The solver assigns timeslot and room together. A lesson carrying only
    /// one of them is reported as unassigned.
    pub fn assignment(&self) -> Option<(&Timeslot, &Room)> {
        match (&self.timeslot, &self.room) {
            (Some(timeslot), Some(room)) => Some((timeslot, room)),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Facility {
    pub id: FacilityId,
    pub location: Location,
    pub setup_cost: i64,
    pub capacity: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Consumer {
    pub id: ConsumerId,
    pub location: Location,
    pub demand: i64,
    #[serde(default)]
    pub facility: Option<FacilityId>,
}
