use std::time::Duration;

/// Paths of the solver lifecycle endpoints for one demo.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DemoEndpoints {
    pub status: String,
    pub solve: String,
    pub stop_solving: String,
}

impl DemoEndpoints {
    pub fn new(
        status: impl Into<String>,
        solve: impl Into<String>,
        stop_solving: impl Into<String>,
    ) -> Self {
        Self {
            status: status.into(),
            solve: solve.into(),
            stop_solving: stop_solving.into(),
        }
    }

    pub fn timetable() -> Self {
        Self::new("/timeTable", "/timeTable/solve", "/timeTable/stopSolving")
    }

    pub fn facility_location() -> Self {
        Self::new("/flp/status", "/flp/solve", "/flp/stopSolving")
    }
}

/// A CRUD collection of problem facts on the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Collection {
    pub path: &'static str,
    pub singular: &'static str,
}

impl Collection {
    pub const ROOMS: Collection = Collection {
        path: "/rooms",
        singular: "room",
    };
    pub const TIMESLOTS: Collection = Collection {
        path: "/timeslots",
        singular: "timeslot",
    };
    pub const LESSONS: Collection = Collection {
        path: "/lessons",
        singular: "lesson",
    };

    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim_start_matches('/') {
            "rooms" | "room" => Some(Self::ROOMS),
            "timeslots" | "timeslot" => Some(Self::TIMESLOTS),
            "lessons" | "lesson" => Some(Self::LESSONS),
            _ => None,
        }
    }

    /// Name used in `data-collection` attributes of delete buttons.
    pub fn name(&self) -> &'static str {
        self.path.trim_start_matches('/')
    }

    pub fn item_path(&self, id: impl std::fmt::Display) -> String {
        format!("{}/{id}", self.path)
    }
}

/// Bounded auto-refresh schedule started by a successful solve.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollingProfile {
    interval: Duration,
    ticks: u32,
}

impl PollingProfile {
    /// At least one tick is always scheduled, never closer than 1 ms apart.
    pub fn new(interval: Duration, ticks: u32) -> Self {
        Self {
            interval: interval.max(Duration::from_millis(1)),
            ticks: ticks.max(1),
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn ticks(&self) -> u32 {
        self.ticks
    }

    pub fn timetable() -> Self {
        Self::new(Duration::from_secs(2), 16)
    }

    pub fn facility_location() -> Self {
        Self::new(Duration::from_millis(500), 300)
    }
}
