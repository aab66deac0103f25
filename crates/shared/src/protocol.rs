use chrono::NaiveTime;
use serde::{Deserialize, Serialize};

use crate::domain::{
    Consumer, DayOfWeek, Facility, FacilityId, Lesson, Location, Room, SolverStatus, Timeslot,
};

/// Snapshot returned by `GET /timeTable`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeTableView {
    #[serde(default)]
    pub timeslot_list: Vec<Timeslot>,
    #[serde(default)]
    pub room_list: Vec<Room>,
    #[serde(default)]
    pub lesson_list: Vec<Lesson>,
    #[serde(default)]
    pub score: Option<String>,
    #[serde(default)]
    pub solver_status: Option<SolverStatus>,
}

impl TimeTableView {
    pub fn unassigned_lessons(&self) -> impl Iterator<Item = &Lesson> {
        self.lesson_list
            .iter()
            .filter(|lesson| lesson.assignment().is_none())
    }
}

/// Snapshot returned by `GET /flp/status`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FacilityLocationView {
    #[serde(default)]
    pub facilities: Vec<Facility>,
    #[serde(default)]
    pub consumers: Vec<Consumer>,
    #[serde(default)]
    pub score: Option<String>,
    #[serde(default)]
    pub solver_status: Option<SolverStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub south_west_corner: Option<Location>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub north_east_corner: Option<Location>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_cost: Option<String>,
}

impl FacilityLocationView {
    pub fn used_capacity(&self, facility_id: FacilityId) -> i64 {
        self.consumers
            .iter()
            .filter(|consumer| consumer.facility == Some(facility_id))
            .fold(0, |used, consumer| used.saturating_add(consumer.demand))
    }

    pub fn is_open(&self, facility_id: FacilityId) -> bool {
        self.consumers
            .iter()
            .any(|consumer| consumer.facility == Some(facility_id))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewRoom {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTimeslot {
    pub day_of_week: DayOfWeek,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewLesson {
    pub subject: String,
    pub teacher: String,
    pub student_group: String,
}

#[cfg(test)]
#[path = "tests/protocol_tests.rs"]
mod tests;
