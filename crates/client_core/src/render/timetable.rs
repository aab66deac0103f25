use shared::{
    domain::{Lesson, Room, SolverStatus},
    protocol::TimeTableView,
};

use super::{background, delete_button, DemoView};
use crate::{
    color::ColorPicker,
    endpoints::{Collection, DemoEndpoints, PollingProfile},
    vdom::{el, Element, VNode},
};

pub const BY_ROOM_TABLE_ID: &str = "timeTableByRoom";
pub const BY_TEACHER_TABLE_ID: &str = "timeTableByTeacher";
pub const BY_STUDENT_GROUP_TABLE_ID: &str = "timeTableByStudentGroup";
pub const UNASSIGNED_ID: &str = "unassignedLessons";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Perspective {
    Room,
    Teacher,
    StudentGroup,
}

enum Column<'a> {
    Room(&'a Room),
    Named(String),
}

impl Column<'_> {
    fn contains(&self, perspective: Perspective, lesson: &Lesson) -> bool {
        match (self, perspective) {
            (Column::Room(room), _) => lesson
                .assignment()
                .is_some_and(|(_, assigned)| assigned.id == room.id),
            (Column::Named(name), Perspective::Teacher) => &lesson.teacher == name,
            (Column::Named(name), _) => &lesson.student_group == name,
        }
    }

    fn header(&self) -> Element {
        match self {
            Column::Room(room) => el("th")
                .class("column-header")
                .child(el("span").text(room.name.clone()))
                .child(delete_button(Collection::ROOMS.name(), room.id)),
            Column::Named(name) => el("th")
                .class("column-header")
                .child(el("span").text(name.clone())),
        }
    }
}

impl DemoView for TimeTableView {
    const NAME: &'static str = "timetable";

    fn default_endpoints() -> DemoEndpoints {
        DemoEndpoints::timetable()
    }

    fn default_polling() -> PollingProfile {
        PollingProfile::timetable()
    }

    fn solver_status(&self) -> SolverStatus {
        self.solver_status.unwrap_or_default()
    }

    fn score(&self) -> Option<&str> {
        self.score.as_deref()
    }

    fn render_content(&self, colors: &mut ColorPicker) -> VNode {
        // Colours follow lesson order so they do not shift between perspectives.
        for lesson in &self.lesson_list {
            colors.pick(&lesson.subject);
        }

        let unassigned: Vec<VNode> = self
            .unassigned_lessons()
            .map(|lesson| lesson_card(lesson, Perspective::Room, colors).into())
            .collect();

        el("div")
            .id("timetable")
            .child(el("h3").text("By room"))
            .child(render_grid(self, Perspective::Room, colors))
            .child(el("h3").text("By teacher"))
            .child(render_grid(self, Perspective::Teacher, colors))
            .child(el("h3").text("By student group"))
            .child(render_grid(self, Perspective::StudentGroup, colors))
            .child(el("h3").text("Unassigned lessons"))
            .child(
                el("div")
                    .id(UNASSIGNED_ID)
                    .class("card-columns")
                    .children(unassigned),
            )
            .into()
    }
}

fn columns(view: &TimeTableView, perspective: Perspective) -> Vec<Column<'_>> {
    match perspective {
        Perspective::Room => view.room_list.iter().map(Column::Room).collect(),
        Perspective::Teacher => distinct_in_order(view.lesson_list.iter().map(|l| &l.teacher))
            .into_iter()
            .map(Column::Named)
            .collect(),
        Perspective::StudentGroup => {
            distinct_in_order(view.lesson_list.iter().map(|l| &l.student_group))
                .into_iter()
                .map(Column::Named)
                .collect()
        }
    }
}

fn render_grid(view: &TimeTableView, perspective: Perspective, colors: &mut ColorPicker) -> Element {
    let table_id = match perspective {
        Perspective::Room => BY_ROOM_TABLE_ID,
        Perspective::Teacher => BY_TEACHER_TABLE_ID,
        Perspective::StudentGroup => BY_STUDENT_GROUP_TABLE_ID,
    };
    let columns = columns(view, perspective);

    let header_row = el("tr")
        .child(el("th").class("corner").text("Timeslot"))
        .children(columns.iter().map(|column| column.header().into()));

    let mut body = el("tbody");
    for timeslot in &view.timeslot_list {
        let mut row = el("tr").attr("data-timeslot-id", timeslot.id.to_string()).child(
            el("th")
                .class("row-header")
                .child(el("span").text(timeslot.label()))
                .child(delete_button(Collection::TIMESLOTS.name(), timeslot.id)),
        );
        for column in &columns {
            let cards: Vec<VNode> = view
                .lesson_list
                .iter()
                .filter(|lesson| {
                    lesson
                        .assignment()
                        .is_some_and(|(slot, _)| slot.id == timeslot.id)
                        && column.contains(perspective, lesson)
                })
                .map(|lesson| lesson_card(lesson, perspective, colors).into())
                .collect();
            row = row.child(el("td").children(cards));
        }
        body = body.child(row);
    }

    el("table")
        .id(table_id)
        .class("table table-bordered")
        .child(el("thead").child(header_row))
        .child(body)
}

fn lesson_card(lesson: &Lesson, perspective: Perspective, colors: &mut ColorPicker) -> Element {
    let room = lesson
        .assignment()
        .map(|(_, room)| room.name.clone())
        .unwrap_or_default();
    let details: Vec<String> = match perspective {
        Perspective::Room => vec![
            format!("by {}", lesson.teacher),
            lesson.student_group.clone(),
        ],
        Perspective::Teacher => vec![room, lesson.student_group.clone()],
        Perspective::StudentGroup => vec![room, format!("by {}", lesson.teacher)],
    };

    let mut card = el("div")
        .class("card lesson")
        .attr("data-lesson-id", lesson.id.to_string())
        .attr("style", background(colors.pick(&lesson.subject)))
        .child(el("h5").class("card-title").text(lesson.subject.clone()));
    for detail in details.into_iter().filter(|detail| !detail.is_empty()) {
        card = card.child(el("p").class("card-text").text(detail));
    }
    card.child(delete_button(Collection::LESSONS.name(), lesson.id))
}

fn distinct_in_order<'a>(values: impl Iterator<Item = &'a String>) -> Vec<String> {
    let mut seen = Vec::new();
    for value in values {
        if !seen.contains(value) {
            seen.push(value.clone());
        }
    }
    seen
}
