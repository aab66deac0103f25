//! Typed renderers from solution views to [`VNode`] trees.

use serde::de::DeserializeOwned;
use shared::domain::SolverStatus;

use crate::{
    color::ColorPicker,
    endpoints::{DemoEndpoints, PollingProfile},
    notify::Notification,
    vdom::{el, Element, VNode},
};

pub mod facility;
pub mod timetable;

pub const SOLVE_BUTTON_ID: &str = "solveButton";
pub const STOP_SOLVING_BUTTON_ID: &str = "stopSolvingButton";
pub const SCORE_ID: &str = "score";
pub const NOTIFICATION_PANEL_ID: &str = "notificationPanel";

/// A server snapshot one demo page knows how to draw.
pub trait DemoView: DeserializeOwned + Clone + Send + Sync + 'static {
    /// Lower-case noun used in notification titles, e.g. "timetable".
    const NAME: &'static str;

    fn default_endpoints() -> DemoEndpoints;
    fn default_polling() -> PollingProfile;
    fn solver_status(&self) -> SolverStatus;
    fn score(&self) -> Option<&str>;
    fn render_content(&self, colors: &mut ColorPicker) -> VNode;
}

/// The whole page for one snapshot. Replaced wholesale on every refresh.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedPage {
    root: VNode,
}

impl RenderedPage {
    pub fn root(&self) -> &VNode {
        &self.root
    }

    pub fn to_html(&self) -> String {
        self.root.to_html()
    }

    pub fn score_text(&self) -> String {
        self.root
            .find_by_id(SCORE_ID)
            .map(Element::text_content)
            .unwrap_or_default()
    }

    pub fn solve_button_visible(&self) -> bool {
        self.control_visible(SOLVE_BUTTON_ID)
    }

    pub fn stop_button_visible(&self) -> bool {
        self.control_visible(STOP_SOLVING_BUTTON_ID)
    }

    fn control_visible(&self, id: &str) -> bool {
        self.root
            .find_by_id(id)
            .map(|button| !button.has_flag("hidden"))
            .unwrap_or(false)
    }

    /// Header text of every column of the table with `table_id`, without the
    /// leading "Timeslot" corner cell.
    pub fn column_headers(&self, table_id: &str) -> Vec<String> {
        let Some(table) = self.root.find_by_id(table_id) else {
            return Vec::new();
        };
        VNode::from(table.clone())
            .find_all_by_class("column-header")
            .into_iter()
            .map(|header| {
                header
                    .children
                    .first()
                    .map(VNode::text_content)
                    .unwrap_or_default()
            })
            .collect()
    }

    /// One-line status for terminal output.
    pub fn summary(&self) -> String {
        let state = if self.stop_button_visible() {
            "solving"
        } else {
            "idle"
        };
        format!("{} ({state})", self.score_text())
    }
}

pub fn render_page<V: DemoView>(view: &V, colors: &mut ColorPicker, solving: bool) -> RenderedPage {
    let score = format!("Score: {}", view.score().unwrap_or("?"));
    let root = el("div")
        .id("demo")
        .attr("data-demo", V::NAME)
        .child(
            el("div")
                .id("status")
                .child(el("span").id(SCORE_ID).text(score))
                .child(render_controls(solving)),
        )
        .child(view.render_content(colors));
    RenderedPage { root: root.into() }
}

fn render_controls(solving: bool) -> Element {
    el("div")
        .class("solver-controls")
        .child(
            el("button")
                .id(SOLVE_BUTTON_ID)
                .attr("type", "button")
                .flag("hidden", solving)
                .text("Solve"),
        )
        .child(
            el("button")
                .id(STOP_SOLVING_BUTTON_ID)
                .attr("type", "button")
                .flag("hidden", !solving)
                .text("Stop solving"),
        )
}

pub fn render_notifications(notifications: &[Notification]) -> VNode {
    let toasts = notifications.iter().map(|notification| {
        let mut body = el("div")
            .class("toast-body")
            .child(el("p").text(notification.title.clone()))
            .child(el("pre").child(el("code").text(notification.message.clone())));
        if let Some(stack) = &notification.stack {
            body = body.child(el("pre").class("stack").child(el("code").text(stack.clone())));
        }
        el("div")
            .class("toast")
            .attr("role", "alert")
            .attr("data-notification-id", notification.id.to_string())
            .attr("data-raised-at", notification.raised_at.to_rfc3339())
            .child(
                el("div")
                    .class("toast-header bg-danger")
                    .child(el("strong").text("Error"))
                    .child(
                        el("button")
                            .class("btn-close")
                            .attr("type", "button")
                            .attr("data-dismiss", notification.id.to_string())
                            .attr("aria-label", "Close"),
                    ),
            )
            .child(body)
            .into()
    });
    el("div")
        .id(NOTIFICATION_PANEL_ID)
        .children(toasts)
        .into()
}

/// Small helper shared by the demo renderers.
pub(crate) fn delete_button(collection: &str, id: impl ToString) -> Element {
    el("button")
        .class("btn-delete")
        .attr("type", "button")
        .attr("data-collection", collection)
        .attr("data-id", id.to_string())
        .attr("aria-label", "Delete")
        .text("\u{2715}")
}

pub(crate) fn background(color: crate::color::Rgb) -> String {
    format!("background-color: {color}")
}

#[cfg(test)]
#[path = "../tests/render_tests.rs"]
mod tests;
