use shared::{
    domain::{FacilityId, Location, SolverStatus},
    protocol::FacilityLocationView,
};

use super::{background, DemoView};
use crate::{
    color::ColorPicker,
    endpoints::{DemoEndpoints, PollingProfile},
    vdom::{el, Element, VNode},
};

pub const MAP_ID: &str = "map";
pub const FACILITY_TABLE_ID: &str = "facilities";
pub const SUMMARY_ID: &str = "summary";

const UNASSIGNED_COLOR: &str = "#999999";

fn facility_key(id: FacilityId) -> String {
    format!("facility-{id}")
}

fn located(element: Element, location: Location) -> Element {
    element
        .attr("data-lat", location.latitude.to_string())
        .attr("data-lon", location.longitude.to_string())
}

impl DemoView for FacilityLocationView {
    const NAME: &'static str = "facility location";

    fn default_endpoints() -> DemoEndpoints {
        DemoEndpoints::facility_location()
    }

    fn default_polling() -> PollingProfile {
        PollingProfile::facility_location()
    }

    fn solver_status(&self) -> SolverStatus {
        self.solver_status.unwrap_or_default()
    }

    fn score(&self) -> Option<&str> {
        self.score.as_deref()
    }

    fn render_content(&self, colors: &mut ColorPicker) -> VNode {
        el("div")
            .id("facilityLocation")
            .child(render_map(self, colors))
            .child(render_facility_table(self, colors))
            .child(render_summary(self))
            .into()
    }
}

fn render_map(view: &FacilityLocationView, colors: &mut ColorPicker) -> Element {
    let mut map = el("div").id(MAP_ID);
    if let (Some(south_west), Some(north_east)) = (view.south_west_corner, view.north_east_corner) {
        map = map
            .attr("data-bounds-south", south_west.latitude.to_string())
            .attr("data-bounds-west", south_west.longitude.to_string())
            .attr("data-bounds-north", north_east.latitude.to_string())
            .attr("data-bounds-east", north_east.longitude.to_string());
    }

    for facility in &view.facilities {
        let open = view.is_open(facility.id);
        let color = colors.pick(&facility_key(facility.id));
        map = map.child(
            located(el("div"), facility.location)
                .class(if open {
                    "marker facility open"
                } else {
                    "marker facility closed"
                })
                .attr("data-facility-id", facility.id.to_string())
                .attr("style", background(color)),
        );
    }

    for consumer in &view.consumers {
        let assigned = consumer.facility.and_then(|facility_id| {
            view.facilities
                .iter()
                .find(|facility| facility.id == facility_id)
        });
        let color = match assigned {
            Some(facility) => colors.pick(&facility_key(facility.id)).to_string(),
            None => UNASSIGNED_COLOR.to_string(),
        };
        map = map.child(
            located(el("div"), consumer.location)
                .class("marker consumer")
                .attr("data-consumer-id", consumer.id.to_string())
                .attr("style", format!("background-color: {color}")),
        );
        if let Some(facility) = assigned {
            map = map.child(
                el("div")
                    .class("line")
                    .attr("data-consumer-id", consumer.id.to_string())
                    .attr("data-facility-id", facility.id.to_string())
                    .attr("data-from-lat", consumer.location.latitude.to_string())
                    .attr("data-from-lon", consumer.location.longitude.to_string())
                    .attr("data-to-lat", facility.location.latitude.to_string())
                    .attr("data-to-lon", facility.location.longitude.to_string())
                    .attr("style", format!("border-color: {color}")),
            );
        }
    }
    map
}

fn usage_label(used: i64, capacity: i64) -> String {
    if capacity > 0 {
        format!("{used}/{capacity} ({}%)", used.saturating_mul(100) / capacity)
    } else {
        format!("{used}/{capacity} (n/a)")
    }
}

fn render_facility_table(view: &FacilityLocationView, colors: &mut ColorPicker) -> Element {
    let header = el("tr")
        .child(el("th").text("Facility"))
        .child(el("th").text("Setup cost"))
        .child(el("th").text("Usage"))
        .child(el("th").text("Status"));

    let rows: Vec<VNode> = view
        .facilities
        .iter()
        .map(|facility| {
            let used = view.used_capacity(facility.id);
            let status = if view.is_open(facility.id) {
                "open"
            } else {
                "closed"
            };
            el("tr")
                .attr("data-facility-id", facility.id.to_string())
                .child(
                    el("td")
                        .child(
                            el("span")
                                .class("swatch")
                                .attr("style", background(colors.pick(&facility_key(facility.id)))),
                        )
                        .text(format!("Facility {}", facility.id)),
                )
                .child(el("td").text(facility.setup_cost.to_string()))
                .child(
                    el("td")
                        .class(if used > facility.capacity {
                            "usage over-capacity"
                        } else {
                            "usage"
                        })
                        .text(usage_label(used, facility.capacity)),
                )
                .child(el("td").text(status))
                .into()
        })
        .collect();

    el("table")
        .id(FACILITY_TABLE_ID)
        .class("table")
        .child(el("thead").child(header))
        .child(el("tbody").children(rows))
}

fn render_summary(view: &FacilityLocationView) -> Element {
    let open = view
        .facilities
        .iter()
        .filter(|facility| view.is_open(facility.id))
        .count();
    let total_demand = view
        .consumers
        .iter()
        .fold(0i64, |sum, consumer| sum.saturating_add(consumer.demand));
    let assigned_demand = view
        .consumers
        .iter()
        .filter(|consumer| consumer.facility.is_some())
        .fold(0i64, |sum, consumer| sum.saturating_add(consumer.demand));

    el("div")
        .id(SUMMARY_ID)
        .child(el("p").class("open-facilities").text(format!(
            "Open facilities: {open} of {}",
            view.facilities.len()
        )))
        .child(el("p").class("assigned-demand").text(format!(
            "Assigned demand: {assigned_demand} of {total_demand}"
        )))
        .child(el("p").class("total-cost").text(format!(
            "Total cost: {}",
            view.total_cost.as_deref().unwrap_or("?")
        )))
}
