//! Client side of the solver demos: talks to a demo backend over HTTP, keeps
//! the rendered page in sync with the solver, and surfaces failures as
//! notifications.

pub mod color;
pub mod controller;
pub mod endpoints;
pub mod error;
pub mod notify;
pub mod render;
pub mod transport;
pub mod vdom;

pub use controller::{ControllerEvent, ControllerOptions, SolverPhase, ViewSyncController};
pub use endpoints::{Collection, DemoEndpoints, PollingProfile};
pub use error::RequestError;
pub use notify::Notification;
pub use render::{DemoView, RenderedPage};
pub use transport::{HttpTransport, Transport};
