//! Polling view-sync controller: one per page.

use std::{
    fmt::Display,
    sync::{Arc, Weak},
    time::Duration,
};

use serde::Serialize;
use shared::protocol::{NewLesson, NewRoom, NewTimeslot, TimeTableView};
use tokio::{
    sync::{broadcast, Mutex},
    task::JoinHandle,
    time::{interval_at, Instant, MissedTickBehavior},
};
use tracing::{debug, info, warn};

use crate::{
    color::ColorPicker,
    endpoints::{Collection, DemoEndpoints, PollingProfile},
    error::RequestError,
    notify::{Notification, NotificationCenter, DEFAULT_NOTIFICATION_TTL},
    render::{render_notifications, render_page, DemoView, RenderedPage},
    transport::Transport,
    vdom::VNode,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolverPhase {
    Idle,
    Solving,
}

#[derive(Debug, Clone)]
pub enum ControllerEvent {
    ViewRendered(Arc<RenderedPage>),
    PhaseChanged(SolverPhase),
    AutoRefreshExpired,
    Notification(Notification),
}

#[derive(Debug, Clone)]
pub struct ControllerOptions {
    pub polling: PollingProfile,
    pub notification_ttl: Duration,
}

impl ControllerOptions {
    pub fn new(polling: PollingProfile) -> Self {
        Self {
            polling,
            notification_ttl: DEFAULT_NOTIFICATION_TTL,
        }
    }

    pub fn with_notification_ttl(mut self, ttl: Duration) -> Self {
        self.notification_ttl = ttl;
        self
    }
}

struct AutoRefresh {
    generation: u64,
    task: JoinHandle<()>,
}

struct ControllerState<V> {
    view: Option<V>,
    page: Option<Arc<RenderedPage>>,
    phase: SolverPhase,
    auto_refresh: Option<AutoRefresh>,
    ticks_remaining: u32,
    timer_generation: u64,
    colors: ColorPicker,
    notifications: NotificationCenter,
}

pub struct ViewSyncController<V: DemoView> {
    transport: Arc<dyn Transport>,
    endpoints: DemoEndpoints,
    polling: PollingProfile,
    inner: Mutex<ControllerState<V>>,
    events: broadcast::Sender<ControllerEvent>,
}

impl<V: DemoView> ViewSyncController<V> {
    pub fn new(
        transport: Arc<dyn Transport>,
        endpoints: DemoEndpoints,
        options: ControllerOptions,
    ) -> Arc<Self> {
        let (events, _) = broadcast::channel(256);
        Arc::new(Self {
            transport,
            endpoints,
            polling: options.polling,
            inner: Mutex::new(ControllerState {
                view: None,
                page: None,
                phase: SolverPhase::Idle,
                auto_refresh: None,
                ticks_remaining: 0,
                timer_generation: 0,
                colors: ColorPicker::default(),
                notifications: NotificationCenter::new(options.notification_ttl),
            }),
            events,
        })
    }

    /// Controller wired to the demo's standard endpoints and polling profile.
    pub fn for_demo(transport: Arc<dyn Transport>) -> Arc<Self> {
        Self::new(
            transport,
            V::default_endpoints(),
            ControllerOptions::new(V::default_polling()),
        )
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<ControllerEvent> {
        self.events.subscribe()
    }

    pub fn polling(&self) -> PollingProfile {
        self.polling
    }

    pub async fn phase(&self) -> SolverPhase {
        self.inner.lock().await.phase
    }

    pub async fn view(&self) -> Option<V> {
        self.inner.lock().await.view.clone()
    }

    pub async fn rendered_page(&self) -> Option<Arc<RenderedPage>> {
        self.inner.lock().await.page.clone()
    }

    pub async fn auto_refresh_active(&self) -> bool {
        self.inner.lock().await.auto_refresh.is_some()
    }

    pub async fn ticks_remaining(&self) -> u32 {
        self.inner.lock().await.ticks_remaining
    }

    pub async fn notifications(&self) -> Vec<Notification> {
        self.inner.lock().await.notifications.active().to_vec()
    }

    pub async fn notification_panel(&self) -> VNode {
        let mut guard = self.inner.lock().await;
        render_notifications(guard.notifications.active())
    }

    pub async fn dismiss_notification(&self, id: u64) -> bool {
        self.inner.lock().await.notifications.dismiss(id)
    }

    /// Fetches the status endpoint and replaces the rendered page. On failure
    /// the previous page stays in place and a notification is raised.
    pub async fn refresh(&self) -> bool {
        match self.fetch_view().await {
            Ok(view) => {
                let page = {
                    let mut guard = self.inner.lock().await;
                    let solving = view.solver_status().is_solving();
                    let state = &mut *guard;
                    let page = Arc::new(render_page(&view, &mut state.colors, solving));
                    state.view = Some(view);
                    state.page = Some(Arc::clone(&page));
                    page
                };
                debug!(demo = V::NAME, "view refreshed");
                self.emit(ControllerEvent::ViewRendered(page));
                true
            }
            Err(err) => {
                self.report(format!("Getting the {} has failed.", V::NAME), err)
                    .await;
                false
            }
        }
    }

    /// Asks the backend to start solving and polls the view on a bounded
    /// timer. Calling it while a timer runs only resets the tick budget.
    pub async fn solve(self: &Arc<Self>) -> bool {
        if let Err(err) = self
            .transport
            .post_json(&self.endpoints.solve, None)
            .await
        {
            self.report("Start solving failed.", err).await;
            return false;
        }

        {
            let mut guard = self.inner.lock().await;
            guard.ticks_remaining = self.polling.ticks();
            if guard.auto_refresh.is_none() {
                guard.timer_generation += 1;
                let generation = guard.timer_generation;
                let task = self.spawn_auto_refresh(generation);
                guard.auto_refresh = Some(AutoRefresh { generation, task });
            }
            self.enter_phase(&mut guard, SolverPhase::Solving);
        }

        info!(
            demo = V::NAME,
            interval_ms = self.polling.interval().as_millis() as u64,
            ticks = self.polling.ticks(),
            "solving started"
        );
        true
    }

    pub async fn stop_solving(&self) -> bool {
        if let Err(err) = self
            .transport
            .post_json(&self.endpoints.stop_solving, None)
            .await
        {
            self.report("Stop solving failed.", err).await;
            return false;
        }

        {
            let mut guard = self.inner.lock().await;
            if let Some(timer) = guard.auto_refresh.take() {
                timer.task.abort();
            }
            guard.ticks_remaining = 0;
            self.enter_phase(&mut guard, SolverPhase::Idle);
        }

        info!(demo = V::NAME, "solving stopped");
        self.refresh().await;
        true
    }

    pub async fn add_entity<T>(&self, collection: Collection, payload: &T) -> bool
    where
        T: Serialize + Sync,
    {
        let title = format!("Adding {} failed.", collection.singular);
        let body = match serde_json::to_value(payload) {
            Ok(body) => body,
            Err(source) => {
                let err = RequestError::Encode {
                    url: collection.path.to_string(),
                    source,
                };
                self.report(title, err).await;
                return false;
            }
        };

        if let Err(err) = self.transport.post_json(collection.path, Some(&body)).await {
            self.report(title, err).await;
            return false;
        }
        info!(collection = collection.name(), "entity added");
        self.refresh().await;
        true
    }

    pub async fn delete_entity(&self, collection: Collection, id: impl Display) -> bool {
        let path = collection.item_path(&id);
        if let Err(err) = self.transport.delete(&path).await {
            self.report(format!("Deleting {} ({id}) failed.", collection.singular), err)
                .await;
            return false;
        }
        info!(collection = collection.name(), %id, "entity deleted");
        self.refresh().await;
        true
    }

    async fn fetch_view(&self) -> Result<V, RequestError> {
        let value = self.transport.get_json(&self.endpoints.status).await?;
        serde_json::from_value(value).map_err(|source| RequestError::Decode {
            url: self.endpoints.status.clone(),
            source,
        })
    }

    fn spawn_auto_refresh(self: &Arc<Self>, generation: u64) -> JoinHandle<()> {
        let controller: Weak<Self> = Arc::downgrade(self);
        let period = self.polling.interval();
        tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let Some(controller) = controller.upgrade() else {
                    break;
                };
                if !controller.auto_refresh_tick(generation).await {
                    break;
                }
            }
        })
    }

    /// Returns whether the timer should keep running.
    async fn auto_refresh_tick(&self, generation: u64) -> bool {
        if !self.is_current_timer(generation).await {
            return false;
        }

        // A failed refresh still consumes a tick.
        self.refresh().await;

        let mut guard = self.inner.lock().await;
        if guard.auto_refresh.as_ref().map(|timer| timer.generation) != Some(generation) {
            return false;
        }
        guard.ticks_remaining = guard.ticks_remaining.saturating_sub(1);
        if guard.ticks_remaining > 0 {
            return true;
        }

        guard.auto_refresh = None;
        self.emit(ControllerEvent::AutoRefreshExpired);
        self.enter_phase(&mut guard, SolverPhase::Idle);
        info!(demo = V::NAME, "auto-refresh budget exhausted");
        false
    }

    async fn is_current_timer(&self, generation: u64) -> bool {
        self.inner
            .lock()
            .await
            .auto_refresh
            .as_ref()
            .is_some_and(|timer| timer.generation == generation)
    }

    /// Also redraws the solve/stop controls of the current page so they
    /// match the new phase until the next refresh.
    fn enter_phase(&self, state: &mut ControllerState<V>, phase: SolverPhase) {
        if state.phase == phase {
            return;
        }
        state.phase = phase;
        if let Some(view) = &state.view {
            let page = Arc::new(render_page(
                view,
                &mut state.colors,
                phase == SolverPhase::Solving,
            ));
            state.page = Some(Arc::clone(&page));
            self.emit(ControllerEvent::ViewRendered(page));
        }
        self.emit(ControllerEvent::PhaseChanged(phase));
    }

    async fn report(&self, title: impl Into<String>, err: RequestError) {
        let title = title.into();
        warn!(demo = V::NAME, %title, error = %err, "request failed");
        let notification = {
            let mut guard = self.inner.lock().await;
            guard.notifications.raise(title, &err)
        };
        self.emit(ControllerEvent::Notification(notification));
    }

    fn emit(&self, event: ControllerEvent) {
        let _ = self.events.send(event);
    }
}

impl ViewSyncController<TimeTableView> {
    pub async fn add_room(&self, room: &NewRoom) -> bool {
        self.add_entity(Collection::ROOMS, room).await
    }

    pub async fn add_timeslot(&self, timeslot: &NewTimeslot) -> bool {
        self.add_entity(Collection::TIMESLOTS, timeslot).await
    }

    pub async fn add_lesson(&self, lesson: &NewLesson) -> bool {
        self.add_entity(Collection::LESSONS, lesson).await
    }
}

impl<V: DemoView> Drop for ViewSyncController<V> {
    fn drop(&mut self) {
        if let Some(timer) = self.inner.get_mut().auto_refresh.take() {
            timer.task.abort();
        }
    }
}

#[cfg(test)]
#[path = "tests/controller_tests.rs"]
mod tests;
