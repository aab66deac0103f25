use super::*;
use crate::{render::timetable::BY_ROOM_TABLE_ID, transport::HttpTransport, vdom::Element};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get, post},
    Json, Router,
};
use chrono::NaiveTime;
use shared::{
    domain::{DayOfWeek, Lesson, LessonId, Room, RoomId, SolverStatus, Timeslot, TimeslotId},
    error::ApiErrorBody,
    protocol::FacilityLocationView,
};
use tokio::net::TcpListener;

#[derive(Clone)]
enum Failure {
    Json(StatusCode, ApiErrorBody),
    Raw(StatusCode, &'static str),
}

impl IntoResponse for Failure {
    fn into_response(self) -> Response {
        match self {
            Failure::Json(status, body) => (status, Json(body)).into_response(),
            Failure::Raw(status, body) => (status, body).into_response(),
        }
    }
}

#[derive(Default)]
struct FakeState {
    view: TimeTableView,
    next_id: i64,
    status_calls: usize,
    solve_calls: usize,
    stop_calls: usize,
    status_failure: Option<Failure>,
    solve_failure: Option<Failure>,
}

#[derive(Clone, Default)]
struct FakeBackend {
    state: Arc<Mutex<FakeState>>,
}

impl FakeBackend {
    fn with_view(view: TimeTableView) -> Self {
        let backend = Self::default();
        {
            let mut state = backend.state.try_lock().expect("fresh state");
            state.view = view;
            state.next_id = 100;
        }
        backend
    }
}

async fn fake_status(State(backend): State<FakeBackend>) -> Result<Json<TimeTableView>, Failure> {
    let mut state = backend.state.lock().await;
    state.status_calls += 1;
    if let Some(failure) = state.status_failure.clone() {
        return Err(failure);
    }
    Ok(Json(state.view.clone()))
}

async fn fake_solve(State(backend): State<FakeBackend>) -> Result<StatusCode, Failure> {
    let mut state = backend.state.lock().await;
    state.solve_calls += 1;
    if let Some(failure) = state.solve_failure.clone() {
        return Err(failure);
    }
    state.view.solver_status = Some(SolverStatus::Solving);
    Ok(StatusCode::OK)
}

async fn fake_stop(State(backend): State<FakeBackend>) -> StatusCode {
    let mut state = backend.state.lock().await;
    state.stop_calls += 1;
    state.view.solver_status = Some(SolverStatus::NotSolving);
    StatusCode::OK
}

async fn fake_add_room(
    State(backend): State<FakeBackend>,
    Json(room): Json<NewRoom>,
) -> Result<Json<Room>, Failure> {
    if room.name.trim().is_empty() {
        return Err(Failure::Json(
            StatusCode::BAD_REQUEST,
            ApiErrorBody::new("Room name must not be blank"),
        ));
    }
    let mut state = backend.state.lock().await;
    state.next_id += 1;
    let room = Room {
        id: RoomId(state.next_id),
        name: room.name,
    };
    state.view.room_list.push(room.clone());
    Ok(Json(room))
}

async fn fake_delete_room(
    State(backend): State<FakeBackend>,
    Path(id): Path<i64>,
) -> Result<StatusCode, Failure> {
    let mut state = backend.state.lock().await;
    let before = state.view.room_list.len();
    state.view.room_list.retain(|room| room.id != RoomId(id));
    if state.view.room_list.len() == before {
        return Err(Failure::Json(
            StatusCode::NOT_FOUND,
            ApiErrorBody::new(format!("No room with id {id}"))
                .with_stack("at RoomResource.delete(RoomResource.java:42)"),
        ));
    }
    Ok(StatusCode::NO_CONTENT)
}

async fn fake_add_lesson(
    State(backend): State<FakeBackend>,
    Json(lesson): Json<NewLesson>,
) -> Json<Lesson> {
    let mut state = backend.state.lock().await;
    state.next_id += 1;
    let lesson = Lesson {
        id: LessonId(state.next_id),
        subject: lesson.subject,
        teacher: lesson.teacher,
        student_group: lesson.student_group,
        timeslot: None,
        room: None,
    };
    state.view.lesson_list.push(lesson.clone());
    Json(lesson)
}

async fn fake_delete_lesson(
    State(backend): State<FakeBackend>,
    Path(id): Path<i64>,
) -> Result<StatusCode, Failure> {
    let mut state = backend.state.lock().await;
    let before = state.view.lesson_list.len();
    state.view.lesson_list.retain(|lesson| lesson.id != LessonId(id));
    if state.view.lesson_list.len() == before {
        return Err(Failure::Json(
            StatusCode::NOT_FOUND,
            ApiErrorBody {
                message: None,
                details: Some(format!("No lesson with id {id}")),
                stack: None,
            },
        ));
    }
    Ok(StatusCode::NO_CONTENT)
}

async fn spawn_backend(backend: FakeBackend) -> String {
    std::env::set_var("NO_PROXY", "127.0.0.1,localhost");
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    let app = Router::new()
        .route("/timeTable", get(fake_status))
        .route("/timeTable/solve", post(fake_solve))
        .route("/timeTable/stopSolving", post(fake_stop))
        .route("/rooms", post(fake_add_room))
        .route("/rooms/:id", delete(fake_delete_room))
        .route("/lessons", post(fake_add_lesson))
        .route("/lessons/:id", delete(fake_delete_lesson))
        .with_state(backend);
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    format!("http://{addr}")
}

fn monday(hour: u32) -> Timeslot {
    Timeslot {
        id: TimeslotId(i64::from(hour)),
        day_of_week: DayOfWeek::Monday,
        start_time: NaiveTime::from_hms_opt(hour, 30, 0).expect("time"),
        end_time: NaiveTime::from_hms_opt(hour + 1, 30, 0).expect("time"),
    }
}

fn sample_view(status: SolverStatus) -> TimeTableView {
    let room_a = Room {
        id: RoomId(1),
        name: "Room X".to_string(),
    };
    let room_b = Room {
        id: RoomId(2),
        name: "Room Y".to_string(),
    };
    TimeTableView {
        timeslot_list: vec![monday(8), monday(9)],
        room_list: vec![room_a.clone(), room_b],
        lesson_list: vec![
            Lesson {
                id: LessonId(10),
                subject: "Math".to_string(),
                teacher: "A. Turing".to_string(),
                student_group: "9th grade".to_string(),
                timeslot: Some(monday(8)),
                room: Some(room_a),
            },
            Lesson {
                id: LessonId(11),
                subject: "Chemistry".to_string(),
                teacher: "M. Curie".to_string(),
                student_group: "9th grade".to_string(),
                timeslot: None,
                room: None,
            },
        ],
        score: Some("0hard/-1soft".to_string()),
        solver_status: Some(status),
    }
}

fn controller_for(
    server_url: &str,
    options: ControllerOptions,
) -> Arc<ViewSyncController<TimeTableView>> {
    let transport =
        HttpTransport::new(server_url, Duration::from_secs(5)).expect("transport");
    ViewSyncController::new(Arc::new(transport), DemoEndpoints::timetable(), options)
}

fn slow_polling() -> ControllerOptions {
    ControllerOptions::new(PollingProfile::new(Duration::from_secs(60), 100))
}

async fn wait_for_event(
    events: &mut broadcast::Receiver<ControllerEvent>,
    matches: impl Fn(&ControllerEvent) -> bool,
) {
    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            match events.recv().await {
                Ok(event) if matches(&event) => break,
                Ok(_) | Err(broadcast::error::RecvError::Lagged(_)) => continue,
                Err(err) => panic!("event stream closed: {err}"),
            }
        }
    })
    .await
    .expect("timed out waiting for controller event");
}

#[tokio::test]
async fn refresh_renders_controls_from_solver_status() {
    let backend = FakeBackend::with_view(sample_view(SolverStatus::Solving));
    let server_url = spawn_backend(backend.clone()).await;
    let controller = controller_for(&server_url, slow_polling());

    assert!(controller.refresh().await);
    let page = controller.rendered_page().await.expect("page");
    assert!(!page.solve_button_visible());
    assert!(page.stop_button_visible());
    assert_eq!(page.score_text(), "Score: 0hard/-1soft");

    backend.state.lock().await.view.solver_status = Some(SolverStatus::NotSolving);
    assert!(controller.refresh().await);
    let page = controller.rendered_page().await.expect("page");
    assert!(page.solve_button_visible());
    assert!(!page.stop_button_visible());
}

#[tokio::test]
async fn refresh_failure_keeps_previous_page_and_notifies() {
    let backend = FakeBackend::with_view(sample_view(SolverStatus::NotSolving));
    let server_url = spawn_backend(backend.clone()).await;
    let controller = controller_for(&server_url, slow_polling());

    assert!(controller.refresh().await);
    let before = controller.rendered_page().await.expect("page");

    backend.state.lock().await.status_failure = Some(Failure::Json(
        StatusCode::INTERNAL_SERVER_ERROR,
        ApiErrorBody {
            message: None,
            details: Some("Solver crashed".to_string()),
            stack: Some("at TimeTableResource.getTimeTable".to_string()),
        },
    ));
    assert!(!controller.refresh().await);

    let after = controller.rendered_page().await.expect("page");
    assert_eq!(*before, *after);

    let notifications = controller.notifications().await;
    assert_eq!(notifications.len(), 1);
    assert_eq!(notifications[0].title, "Getting the timetable has failed.");
    assert_eq!(notifications[0].message, "Solver crashed");
    assert_eq!(
        notifications[0].stack.as_deref(),
        Some("at TimeTableResource.getTimeTable")
    );
}

#[tokio::test]
async fn malformed_error_body_falls_back_to_status_line() {
    let backend = FakeBackend::with_view(sample_view(SolverStatus::NotSolving));
    backend.state.lock().await.status_failure =
        Some(Failure::Raw(StatusCode::BAD_GATEWAY, "<html>proxy error</html>"));
    let server_url = spawn_backend(backend).await;
    let controller = controller_for(&server_url, slow_polling());

    assert!(!controller.refresh().await);
    assert!(controller.rendered_page().await.is_none());

    let notifications = controller.notifications().await;
    assert_eq!(notifications.len(), 1);
    assert_eq!(notifications[0].message, "502: Bad Gateway");
    assert_eq!(notifications[0].stack, None);
}

#[tokio::test]
async fn unreachable_backend_is_reported_not_propagated() {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    drop(listener);

    std::env::set_var("NO_PROXY", "127.0.0.1,localhost");
    let controller = controller_for(&format!("http://{addr}"), slow_polling());
    let mut events = controller.subscribe_events();

    assert!(!controller.refresh().await);
    wait_for_event(&mut events, |event| {
        matches!(event, ControllerEvent::Notification(_))
    })
    .await;

    let notifications = controller.notifications().await;
    assert_eq!(notifications.len(), 1);
    assert!(!notifications[0].message.is_empty());
    assert_eq!(controller.phase().await, SolverPhase::Idle);
}

#[tokio::test]
async fn repeated_solve_keeps_a_single_timer() {
    let backend = FakeBackend::with_view(sample_view(SolverStatus::NotSolving));
    let server_url = spawn_backend(backend.clone()).await;
    let controller = controller_for(&server_url, slow_polling());

    assert!(controller.solve().await);
    assert!(controller.solve().await);
    assert!(controller.solve().await);

    {
        let guard = controller.inner.lock().await;
        assert_eq!(guard.timer_generation, 1);
        assert!(guard.auto_refresh.is_some());
        assert_eq!(guard.ticks_remaining, 100);
        assert_eq!(guard.phase, SolverPhase::Solving);
    }
    assert_eq!(backend.state.lock().await.solve_calls, 3);
}

#[tokio::test]
async fn stop_solving_clears_timer_and_resets_ticks() {
    let backend = FakeBackend::with_view(sample_view(SolverStatus::NotSolving));
    let server_url = spawn_backend(backend.clone()).await;
    let controller = controller_for(&server_url, slow_polling());

    assert!(controller.solve().await);
    assert!(controller.auto_refresh_active().await);

    assert!(controller.stop_solving().await);
    assert!(!controller.auto_refresh_active().await);
    assert_eq!(controller.ticks_remaining().await, 0);
    assert_eq!(controller.phase().await, SolverPhase::Idle);

    // Stopping refreshes the page from the now idle backend.
    let page = controller.rendered_page().await.expect("page");
    assert!(page.solve_button_visible());
    assert!(!page.stop_button_visible());
    assert_eq!(backend.state.lock().await.stop_calls, 1);
}

#[tokio::test]
async fn auto_refresh_stops_after_tick_budget() {
    let backend = FakeBackend::with_view(sample_view(SolverStatus::NotSolving));
    let server_url = spawn_backend(backend.clone()).await;
    let controller = controller_for(
        &server_url,
        ControllerOptions::new(PollingProfile::new(Duration::from_millis(20), 3)),
    );
    let mut events = controller.subscribe_events();

    assert!(controller.solve().await);
    wait_for_event(&mut events, |event| {
        matches!(event, ControllerEvent::AutoRefreshExpired)
    })
    .await;

    assert_eq!(backend.state.lock().await.status_calls, 3);
    assert!(!controller.auto_refresh_active().await);
    assert_eq!(controller.ticks_remaining().await, 0);
    assert_eq!(controller.phase().await, SolverPhase::Idle);
}

#[tokio::test]
async fn failed_ticks_still_consume_the_budget() {
    let backend = FakeBackend::with_view(sample_view(SolverStatus::NotSolving));
    backend.state.lock().await.status_failure = Some(Failure::Json(
        StatusCode::SERVICE_UNAVAILABLE,
        ApiErrorBody::new("Backend restarting"),
    ));
    let server_url = spawn_backend(backend.clone()).await;
    let controller = controller_for(
        &server_url,
        ControllerOptions::new(PollingProfile::new(Duration::from_millis(20), 2)),
    );
    let mut events = controller.subscribe_events();

    assert!(controller.solve().await);
    wait_for_event(&mut events, |event| {
        matches!(event, ControllerEvent::AutoRefreshExpired)
    })
    .await;

    let notifications = controller.notifications().await;
    assert_eq!(notifications.len(), 2);
    assert!(notifications
        .iter()
        .all(|notification| notification.message == "Backend restarting"));
}

#[tokio::test]
async fn solve_failure_stays_idle_without_timer() {
    let backend = FakeBackend::with_view(sample_view(SolverStatus::NotSolving));
    backend.state.lock().await.solve_failure = Some(Failure::Json(
        StatusCode::CONFLICT,
        ApiErrorBody::new("Solver is already running"),
    ));
    let server_url = spawn_backend(backend).await;
    let controller = controller_for(&server_url, slow_polling());

    assert!(!controller.solve().await);
    assert!(!controller.auto_refresh_active().await);
    assert_eq!(controller.phase().await, SolverPhase::Idle);

    let notifications = controller.notifications().await;
    assert_eq!(notifications[0].title, "Start solving failed.");
    assert_eq!(notifications[0].message, "Solver is already running");
}

#[tokio::test]
async fn solve_redraws_controls_before_next_refresh() {
    let backend = FakeBackend::with_view(sample_view(SolverStatus::NotSolving));
    let server_url = spawn_backend(backend).await;
    let controller = controller_for(&server_url, slow_polling());

    assert!(controller.refresh().await);
    assert!(controller.rendered_page().await.expect("page").solve_button_visible());

    assert!(controller.solve().await);
    let page = controller.rendered_page().await.expect("page");
    assert!(!page.solve_button_visible());
    assert!(page.stop_button_visible());
}

#[tokio::test]
async fn added_room_appears_as_column_header() {
    let backend = FakeBackend::with_view(sample_view(SolverStatus::NotSolving));
    let server_url = spawn_backend(backend).await;
    let controller = controller_for(&server_url, slow_polling());

    assert!(
        controller
            .add_room(&NewRoom {
                name: "Room A".to_string(),
            })
            .await
    );

    let view = controller.view().await.expect("view");
    let added = view
        .room_list
        .iter()
        .find(|room| room.name == "Room A")
        .expect("room fetched after add");
    assert!(added.id.0 > 100);

    let page = controller.rendered_page().await.expect("page");
    assert_eq!(
        page.column_headers(BY_ROOM_TABLE_ID),
        vec!["Room X", "Room Y", "Room A"]
    );
}

#[tokio::test]
async fn rejected_add_reports_server_message() {
    let backend = FakeBackend::with_view(sample_view(SolverStatus::NotSolving));
    let server_url = spawn_backend(backend).await;
    let controller = controller_for(&server_url, slow_polling());

    assert!(
        !controller
            .add_room(&NewRoom {
                name: "   ".to_string(),
            })
            .await
    );
    let notifications = controller.notifications().await;
    assert_eq!(notifications[0].title, "Adding room failed.");
    assert_eq!(notifications[0].message, "Room name must not be blank");
}

#[tokio::test]
async fn deleting_unknown_id_notifies_and_leaves_collection() {
    let backend = FakeBackend::with_view(sample_view(SolverStatus::NotSolving));
    let server_url = spawn_backend(backend).await;
    let controller = controller_for(&server_url, slow_polling());

    assert!(controller.refresh().await);
    let before = controller.rendered_page().await.expect("page");

    assert!(!controller.delete_entity(Collection::ROOMS, RoomId(99)).await);

    let after = controller.rendered_page().await.expect("page");
    assert_eq!(*before, *after);
    assert_eq!(
        after.column_headers(BY_ROOM_TABLE_ID),
        vec!["Room X", "Room Y"]
    );

    let notifications = controller.notifications().await;
    assert_eq!(notifications.len(), 1);
    assert_eq!(notifications[0].title, "Deleting room (99) failed.");
    assert_eq!(notifications[0].message, "No room with id 99");
    assert!(notifications[0].stack.is_some());

    let panel = controller.notification_panel().await;
    assert!(panel.to_html().contains("No room with id 99"));
}

#[tokio::test]
async fn deleted_lesson_disappears_after_refresh() {
    let backend = FakeBackend::with_view(sample_view(SolverStatus::NotSolving));
    let server_url = spawn_backend(backend).await;
    let controller = controller_for(&server_url, slow_polling());

    assert!(
        controller
            .add_lesson(&NewLesson {
                subject: "Biology".to_string(),
                teacher: "C. Darwin".to_string(),
                student_group: "10th grade".to_string(),
            })
            .await
    );
    let page = controller.rendered_page().await.expect("page");
    assert!(page.to_html().contains("Biology"));

    assert!(controller.delete_entity(Collection::LESSONS, LessonId(10)).await);
    let view = controller.view().await.expect("view");
    assert!(view.lesson_list.iter().all(|lesson| lesson.id != LessonId(10)));

    let page = controller.rendered_page().await.expect("page");
    let lesson_cards = page
        .root()
        .find_all(&|element: &Element| element.get_attr("data-lesson-id") == Some("10"));
    assert!(lesson_cards.is_empty());
}

#[tokio::test]
async fn notifications_expire_and_can_be_dismissed() {
    let backend = FakeBackend::with_view(sample_view(SolverStatus::NotSolving));
    let server_url = spawn_backend(backend).await;
    let controller = controller_for(
        &server_url,
        slow_polling().with_notification_ttl(Duration::from_millis(100)),
    );

    assert!(!controller.delete_entity(Collection::ROOMS, 7).await);
    assert!(!controller.delete_entity(Collection::ROOMS, 8).await);
    let notifications = controller.notifications().await;
    assert_eq!(notifications.len(), 2);

    assert!(controller.dismiss_notification(notifications[0].id).await);
    assert!(!controller.dismiss_notification(notifications[0].id).await);
    assert_eq!(controller.notifications().await.len(), 1);

    tokio::time::sleep(Duration::from_millis(150)).await;
    assert!(controller.notifications().await.is_empty());
}

#[tokio::test]
async fn facility_controller_uses_its_own_endpoints() {
    async fn flp_status() -> Json<FacilityLocationView> {
        Json(FacilityLocationView {
            score: Some("0hard/-1200soft".to_string()),
            solver_status: Some(SolverStatus::Solving),
            ..FacilityLocationView::default()
        })
    }

    std::env::set_var("NO_PROXY", "127.0.0.1,localhost");
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    let app = Router::new().route("/flp/status", get(flp_status));
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });

    let transport =
        HttpTransport::new(&format!("http://{addr}"), Duration::from_secs(5)).expect("transport");
    let controller = ViewSyncController::<FacilityLocationView>::for_demo(Arc::new(transport));
    assert_eq!(controller.polling(), PollingProfile::facility_location());

    assert!(controller.refresh().await);
    let page = controller.rendered_page().await.expect("page");
    assert_eq!(page.score_text(), "Score: 0hard/-1200soft");
    assert!(page.stop_button_visible());
}

#[tokio::test]
async fn zero_polling_profile_still_runs_and_expires() {
    let backend = FakeBackend::with_view(sample_view(SolverStatus::NotSolving));
    let server_url = spawn_backend(backend.clone()).await;
    let polling = PollingProfile::new(Duration::ZERO, 0);
    assert_eq!(polling.interval(), Duration::from_millis(1));
    assert_eq!(polling.ticks(), 1);

    let controller = controller_for(&server_url, ControllerOptions::new(polling));
    let mut events = controller.subscribe_events();

    assert!(controller.solve().await);
    wait_for_event(&mut events, |event| {
        matches!(event, ControllerEvent::AutoRefreshExpired)
    })
    .await;
    assert!(!controller.auto_refresh_active().await);
    assert_eq!(controller.phase().await, SolverPhase::Idle);

    // A later solve starts a fresh timer.
    assert!(controller.solve().await);
    wait_for_event(&mut events, |event| {
        matches!(event, ControllerEvent::AutoRefreshExpired)
    })
    .await;
    assert_eq!(backend.state.lock().await.status_calls, 2);
}

#[tokio::test]
async fn extended_solver_status_shows_stop_control() {
    async fn active_status() -> Json<serde_json::Value> {
        Json(serde_json::json!({
            "timeslotList": [],
            "roomList": [{ "id": 1, "name": "Room X" }],
            "lessonList": [],
            "score": "-2hard/0soft",
            "solverStatus": "SOLVING_ACTIVE"
        }))
    }

    std::env::set_var("NO_PROXY", "127.0.0.1,localhost");
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    let app = Router::new().route("/timeTable", get(active_status));
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });

    let controller = controller_for(&format!("http://{addr}"), slow_polling());
    assert!(controller.refresh().await);
    assert!(controller.notifications().await.is_empty());

    let page = controller.rendered_page().await.expect("page");
    assert!(page.stop_button_visible());
    assert!(!page.solve_button_visible());
    assert_eq!(page.column_headers(BY_ROOM_TABLE_ID), vec!["Room X"]);
}

#[tokio::test]
async fn unencodable_payload_is_reported_as_encode_failure() {
    let backend = FakeBackend::with_view(sample_view(SolverStatus::NotSolving));
    let server_url = spawn_backend(backend.clone()).await;
    let controller = controller_for(&server_url, slow_polling());

    let mut payload = std::collections::HashMap::new();
    payload.insert((1, 2), "tuple keys are not valid JSON object keys");

    assert!(!controller.add_entity(Collection::ROOMS, &payload).await);
    let notifications = controller.notifications().await;
    assert_eq!(notifications.len(), 1);
    assert_eq!(notifications[0].title, "Adding room failed.");
    assert!(notifications[0]
        .message
        .starts_with("failed to encode request body for /rooms"));
    assert_eq!(backend.state.lock().await.view.room_list.len(), 2);
}
