mod config;

use std::{
    fs,
    path::{Path, PathBuf},
    sync::Arc,
};

use anyhow::{bail, Context, Result};
use chrono::NaiveTime;
use clap::{Parser, Subcommand};
use client_core::{
    controller::ControllerOptions, Collection, ControllerEvent, DemoView, HttpTransport,
    Notification, RenderedPage, SolverPhase, ViewSyncController,
};
use config::{load_settings, Demo, Settings};
use shared::{
    domain::DayOfWeek,
    protocol::{FacilityLocationView, NewLesson, NewRoom, NewTimeslot, TimeTableView},
};
use tokio_stream::{wrappers::BroadcastStream, StreamExt};
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "dashboard", about = "Drive a solver demo backend from the terminal")]
struct Args {
    /// Base URL of the demo backend.
    #[arg(long)]
    server_url: Option<String>,
    #[arg(long, value_enum)]
    demo: Option<Demo>,
    /// Settings file, `dashboard.toml` by default.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Write every rendered page to this HTML file.
    #[arg(long)]
    out: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug, Clone)]
enum Command {
    /// Fetch and print the current solution.
    Show,
    /// Start solving and follow the auto-refresh until it ends.
    Solve,
    /// Stop solving.
    Stop,
    AddRoom {
        #[arg(long)]
        name: String,
    },
    AddTimeslot {
        #[arg(long)]
        day: DayOfWeek,
        #[arg(long, value_parser = parse_time)]
        start: NaiveTime,
        #[arg(long, value_parser = parse_time)]
        end: NaiveTime,
    },
    AddLesson {
        #[arg(long)]
        subject: String,
        #[arg(long)]
        teacher: String,
        #[arg(long)]
        student_group: String,
    },
    /// Delete a room, timeslot or lesson by id.
    Delete {
        #[arg(value_parser = parse_collection)]
        collection: Collection,
        id: i64,
    },
}

impl Command {
    fn edits_timetable(&self) -> bool {
        matches!(
            self,
            Command::AddRoom { .. }
                | Command::AddTimeslot { .. }
                | Command::AddLesson { .. }
                | Command::Delete { .. }
        )
    }
}

fn parse_time(raw: &str) -> Result<NaiveTime, chrono::ParseError> {
    NaiveTime::parse_from_str(raw, "%H:%M").or_else(|_| NaiveTime::parse_from_str(raw, "%H:%M:%S"))
}

fn parse_collection(raw: &str) -> Result<Collection, String> {
    Collection::from_name(raw).ok_or_else(|| format!("unknown collection '{raw}'"))
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();
    let args = Args::parse();

    let mut settings = load_settings(args.config.as_deref());
    if let Some(server_url) = args.server_url {
        settings.server_url = server_url;
    }
    if let Some(demo) = args.demo {
        settings.demo = demo;
    }
    info!(server_url = %settings.server_url, demo = ?settings.demo, "dashboard starting");

    if args.command.edits_timetable() {
        if settings.demo != Demo::Timetable {
            bail!("only the timetable demo supports adding or deleting entities");
        }
        return edit_timetable(&settings, args.command, args.out.as_deref()).await;
    }
    match settings.demo {
        Demo::Timetable => run::<TimeTableView>(&settings, args.command, args.out.as_deref()).await,
        Demo::FacilityLocation => {
            run::<FacilityLocationView>(&settings, args.command, args.out.as_deref()).await
        }
    }
}

fn build_controller<V: DemoView>(settings: &Settings) -> Result<Arc<ViewSyncController<V>>> {
    let transport = HttpTransport::new(&settings.server_url, settings.request_timeout)
        .with_context(|| format!("invalid server url '{}'", settings.server_url))?;
    debug!(base_url = %transport.base_url(), demo = V::NAME, "connecting");
    let options = ControllerOptions::new(V::default_polling())
        .with_notification_ttl(settings.notification_ttl);
    Ok(ViewSyncController::new(
        Arc::new(transport),
        V::default_endpoints(),
        options,
    ))
}

async fn run<V: DemoView>(settings: &Settings, command: Command, out: Option<&Path>) -> Result<()> {
    let controller = build_controller::<V>(settings)?;
    let ok = match command {
        Command::Solve => return follow_solving(&controller, out).await,
        Command::Stop => controller.stop_solving().await,
        _ => controller.refresh().await,
    };
    finish(&controller, ok, out).await
}

async fn edit_timetable(settings: &Settings, command: Command, out: Option<&Path>) -> Result<()> {
    let controller = build_controller::<TimeTableView>(settings)?;
    let ok = match command {
        Command::AddRoom { name } => controller.add_room(&NewRoom { name }).await,
        Command::AddTimeslot { day, start, end } => {
            controller
                .add_timeslot(&NewTimeslot {
                    day_of_week: day,
                    start_time: start,
                    end_time: end,
                })
                .await
        }
        Command::AddLesson {
            subject,
            teacher,
            student_group,
        } => {
            controller
                .add_lesson(&NewLesson {
                    subject,
                    teacher,
                    student_group,
                })
                .await
        }
        Command::Delete { collection, id } => controller.delete_entity(collection, id).await,
        Command::Show | Command::Solve | Command::Stop => controller.refresh().await,
    };
    finish(&controller, ok, out).await
}

/// Prints pending notifications and the last page; fails when the command did.
async fn finish<V: DemoView>(
    controller: &ViewSyncController<V>,
    ok: bool,
    out: Option<&Path>,
) -> Result<()> {
    for notification in controller.notifications().await {
        print_notification(&notification);
    }
    if let Some(page) = controller.rendered_page().await {
        show_page(&page, out)?;
    }
    if !ok {
        bail!("the backend rejected the request");
    }
    Ok(())
}

/// Starts the solver and prints each refreshed page until the auto-refresh
/// budget runs out. Ctrl-C asks the backend to stop first.
async fn follow_solving<V: DemoView>(
    controller: &Arc<ViewSyncController<V>>,
    out: Option<&Path>,
) -> Result<()> {
    controller.refresh().await;
    let mut events = BroadcastStream::new(controller.subscribe_events());
    if !controller.solve().await {
        for notification in controller.notifications().await {
            print_notification(&notification);
        }
        bail!("could not start solving");
    }

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);
    loop {
        tokio::select! {
            signal = &mut ctrl_c => {
                signal.context("failed to listen for ctrl-c")?;
                info!("interrupted, stopping solver");
                controller.stop_solving().await;
                if let Some(page) = controller.rendered_page().await {
                    show_page(&page, out)?;
                }
                break;
            }
            event = events.next() => match event {
                Some(Ok(ControllerEvent::ViewRendered(page))) => show_page(&page, out)?,
                Some(Ok(ControllerEvent::Notification(notification))) => {
                    print_notification(&notification)
                }
                Some(Ok(ControllerEvent::AutoRefreshExpired)) => {
                    info!("auto-refresh finished");
                }
                Some(Ok(ControllerEvent::PhaseChanged(SolverPhase::Idle))) | None => break,
                Some(Ok(ControllerEvent::PhaseChanged(SolverPhase::Solving))) => {}
                Some(Err(err)) => warn!(error = %err, "missed controller events"),
            }
        }
    }
    Ok(())
}

fn show_page(page: &RenderedPage, out: Option<&Path>) -> Result<()> {
    println!("{}", page.summary());
    if let Some(path) = out {
        fs::write(path, html_document(page))
            .with_context(|| format!("failed to write '{}'", path.display()))?;
    }
    Ok(())
}

fn html_document(page: &RenderedPage) -> String {
    format!(
        "<!DOCTYPE html>\n<html>\n<head><meta charset=\"utf-8\"><title>Solver dashboard</title></head>\n<body>\n{}\n</body>\n</html>\n",
        page.to_html()
    )
}

fn print_notification(notification: &Notification) {
    eprintln!(
        "[{}] {} {}",
        notification.raised_at.format("%H:%M:%S"),
        notification.title,
        notification.message
    );
    if let Some(stack) = &notification.stack {
        eprintln!("{stack}");
    }
}
