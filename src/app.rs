use chrono::NaiveDate;
use uuid::Uuid;

use stave_timeline::model::{DependencyKind, NewDependency, Project, Staff, Task, TaskStatus, TaskUpdate, Viewport};
use stave_timeline::render::layout::date_to_day_index;
use stave_timeline::render::{theme, DebugEvent, EngineIntent, FrameSnapshot, FrameStats};
use stave_timeline::{EngineConfig, TimelineEngine, TimelineHost};

/// Demo host: owns a project and feeds it to the timeline engine.
pub struct DemoApp {
    pub project: Project,
    pub viewport: Viewport,
    pub selection: Vec<Uuid>,
    pub status_message: String,
    pub gesture_active: bool,
    pub renderer_error: Option<String>,
    pub last_stats: FrameStats,
    engine: TimelineEngine,
}

impl DemoApp {
    pub fn new(cc: &eframe::CreationContext<'_>) -> Self {
        // Register Phosphor icon font as a fallback so status icons render inline with text
        let mut fonts = egui::FontDefinitions::default();
        egui_phosphor::add_to_fonts(&mut fonts, egui_phosphor::Variant::Regular);
        cc.egui_ctx.set_fonts(fonts);
        cc.egui_ctx.set_visuals(egui::Visuals::dark());

        let today = chrono::Local::now().date_naive();
        Self::with_project(Self::sample_project(today), EngineConfig::load_user_or_default())
    }

    pub fn with_project(project: Project, config: EngineConfig) -> Self {
        Self {
            project,
            viewport: Viewport::default(),
            selection: Vec::new(),
            status_message: "Ready".to_string(),
            gesture_active: false,
            renderer_error: None,
            last_stats: FrameStats::default(),
            engine: TimelineEngine::new(config),
        }
    }

    /// Generate a sample project for demonstration.
    pub fn sample_project(today: NaiveDate) -> Project {
        let epoch = today - chrono::Duration::days(7);
        let mut project = Project::new("Spring Release", epoch);
        let day = |n: i64| epoch + chrono::Duration::days(n);

        let mut melody = Staff::new("Melody", 5, 0);
        melody.time_signature = Some("4/4".to_string());
        let melody = project.add_staff(melody);
        let bass = project.add_staff(Staff::new("Bass line", 5, 1));
        let drums = project.add_staff(Staff::new("Percussion", 3, 2));

        // ── Melody: product work ────────────────────────────────────
        let kickoff = project.add_task(
            Task::new("Kickoff", project.id, melody, day(0), 2)
                .with_line(2)
                .with_status(TaskStatus::Completed)
                .with_description("Agree on **scope** and owners. Notes in [the wiki](https://example.com/wiki)."),
        );
        let design = project.add_task(
            Task::new("UI design", project.id, melody, day(3), 6)
                .with_line(4)
                .with_status(TaskStatus::InProgress)
                .with_description("Mock-ups for the *editor* and the `timeline` view."),
        );
        let polish = project.add_task(Task::new("Polish", project.id, melody, day(14), 4).with_line(6));

        // ── Bass line: platform work ────────────────────────────────
        let schema = project.add_task(
            Task::new("Storage schema", project.id, bass, day(2), 4)
                .with_line(1)
                .with_status(TaskStatus::InProgress),
        );
        let sync = project.add_task(
            Task::new("Sync service", project.id, bass, day(7), 8)
                .with_line(3)
                .with_status(TaskStatus::Blocked)
                .with_description("Waiting on the **storage schema** review."),
        );

        // ── Percussion: release rhythm ──────────────────────────────
        let beta = project.add_task(Task::new("Beta", project.id, drums, day(12), 2).with_line(2));
        let launch = project.add_task(Task::new("Launch", project.id, drums, day(20), 1).with_line(0));
        project.add_task(
            Task::new("Old plan", project.id, drums, day(5), 3)
                .with_line(4)
                .with_status(TaskStatus::Cancelled),
        );

        for (src, dst) in [
            (kickoff, design),
            (kickoff, schema),
            (schema, sync),
            (design, polish),
            (sync, beta),
            (beta, launch),
        ] {
            project.add_dependency(&NewDependency {
                id: Uuid::new_v4(),
                src_task_id: src,
                dst_task_id: dst,
                kind: DependencyKind::FinishToStart,
            });
        }
        project
    }

    fn task_title(&self, id: Uuid) -> String {
        self.project
            .tasks
            .get(&id)
            .map(|t| t.title.clone())
            .unwrap_or_default()
    }

    /// Scroll so that today sits a few days in from the left edge.
    pub fn scroll_to_today(&mut self) {
        let today = chrono::Local::now().date_naive();
        let days = date_to_day_index(today, self.project.epoch) - 3;
        self.viewport.x = days as f32 * self.engine.config().day_width;
    }

    fn show_toolbar(&mut self, ui: &mut egui::Ui) {
        ui.horizontal(|ui| {
            ui.heading(&self.project.name);
            ui.separator();
            let step = self.engine.config().zoom_step;
            let limits = self.engine.config().zoom_limits();
            if ui
                .button(egui_phosphor::regular::MAGNIFYING_GLASS_MINUS)
                .on_hover_text("Zoom out")
                .clicked()
            {
                self.viewport.zoom_out(step, &limits);
            }
            if ui
                .button(egui_phosphor::regular::MAGNIFYING_GLASS_PLUS)
                .on_hover_text("Zoom in")
                .clicked()
            {
                self.viewport.zoom_in(step, &limits);
            }
            if ui.button("Today").clicked() {
                self.scroll_to_today();
            }
            ui.separator();
            ui.label(
                egui::RichText::new(
                    "Drag notes to move · Drag the right edge to resize · Right-drag to link · Ctrl+Scroll to zoom",
                )
                .small()
                .weak(),
            );
        });
    }

    fn show_details(&self, ui: &mut egui::Ui) {
        ui.heading("Details");
        ui.separator();
        if self.gesture_active {
            ui.weak("Editing on the timeline…");
            return;
        }
        let Some(task) = self.selection.first().and_then(|id| self.project.tasks.get(id)) else {
            ui.weak("Select a task to see its details.");
            return;
        };
        let style = theme::status_style(task.status);
        ui.label(egui::RichText::new(&task.title).strong().size(15.0));
        ui.label(
            egui::RichText::new(format!("{} {}", style.icon, task.status.label())).color(style.fill),
        );
        ui.add_space(4.0);
        egui::Grid::new("task_details").num_columns(2).show(ui, |ui| {
            ui.label("Start");
            ui.label(task.start_date.format("%Y-%m-%d").to_string());
            ui.end_row();
            ui.label("End");
            ui.label(task.end_date().format("%Y-%m-%d").to_string());
            ui.end_row();
            ui.label("Duration");
            ui.label(format!("{} d", task.duration_days));
            ui.end_row();
            ui.label("Staff");
            let staff = self
                .project
                .staffs
                .iter()
                .find(|s| s.id == task.staff_id)
                .map_or("—", |s| s.name.as_str());
            ui.label(staff);
            ui.end_row();
            ui.label("Line");
            ui.label(task.staff_line.to_string());
            ui.end_row();
        });
        if let Some(description) = &task.description {
            ui.add_space(4.0);
            ui.label(description);
        }
    }
}

/// Collects the engine's intents while the project is borrowed for drawing.
#[derive(Default)]
struct IntentQueue {
    intents: Vec<EngineIntent>,
    stats: Option<FrameStats>,
}

impl TimelineHost for IntentQueue {
    fn on_debug(&mut self, event: &DebugEvent) {
        if let DebugEvent::FrameReconciled(stats) = event {
            self.stats = Some(*stats);
        }
    }

    fn dispatch_intent(&mut self, intent: EngineIntent) {
        self.intents.push(intent);
    }
}

impl TimelineHost for DemoApp {
    fn select(&mut self, ids: Vec<Uuid>, _anchor: Option<egui::Pos2>) {
        self.selection = ids;
    }

    fn on_drag_start(&mut self) {
        self.gesture_active = true;
    }

    fn on_drag_end(&mut self) {
        self.gesture_active = false;
    }

    fn update_task(&mut self, project_id: Uuid, task_id: Uuid, update: TaskUpdate) {
        if project_id != self.project.id || update.is_empty() {
            return;
        }
        if !self.project.apply_update(task_id, &update) {
            tracing::debug!(%task_id, "update for a task that no longer exists");
            return;
        }
        if let Some(task) = self.project.tasks.get(&task_id) {
            self.status_message = format!(
                "Updated '{}' ({} → {})",
                task.title,
                task.start_date.format("%Y-%m-%d"),
                task.end_date().format("%Y-%m-%d")
            );
        }
    }

    fn create_dependency(&mut self, project_id: Uuid, dependency: NewDependency) {
        if project_id != self.project.id {
            return;
        }
        if self.project.add_dependency(&dependency) {
            self.status_message = format!(
                "Linked '{}' → '{}'",
                self.task_title(dependency.src_task_id),
                self.task_title(dependency.dst_task_id)
            );
        }
    }

    fn on_viewport_change(&mut self, viewport: Viewport) {
        self.viewport = viewport;
    }

    fn on_vertical_scale_change(&mut self, scale: f32) {
        tracing::trace!(scale, "vertical scale changed");
    }
}

impl eframe::App for DemoApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        // Top panel: toolbar
        egui::TopBottomPanel::top("toolbar").show(ctx, |ui| {
            self.show_toolbar(ui);
        });

        // Bottom panel: status bar
        egui::TopBottomPanel::bottom("status_bar").show(ctx, |ui| {
            ui.horizontal(|ui| {
                match &self.renderer_error {
                    Some(err) => ui.colored_label(ui.visuals().warn_fg_color, err),
                    None => ui.label(&self.status_message),
                };
                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    ui.weak(format!(
                        "Tasks: {} · Links: {} · Zoom: {:.0}% · Scale: {:.0}%",
                        self.last_stats.tasks,
                        self.last_stats.dependencies,
                        self.viewport.zoom * 100.0,
                        self.viewport.vertical_scale * 100.0
                    ));
                });
            });
        });

        egui::SidePanel::right("details")
            .default_width(240.0)
            .resizable(true)
            .show(ctx, |ui| self.show_details(ui));

        // Central panel: timeline
        let mut queue = IntentQueue::default();
        egui::CentralPanel::default()
            .frame(egui::Frame::default().inner_margin(egui::Margin::ZERO))
            .show(ctx, |ui| {
                let snapshot = FrameSnapshot {
                    tasks: &self.project.tasks,
                    dependencies: &self.project.dependencies,
                    staffs: &self.project.staffs,
                    selection: &self.selection,
                    epoch: self.project.epoch,
                    project_id: self.project.id,
                };
                match self.engine.show(ui, &snapshot, self.viewport, &mut queue) {
                    Ok(()) => self.renderer_error = None,
                    Err(err) => {
                        self.renderer_error = Some(err.to_string());
                        ui.centered_and_justified(|ui| {
                            ui.label(
                                egui::RichText::new(format!(
                                    "{} The timeline cannot be drawn right now.\n{err}",
                                    egui_phosphor::regular::WARNING
                                ))
                                .color(ui.visuals().warn_fg_color),
                            );
                        });
                    }
                }
            });

        if let Some(stats) = queue.stats {
            self.last_stats = stats;
        }
        for intent in queue.intents {
            self.dispatch_intent(intent);
        }
    }
}
