//! Engine shell: surface, pan/zoom, per-frame reconcile and intent routing.

use std::collections::{HashMap, HashSet};

use chrono::NaiveDate;
use egui::{Event, Key, MouseWheelUnit, PointerButton, Pos2, Rect, Sense, Ui, Vec2};
use uuid::Uuid;

use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::model::{Dependency, NewDependency, Staff, Task, TaskUpdate, Viewport};
use crate::render::controller::{EngineIntent, GestureContext, GestureController, PointerInput};
use crate::render::layout::{compute_task_layout, LayoutMetrics, SceneTransform, StaffStack};
use crate::render::scene::{build_background, BackgroundInput, BackgroundKey, HoverCard, SceneManager};
use crate::render::spatial::SpatialIndex;

/// Points scrolled per wheel line.
const WHEEL_LINE_POINTS: f32 = 24.0;

/// Read-only view of the host's data for one frame.
#[derive(Debug, Clone, Copy)]
pub struct FrameSnapshot<'a> {
    pub tasks: &'a HashMap<Uuid, Task>,
    pub dependencies: &'a HashMap<Uuid, Dependency>,
    pub staffs: &'a [Staff],
    pub selection: &'a [Uuid],
    pub epoch: NaiveDate,
    pub project_id: Uuid,
}

/// Counters from one reconcile pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameStats {
    pub tasks: usize,
    pub rebuilt: usize,
    pub removed_tasks: usize,
    pub dependencies: usize,
    pub skipped_dependencies: usize,
    pub removed_dependencies: usize,
}

/// Introspection events for [`TimelineHost::on_debug`].
#[derive(Debug, Clone, PartialEq)]
pub enum DebugEvent {
    SurfaceAttached { rect: Rect, pixels_per_point: f32 },
    FrameReconciled(FrameStats),
    Intent(EngineIntent),
}

/// Callbacks the engine drives. Every method defaults to a no-op.
pub trait TimelineHost {
    fn select(&mut self, _ids: Vec<Uuid>, _anchor: Option<Pos2>) {}

    fn on_drag_start(&mut self) {}

    fn on_drag_end(&mut self) {}

    fn update_task(&mut self, _project_id: Uuid, _task_id: Uuid, _update: TaskUpdate) {}

    fn create_dependency(&mut self, _project_id: Uuid, _dependency: NewDependency) {}

    fn on_viewport_change(&mut self, _viewport: Viewport) {}

    fn on_vertical_scale_change(&mut self, _scale: f32) {}

    fn on_debug(&mut self, _event: &DebugEvent) {}

    /// Route an intent to the matching callback.
    fn dispatch_intent(&mut self, intent: EngineIntent) {
        match intent {
            EngineIntent::Select { ids, anchor } => self.select(ids, anchor),
            EngineIntent::GestureStarted => self.on_drag_start(),
            EngineIntent::GestureEnded => self.on_drag_end(),
            EngineIntent::UpdateTask {
                project_id,
                task_id,
                update,
            } => self.update_task(project_id, task_id, update),
            EngineIntent::CreateDependency {
                project_id,
                dependency,
            } => self.create_dependency(project_id, dependency),
            EngineIntent::ViewportChanged(viewport) => self.on_viewport_change(viewport),
            EngineIntent::VerticalScaleChanged(scale) => self.on_vertical_scale_change(scale),
        }
    }
}

/// Pointer event in screen coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PointerEvent {
    Down(Pos2, PointerButton),
    Move(Pos2),
    Up(Pos2, PointerButton),
}

/// One wheel step, already converted to points.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WheelInput {
    pub delta: Vec2,
    pub zoom: bool,
    pub vertical_scale: bool,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Surface {
    rect: Rect,
    pixels_per_point: f32,
}

pub struct TimelineEngine {
    config: EngineConfig,
    config_revision: u64,
    scene: SceneManager,
    index: SpatialIndex,
    controller: GestureController,
    surface: Option<Surface>,
    /// Viewport the current layouts were computed with.
    laid_out: Viewport,
    /// Last pan position and the button holding the pan.
    pan_from: Option<(Pos2, PointerButton)>,
    today: Option<NaiveDate>,
    destroyed: bool,
}

impl TimelineEngine {
    pub fn new(config: EngineConfig) -> Self {
        let index = SpatialIndex::new(config.spatial_cell_size);
        Self {
            config,
            config_revision: 0,
            scene: SceneManager::new(),
            index,
            controller: GestureController::new(),
            surface: None,
            laid_out: Viewport::default(),
            pan_from: None,
            today: None,
            destroyed: false,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn set_config(&mut self, config: EngineConfig) {
        if config == self.config {
            return;
        }
        self.index = SpatialIndex::new(config.spatial_cell_size);
        self.config = config;
        self.config_revision += 1;
        // Node geometry depends on colours and sizes.
        self.scene.clear();
    }

    /// Pin the day used for the today marker. `None` follows the local clock.
    pub fn set_today(&mut self, today: Option<NaiveDate>) {
        self.today = today;
    }

    pub fn scene(&self) -> &SceneManager {
        &self.scene
    }

    pub fn index(&self) -> &SpatialIndex {
        &self.index
    }

    pub fn controller(&self) -> &GestureController {
        &self.controller
    }

    pub fn is_attached(&self) -> bool {
        self.surface.is_some()
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed
    }

    pub fn surface_rect(&self) -> Option<Rect> {
        self.surface.map(|s| s.rect)
    }

    /// Attach or resize the drawing surface.
    pub fn attach_surface(&mut self, rect: Rect, pixels_per_point: f32) -> Result<(), EngineError> {
        if self.destroyed {
            return Ok(());
        }
        if !rect.is_finite() || rect.width() <= 0.0 || rect.height() <= 0.0 {
            self.surface = None;
            return Err(EngineError::renderer_unavailable(format!(
                "surface has unusable size {:?}",
                rect.size()
            )));
        }
        if !pixels_per_point.is_finite() || pixels_per_point <= 0.0 {
            self.surface = None;
            return Err(EngineError::renderer_unavailable(format!(
                "invalid pixels per point {pixels_per_point}"
            )));
        }
        let surface = Surface {
            rect,
            pixels_per_point,
        };
        if self.surface != Some(surface) {
            tracing::debug!(?rect, pixels_per_point, "surface attached");
        }
        self.surface = Some(surface);
        Ok(())
    }

    fn transform(&self, viewport: &Viewport) -> Option<SceneTransform> {
        let surface = self.surface?;
        let metrics = LayoutMetrics::new(&self.config, viewport);
        Some(SceneTransform::new(surface.rect.min, &metrics, viewport))
    }

    /// Lay out the snapshot, diff it onto the scene and rebuild the spatial index.
    pub fn reconcile(&mut self, snapshot: &FrameSnapshot<'_>, viewport: &Viewport) -> FrameStats {
        let mut stats = FrameStats::default();
        if self.destroyed {
            return stats;
        }
        let metrics = LayoutMetrics::new(&self.config, viewport);
        let stack = StaffStack::new(snapshot.staffs);

        let mut ordered: Vec<&Task> = snapshot.tasks.values().collect();
        ordered.sort_by(|a, b| a.start_date.cmp(&b.start_date).then(a.id.cmp(&b.id)));

        self.index.clear();
        let mut live_tasks = HashSet::with_capacity(ordered.len());
        let mut paint_order = Vec::with_capacity(ordered.len());
        for task in ordered {
            let Some(layout) = compute_task_layout(&metrics, task, snapshot.epoch, &stack) else {
                tracing::trace!(task_id = %task.id, "task has no staff in this snapshot");
                continue;
            };
            if self
                .scene
                .upsert_task(task, &layout, &self.config, metrics.zoom, &task.title, task.status)
            {
                stats.rebuilt += 1;
            }
            self.index.insert(task.id, layout.rect());
            live_tasks.insert(task.id);
            paint_order.push(task.id);
        }
        stats.tasks = live_tasks.len();
        stats.removed_tasks = self.scene.remove_missing_tasks(&live_tasks);
        self.scene.set_paint_order(paint_order);

        let mut live_dependencies = HashSet::with_capacity(snapshot.dependencies.len());
        for dep in snapshot.dependencies.values() {
            let endpoints = (
                self.scene.anchors(dep.src_task_id).copied(),
                self.scene.anchors(dep.dst_task_id).copied(),
            );
            let (Some(src), Some(dst)) = endpoints else {
                stats.skipped_dependencies += 1;
                continue;
            };
            self.scene
                .upsert_dependency(dep.id)
                .redraw(src.right, dst.left, self.config.colors.dependency);
            live_dependencies.insert(dep.id);
        }
        stats.dependencies = live_dependencies.len();
        stats.removed_dependencies = self.scene.remove_missing_dependencies(&live_dependencies);

        self.scene
            .update_selection(snapshot.selection, self.config.colors.selection);
        self.scene
            .set_preview(self.controller.preview(), &metrics, &self.config.colors);

        if let Some(surface) = self.surface {
            let today = self.today.unwrap_or_else(|| chrono::Local::now().date_naive());
            let key = BackgroundKey {
                viewport: *viewport,
                surface: surface.rect,
                config_revision: self.config_revision,
                today,
                epoch: snapshot.epoch,
                staffs: BackgroundKey::staff_signature(snapshot.staffs),
            };
            let transform = SceneTransform::new(surface.rect.min, &metrics, viewport);
            let config = &self.config;
            self.scene.ensure_background(key, || {
                build_background(&BackgroundInput {
                    config,
                    metrics: &metrics,
                    transform: &transform,
                    staffs: &stack,
                    size: surface.rect.size(),
                    epoch: snapshot.epoch,
                    today,
                })
            });
        }

        self.laid_out = *viewport;
        tracing::trace!(?stats, "frame reconciled");
        stats
    }

    fn gesture_context<'a>(&'a self, snapshot: &FrameSnapshot<'a>) -> GestureContext<'a> {
        GestureContext {
            tasks: snapshot.tasks,
            dependencies: snapshot.dependencies,
            staffs: StaffStack::new(snapshot.staffs),
            layouts: self.scene.layouts(),
            index: &self.index,
            metrics: LayoutMetrics::new(&self.config, &self.laid_out),
            config: &self.config,
            epoch: snapshot.epoch,
            project_id: snapshot.project_id,
        }
    }

    /// Feed one pointer event. Positions are screen coordinates.
    pub fn handle_pointer(
        &mut self,
        snapshot: &FrameSnapshot<'_>,
        viewport: &mut Viewport,
        event: PointerEvent,
        space_held: bool,
    ) -> Vec<EngineIntent> {
        if self.destroyed {
            return Vec::new();
        }
        let Some(transform) = self.transform(&self.laid_out) else {
            return Vec::new();
        };

        // Panning takes the pointer before the gesture controller sees it.
        match event {
            PointerEvent::Down(pos, PointerButton::Middle) if self.pan_from.is_none() => {
                self.pan_from = Some((pos, PointerButton::Middle));
                return Vec::new();
            }
            PointerEvent::Down(pos, PointerButton::Primary)
                if space_held && self.pan_from.is_none() && !self.controller.is_active() =>
            {
                self.pan_from = Some((pos, PointerButton::Primary));
                return Vec::new();
            }
            PointerEvent::Move(pos) => {
                if let Some((from, button)) = self.pan_from {
                    self.pan_from = Some((pos, button));
                    let delta = pos - from;
                    if delta == Vec2::ZERO {
                        return Vec::new();
                    }
                    viewport.pan_by_screen(delta.x, delta.y);
                    return vec![EngineIntent::ViewportChanged(*viewport)];
                }
            }
            PointerEvent::Up(_, button) if self.pan_from.is_some_and(|(_, held)| held == button) => {
                self.pan_from = None;
                return Vec::new();
            }
            _ => {}
        }

        let mut controller = std::mem::take(&mut self.controller);
        let mut intents = {
            let ctx = self.gesture_context(snapshot);
            match event {
                PointerEvent::Down(pos, button) => controller.pointer_down(&ctx, PointerInput {
                    pos: transform.to_layout(pos),
                    button,
                }),
                PointerEvent::Move(pos) => controller.pointer_move(&ctx, transform.to_layout(pos)),
                PointerEvent::Up(pos, button) => controller.pointer_up(&ctx, PointerInput {
                    pos: transform.to_layout(pos),
                    button,
                }),
            }
        };
        self.controller = controller;

        for intent in &mut intents {
            if let EngineIntent::Select {
                anchor: Some(anchor), ..
            } = intent
            {
                *anchor = transform.to_screen(*anchor);
            }
        }
        if self.controller.is_active() {
            self.scene.set_hover(None);
        }
        intents
    }

    /// Apply a wheel step: zoom or vertical scale around the pointer, or pan.
    pub fn handle_wheel(&mut self, viewport: &mut Viewport, wheel: WheelInput, pointer: Pos2) -> Vec<EngineIntent> {
        if self.destroyed || wheel.delta == Vec2::ZERO {
            return Vec::new();
        }
        if !wheel.zoom {
            viewport.pan_by_screen(wheel.delta.x, wheel.delta.y);
            return vec![EngineIntent::ViewportChanged(*viewport)];
        }
        let notch = if wheel.delta.y != 0.0 {
            wheel.delta.y.signum()
        } else {
            wheel.delta.x.signum()
        };
        let factor = self.config.zoom_step.powf(notch);
        if wheel.vertical_scale {
            self.scale_vertically_by(viewport, factor, pointer)
        } else {
            self.zoom_by(viewport, factor, pointer)
        }
    }

    /// Multiply the zoom, keeping the world point under `pointer` fixed.
    pub fn zoom_by(&mut self, viewport: &mut Viewport, factor: f32, pointer: Pos2) -> Vec<EngineIntent> {
        let Some(surface) = self.surface.filter(|_| !self.destroyed) else {
            return Vec::new();
        };
        let anchor_x = pointer.x - surface.rect.left() - self.config.left_margin;
        if viewport.zoom_around(factor, anchor_x, &self.config.zoom_limits()) {
            tracing::trace!(zoom = viewport.zoom, "zoom changed");
            vec![EngineIntent::ViewportChanged(*viewport)]
        } else {
            Vec::new()
        }
    }

    pub fn scale_vertically_by(&mut self, viewport: &mut Viewport, factor: f32, pointer: Pos2) -> Vec<EngineIntent> {
        let Some(surface) = self.surface.filter(|_| !self.destroyed) else {
            return Vec::new();
        };
        let anchor_y = pointer.y - surface.rect.top() - self.config.top_margin;
        if viewport.scale_vertically_around(factor, anchor_y, &self.config.zoom_limits()) {
            vec![
                EngineIntent::VerticalScaleChanged(viewport.vertical_scale),
                EngineIntent::ViewportChanged(*viewport),
            ]
        } else {
            Vec::new()
        }
    }

    /// Refresh the hover card for a screen position.
    pub fn update_hover(&mut self, snapshot: &FrameSnapshot<'_>, pointer: Option<Pos2>) {
        if self.destroyed {
            return;
        }
        let card = match (pointer, self.transform(&self.laid_out)) {
            (Some(pos), Some(transform)) if !self.controller.is_active() && self.pan_from.is_none() => self
                .index
                .top_hit(transform.to_layout(pos))
                .and_then(|id| Some((snapshot.tasks.get(&id)?, self.scene.anchors(id)?)))
                .map(|(task, anchors)| HoverCard::for_task(task, anchors)),
            _ => None,
        };
        self.scene.set_hover(card);
    }

    /// Abandon any gesture or pan in flight.
    pub fn cancel(&mut self) -> Vec<EngineIntent> {
        self.pan_from = None;
        self.scene.set_hover(None);
        self.controller.cancel()
    }

    /// Tear everything down. Later calls are no-ops.
    pub fn destroy(&mut self) {
        if self.destroyed {
            return;
        }
        self.controller.cancel();
        self.scene.clear();
        self.index.clear();
        self.surface = None;
        self.pan_from = None;
        self.destroyed = true;
        tracing::debug!("timeline engine destroyed");
    }

    /// Draw the timeline into the remaining space of `ui` and route input.
    pub fn show(
        &mut self,
        ui: &mut Ui,
        snapshot: &FrameSnapshot<'_>,
        viewport: Viewport,
        host: &mut dyn TimelineHost,
    ) -> Result<(), EngineError> {
        if self.destroyed {
            return Ok(());
        }
        let (rect, response) = ui.allocate_exact_size(ui.available_size(), Sense::click_and_drag());
        let pixels_per_point = ui.ctx().pixels_per_point();
        let was_attached = self.surface.map(|s| s.rect);
        if let Err(err) = self.attach_surface(rect, pixels_per_point) {
            tracing::error!(%err, "timeline renderer unavailable");
            return Err(err);
        }
        if was_attached != Some(rect) {
            host.on_debug(&DebugEvent::SurfaceAttached {
                rect,
                pixels_per_point,
            });
        }

        let (events, space_held, escape, hover_pos) = ui.input(|i| {
            (
                i.events.clone(),
                i.key_down(Key::Space),
                i.key_pressed(Key::Escape),
                i.pointer.hover_pos(),
            )
        });

        let mut viewport = viewport;
        let mut intents = Vec::new();
        if escape {
            intents.extend(self.cancel());
        }
        let hovered = response.hovered();
        for event in &events {
            match event {
                Event::MouseWheel {
                    unit,
                    delta,
                    modifiers,
                } if hovered => {
                    let delta = match unit {
                        MouseWheelUnit::Point => *delta,
                        MouseWheelUnit::Line => *delta * WHEEL_LINE_POINTS,
                        MouseWheelUnit::Page => *delta * rect.height(),
                    };
                    // Shift turns a plain wheel into horizontal scrolling.
                    let delta = if modifiers.shift && !modifiers.command && delta.x == 0.0 {
                        Vec2::new(delta.y, 0.0)
                    } else {
                        delta
                    };
                    let wheel = WheelInput {
                        delta,
                        zoom: modifiers.command || modifiers.ctrl,
                        vertical_scale: modifiers.shift,
                    };
                    let pointer = hover_pos.unwrap_or(rect.center());
                    intents.extend(self.handle_wheel(&mut viewport, wheel, pointer));
                }
                Event::Zoom(factor) if hovered => {
                    let pointer = hover_pos.unwrap_or(rect.center());
                    intents.extend(self.zoom_by(&mut viewport, *factor, pointer));
                }
                Event::PointerButton {
                    pos,
                    button,
                    pressed: true,
                    ..
                } if rect.contains(*pos) => {
                    let event = PointerEvent::Down(*pos, *button);
                    intents.extend(self.handle_pointer(snapshot, &mut viewport, event, space_held));
                }
                Event::PointerButton {
                    pos,
                    button,
                    pressed: false,
                    ..
                } => {
                    let event = PointerEvent::Up(*pos, *button);
                    intents.extend(self.handle_pointer(snapshot, &mut viewport, event, space_held));
                }
                Event::PointerMoved(pos) => {
                    let event = PointerEvent::Move(*pos);
                    intents.extend(self.handle_pointer(snapshot, &mut viewport, event, space_held));
                }
                _ => {}
            }
        }

        let stats = self.reconcile(snapshot, &viewport);
        host.on_debug(&DebugEvent::FrameReconciled(stats));
        self.update_hover(snapshot, hover_pos.filter(|p| rect.contains(*p)));

        if let Some(transform) = self.transform(&viewport) {
            let painter = ui.painter_at(rect);
            self.scene.paint(&painter, &transform, &self.config.colors);
        }

        for intent in intents {
            host.on_debug(&DebugEvent::Intent(intent.clone()));
            host.dispatch_intent(intent);
        }

        // Continuous frame loop while attached.
        ui.ctx().request_repaint();
        Ok(())
    }
}

impl Drop for TimelineEngine {
    fn drop(&mut self) {
        self.destroy();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::TaskStatus;

    #[derive(Default)]
    struct RecordingHost {
        selections: Vec<Vec<Uuid>>,
        drags: (usize, usize),
        updates: Vec<(Uuid, TaskUpdate)>,
        links: Vec<NewDependency>,
        viewports: Vec<Viewport>,
        scales: Vec<f32>,
    }

    impl TimelineHost for RecordingHost {
        fn select(&mut self, ids: Vec<Uuid>, _anchor: Option<Pos2>) {
            self.selections.push(ids);
        }

        fn on_drag_start(&mut self) {
            self.drags.0 += 1;
        }

        fn on_drag_end(&mut self) {
            self.drags.1 += 1;
        }

        fn update_task(&mut self, _project_id: Uuid, task_id: Uuid, update: TaskUpdate) {
            self.updates.push((task_id, update));
        }

        fn create_dependency(&mut self, _project_id: Uuid, dependency: NewDependency) {
            self.links.push(dependency);
        }

        fn on_viewport_change(&mut self, viewport: Viewport) {
            self.viewports.push(viewport);
        }

        fn on_vertical_scale_change(&mut self, scale: f32) {
            self.scales.push(scale);
        }
    }

    struct Data {
        tasks: HashMap<Uuid, Task>,
        dependencies: HashMap<Uuid, Dependency>,
        staffs: Vec<Staff>,
        selection: Vec<Uuid>,
        epoch: NaiveDate,
        project_id: Uuid,
    }

    impl Data {
        fn new() -> Self {
            let epoch = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
            let staffs = vec![Staff::new("Melody", 5, 0), Staff::new("Bass", 5, 1)];
            let project_id = Uuid::new_v4();
            let a = Task::new("Intro", project_id, staffs[0].id, epoch, 3);
            let b = Task::new("Bridge", project_id, staffs[1].id, epoch + chrono::Duration::days(4), 2)
                .with_line(2)
                .with_status(TaskStatus::InProgress);
            let dep = Dependency::new(project_id, a.id, b.id);
            Self {
                tasks: [(a.id, a), (b.id, b)].into_iter().collect(),
                dependencies: [(dep.id, dep)].into_iter().collect(),
                staffs,
                selection: Vec::new(),
                epoch,
                project_id,
            }
        }

        fn snapshot(&self) -> FrameSnapshot<'_> {
            FrameSnapshot {
                tasks: &self.tasks,
                dependencies: &self.dependencies,
                staffs: &self.staffs,
                selection: &self.selection,
                epoch: self.epoch,
                project_id: self.project_id,
            }
        }

        fn task(&self, title: &str) -> &Task {
            self.tasks.values().find(|t| t.title == title).unwrap()
        }
    }

    fn engine() -> TimelineEngine {
        let mut engine = TimelineEngine::new(EngineConfig::default());
        engine
            .attach_surface(Rect::from_min_size(Pos2::new(10.0, 20.0), Vec2::new(1200.0, 600.0)), 1.0)
            .unwrap();
        engine.set_today(Some(NaiveDate::from_ymd_opt(2024, 1, 2).unwrap()));
        engine
    }

    #[test]
    fn invalid_surfaces_are_reported_as_renderer_unavailable() {
        let mut engine = TimelineEngine::new(EngineConfig::default());
        let zero = Rect::from_min_size(Pos2::ZERO, Vec2::ZERO);
        assert!(engine.attach_surface(zero, 1.0).unwrap_err().is_renderer_unavailable());
        let ok = Rect::from_min_size(Pos2::ZERO, Vec2::splat(100.0));
        assert!(engine.attach_surface(ok, f32::NAN).unwrap_err().is_renderer_unavailable());
        assert!(engine.attach_surface(ok, 0.0).is_err());
        assert!(!engine.is_attached());
        assert!(engine.attach_surface(ok, 2.0).is_ok());
        assert_eq!(engine.surface_rect(), Some(ok));
    }

    #[test]
    fn reconcile_only_rebuilds_what_changed() {
        let mut data = Data::new();
        let mut engine = engine();
        let viewport = Viewport::default();

        let first = engine.reconcile(&data.snapshot(), &viewport);
        assert_eq!((first.tasks, first.rebuilt, first.dependencies), (2, 2, 1));
        assert_eq!(engine.index().len(), 2);

        let second = engine.reconcile(&data.snapshot(), &viewport);
        assert_eq!(second.rebuilt, 0);
        assert_eq!(engine.scene().background_builds(), 1);

        // Panning moves the root only.
        let panned = Viewport { x: 96.0, ..viewport };
        assert_eq!(engine.reconcile(&data.snapshot(), &panned).rebuilt, 0);
        // Zoom changes every glyph.
        let zoomed = Viewport { zoom: 1.5, ..viewport };
        assert_eq!(engine.reconcile(&data.snapshot(), &zoomed).rebuilt, 2);

        let intro = data.task("Intro").id;
        data.tasks.remove(&intro);
        let stats = engine.reconcile(&data.snapshot(), &zoomed);
        assert_eq!(stats.removed_tasks, 1);
        assert_eq!(stats.skipped_dependencies, 1);
        assert_eq!(stats.removed_dependencies, 1);
        assert_eq!(engine.scene().task_count(), 1);
        assert_eq!(engine.scene().dependency_count(), 0);
    }

    #[test]
    fn drag_through_the_engine_reaches_the_host_once() {
        let data = Data::new();
        let mut engine = engine();
        let mut viewport = Viewport::default();
        let mut host = RecordingHost::default();
        engine.reconcile(&data.snapshot(), &viewport);

        let intro = data.task("Intro");
        let layout = *engine.scene().layout(intro.id).unwrap();
        let transform = engine.transform(&viewport).unwrap();
        let grab = transform.to_screen(layout.top_left() + Vec2::new(6.0, layout.radius));
        let metrics = LayoutMetrics::new(engine.config(), &viewport);
        let drop = grab + Vec2::new(2.0 * metrics.day_width, metrics.line_y(1, 4) - layout.center_y);

        let snapshot = data.snapshot();
        let mut intents = engine.handle_pointer(&snapshot, &mut viewport, PointerEvent::Down(grab, PointerButton::Primary), false);
        intents.extend(engine.handle_pointer(&snapshot, &mut viewport, PointerEvent::Move(drop), false));
        engine.reconcile(&snapshot, &viewport);
        assert!(engine.scene().has_preview());
        intents.extend(engine.handle_pointer(&snapshot, &mut viewport, PointerEvent::Up(drop, PointerButton::Primary), false));
        for intent in intents {
            host.dispatch_intent(intent);
        }

        assert_eq!(host.selections, vec![vec![intro.id]]);
        assert_eq!(host.drags, (1, 1));
        assert_eq!(host.updates.len(), 1);
        let (task_id, update) = &host.updates[0];
        assert_eq!(*task_id, intro.id);
        assert_eq!(update.start_date, Some(data.epoch + chrono::Duration::days(2)));
        assert_eq!(update.staff_id, Some(data.staffs[1].id));
        assert_eq!(update.staff_line, Some(4));
    }

    #[test]
    fn other_buttons_do_not_end_a_drag_and_pan_release_is_per_button() {
        let data = Data::new();
        let mut engine = engine();
        let mut viewport = Viewport::default();
        engine.reconcile(&data.snapshot(), &viewport);
        let snapshot = data.snapshot();

        let intro = data.task("Intro");
        let layout = *engine.scene().layout(intro.id).unwrap();
        let transform = engine.transform(&viewport).unwrap();
        let grab = transform.to_screen(layout.top_left() + Vec2::new(6.0, layout.radius));
        let day_width = LayoutMetrics::new(engine.config(), &viewport).day_width;
        let drop = grab + Vec2::new(2.0 * day_width, 0.0);

        engine.handle_pointer(&snapshot, &mut viewport, PointerEvent::Down(grab, PointerButton::Primary), false);
        engine.handle_pointer(&snapshot, &mut viewport, PointerEvent::Move(drop), false);
        assert!(engine
            .handle_pointer(&snapshot, &mut viewport, PointerEvent::Down(drop, PointerButton::Secondary), false)
            .is_empty());
        assert!(engine
            .handle_pointer(&snapshot, &mut viewport, PointerEvent::Up(drop, PointerButton::Secondary), false)
            .is_empty());
        assert!(engine.controller().is_active());

        // A middle pan starting mid-drag does not swallow the primary release.
        engine.handle_pointer(&snapshot, &mut viewport, PointerEvent::Down(drop, PointerButton::Middle), false);
        let up = engine.handle_pointer(&snapshot, &mut viewport, PointerEvent::Up(drop, PointerButton::Primary), false);
        assert!(matches!(
            up.as_slice(),
            [EngineIntent::UpdateTask { .. }, EngineIntent::GestureEnded]
        ));
        assert!(!engine.controller().is_active());
        assert!(engine
            .handle_pointer(&snapshot, &mut viewport, PointerEvent::Up(drop, PointerButton::Middle), false)
            .is_empty());
        let before = viewport;
        engine.handle_pointer(&snapshot, &mut viewport, PointerEvent::Move(drop + Vec2::new(30.0, 0.0)), false);
        assert_eq!(viewport, before);
    }

    #[test]
    fn space_drag_and_middle_drag_pan_instead_of_selecting() {
        let data = Data::new();
        let mut engine = engine();
        let mut viewport = Viewport::default();
        engine.reconcile(&data.snapshot(), &viewport);
        let snapshot = data.snapshot();
        let start = Pos2::new(600.0, 300.0);

        let down = engine.handle_pointer(&snapshot, &mut viewport, PointerEvent::Down(start, PointerButton::Primary), true);
        assert!(down.is_empty());
        let moved = engine.handle_pointer(&snapshot, &mut viewport, PointerEvent::Move(start + Vec2::new(-48.0, 10.0)), true);
        assert_eq!(viewport.x, 48.0);
        assert_eq!(viewport.y, -10.0);
        assert_eq!(moved, vec![EngineIntent::ViewportChanged(viewport)]);
        assert!(engine
            .handle_pointer(&snapshot, &mut viewport, PointerEvent::Up(start, PointerButton::Primary), true)
            .is_empty());

        let mut zoomed = Viewport { zoom: 2.0, ..Viewport::default() };
        engine.handle_pointer(&snapshot, &mut zoomed, PointerEvent::Down(start, PointerButton::Middle), false);
        engine.handle_pointer(&snapshot, &mut zoomed, PointerEvent::Move(start + Vec2::new(-48.0, 0.0)), false);
        assert_eq!(zoomed.x, 24.0);
    }

    #[test]
    fn clicking_empty_space_clears_the_selection() {
        let data = Data::new();
        let mut engine = engine();
        let mut viewport = Viewport::default();
        engine.reconcile(&data.snapshot(), &viewport);
        let intents = engine.handle_pointer(
            &data.snapshot(),
            &mut viewport,
            PointerEvent::Down(Pos2::new(1100.0, 550.0), PointerButton::Primary),
            false,
        );
        assert_eq!(
            intents,
            vec![EngineIntent::Select {
                ids: vec![],
                anchor: None,
            }]
        );
    }

    #[test]
    fn wheel_zoom_keeps_the_point_under_the_cursor() {
        let mut engine = engine();
        let mut viewport = Viewport { x: 200.0, ..Viewport::default() };
        let pointer = Pos2::new(700.0, 300.0);
        let config = engine.config().clone();
        let world_at = |vp: &Viewport| {
            let metrics = LayoutMetrics::new(&config, vp);
            let t = SceneTransform::new(Pos2::new(10.0, 20.0), &metrics, vp);
            (t.to_layout(pointer).x - metrics.left_margin) / metrics.day_width
        };
        let before = world_at(&viewport);

        let wheel = WheelInput {
            delta: Vec2::new(0.0, 50.0),
            zoom: true,
            vertical_scale: false,
        };
        let intents = engine.handle_wheel(&mut viewport, wheel, pointer);
        assert!((viewport.zoom - 1.1).abs() < 1e-6);
        assert_eq!(intents, vec![EngineIntent::ViewportChanged(viewport)]);
        // Whole-pixel alignment allows at most a pixel of drift.
        assert!((world_at(&viewport) - before).abs() * 48.0 * viewport.zoom <= 1.0);

        let out = WheelInput {
            delta: Vec2::new(0.0, -50.0),
            ..wheel
        };
        for _ in 0..200 {
            engine.handle_wheel(&mut viewport, out, pointer);
        }
        assert_eq!(viewport.zoom, engine.config().min_zoom);
    }

    #[test]
    fn shift_ctrl_wheel_scales_vertically_and_plain_wheel_pans() {
        let mut engine = engine();
        let mut viewport = Viewport::default();
        let pointer = Pos2::new(500.0, 200.0);
        let intents = engine.handle_wheel(
            &mut viewport,
            WheelInput {
                delta: Vec2::new(0.0, 1.0),
                zoom: true,
                vertical_scale: true,
            },
            pointer,
        );
        assert_eq!(viewport.zoom, 1.0);
        assert!((viewport.vertical_scale - 1.1).abs() < 1e-6);
        assert_eq!(intents[0], EngineIntent::VerticalScaleChanged(viewport.vertical_scale));

        let mut host = RecordingHost::default();
        let mut plain = Viewport { zoom: 2.0, ..Viewport::default() };
        for intent in engine.handle_wheel(
            &mut plain,
            WheelInput {
                delta: Vec2::new(-40.0, 20.0),
                zoom: false,
                vertical_scale: false,
            },
            pointer,
        ) {
            host.dispatch_intent(intent);
        }
        assert_eq!(plain.x, 20.0);
        assert_eq!(plain.y, -20.0);
        assert_eq!(host.viewports, vec![plain]);
        assert!(host.scales.is_empty());
    }

    #[test]
    fn hover_shows_a_card_only_while_idle() {
        let data = Data::new();
        let mut engine = engine();
        let mut viewport = Viewport::default();
        engine.reconcile(&data.snapshot(), &viewport);
        let bridge = data.task("Bridge");
        let layout = *engine.scene().layout(bridge.id).unwrap();
        let transform = engine.transform(&viewport).unwrap();
        let over = transform.to_screen(layout.rect().center());

        engine.update_hover(&data.snapshot(), Some(over));
        assert_eq!(engine.scene().hover().map(|c| c.task_id), Some(bridge.id));
        engine.update_hover(&data.snapshot(), None);
        assert!(engine.scene().hover().is_none());

        engine.handle_pointer(&data.snapshot(), &mut viewport, PointerEvent::Down(over, PointerButton::Secondary), false);
        engine.update_hover(&data.snapshot(), Some(over));
        assert!(engine.scene().hover().is_none());
        assert_eq!(engine.cancel(), vec![EngineIntent::GestureEnded]);
    }

    #[test]
    fn destroy_clears_everything_and_later_calls_are_noops() {
        let data = Data::new();
        let mut engine = engine();
        let mut viewport = Viewport::default();
        engine.reconcile(&data.snapshot(), &viewport);
        engine.destroy();

        assert!(engine.is_destroyed());
        assert!(!engine.is_attached());
        assert_eq!(engine.scene().task_count(), 0);
        assert!(engine.index().is_empty());
        assert_eq!(engine.reconcile(&data.snapshot(), &viewport), FrameStats::default());
        assert!(engine
            .handle_pointer(&data.snapshot(), &mut viewport, PointerEvent::Down(Pos2::new(200.0, 80.0), PointerButton::Primary), false)
            .is_empty());
        assert!(engine.attach_surface(Rect::from_min_size(Pos2::ZERO, Vec2::splat(10.0)), 1.0).is_ok());
        assert!(!engine.is_attached());
        engine.destroy();
    }
}
