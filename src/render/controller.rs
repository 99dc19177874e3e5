//! Pointer gesture state machine: drag to reschedule, resize, link tasks.
//!
//! Transitions are plain functions of (state, context, input). They return the
//! intents to forward to the host and never touch the rendering surface.

use std::collections::HashMap;

use chrono::NaiveDate;
use egui::{PointerButton, Pos2, Rect, Vec2};
use uuid::Uuid;

use crate::config::EngineConfig;
use crate::model::{Dependency, DependencyKind, NewDependency, Task, TaskUpdate, Viewport};
use crate::render::layout::{
    date_to_day_index, day_index_to_date, find_nearest_staff_line, snap_x_to_day, snap_x_to_time,
    LayoutMetrics, StaffStack, TaskLayout,
};
use crate::render::spatial::SpatialIndex;

/// Everything the engine asks its host to do.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineIntent {
    /// Replace the selection. `anchor` is the screen point of the selected
    /// glyph's right edge.
    Select { ids: Vec<Uuid>, anchor: Option<Pos2> },
    GestureStarted,
    GestureEnded,
    UpdateTask {
        project_id: Uuid,
        task_id: Uuid,
        update: TaskUpdate,
    },
    CreateDependency {
        project_id: Uuid,
        dependency: NewDependency,
    },
    ViewportChanged(Viewport),
    VerticalScaleChanged(f32),
}

/// Read-only view of the current frame handed to every transition.
pub struct GestureContext<'a> {
    pub tasks: &'a HashMap<Uuid, Task>,
    pub dependencies: &'a HashMap<Uuid, Dependency>,
    pub staffs: StaffStack<'a>,
    pub layouts: &'a HashMap<Uuid, TaskLayout>,
    pub index: &'a SpatialIndex,
    pub metrics: LayoutMetrics,
    pub config: &'a EngineConfig,
    pub epoch: NaiveDate,
    pub project_id: Uuid,
}

/// A pointer event in layout space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointerInput {
    pub pos: Pos2,
    pub button: PointerButton,
}

impl PointerInput {
    pub fn primary(pos: Pos2) -> Self {
        Self {
            pos,
            button: PointerButton::Primary,
        }
    }

    pub fn secondary(pos: Pos2) -> Self {
        Self {
            pos,
            button: PointerButton::Secondary,
        }
    }
}

/// Snapped drop position of a dragged task.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DropTarget {
    pub day_index: i64,
    pub snapped_x: f32,
    pub staff_id: Uuid,
    pub staff_line: i32,
    pub center_y: f32,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub enum GestureState {
    #[default]
    Idle,
    Dragging {
        task_id: Uuid,
        /// Cursor offset from the glyph's top-left at press time.
        grab_offset: Vec2,
        origin: TaskLayout,
        latch: Option<DropTarget>,
    },
    Resizing {
        task_id: Uuid,
        start_x: f32,
        top_y: f32,
        radius: f32,
        original_days: u32,
        duration_days: u32,
    },
    CreatingDependency {
        source_id: Uuid,
        from: Pos2,
        target: Option<Uuid>,
    },
}

impl GestureState {
    /// Button that started the gesture.
    pub fn button(&self) -> Option<PointerButton> {
        match self {
            GestureState::Idle => None,
            GestureState::Dragging { .. } | GestureState::Resizing { .. } => Some(PointerButton::Primary),
            GestureState::CreatingDependency { .. } => Some(PointerButton::Secondary),
        }
    }
}

/// What the scene should draw for the gesture in flight, in layout space.
#[derive(Debug, Clone, PartialEq)]
pub enum GesturePreview {
    Ghost {
        rect: Rect,
        guide_y: f32,
        drop_marker: Pos2,
        valid: bool,
    },
    Resize {
        rect: Rect,
        duration_days: u32,
    },
    Link {
        from: Pos2,
        to: Pos2,
        snapped: bool,
    },
}

#[derive(Debug, Default)]
pub struct GestureController {
    state: GestureState,
    preview: Option<GesturePreview>,
}

impl GestureController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &GestureState {
        &self.state
    }

    pub fn is_active(&self) -> bool {
        self.state != GestureState::Idle
    }

    pub fn preview(&self) -> Option<&GesturePreview> {
        self.preview.as_ref()
    }

    pub fn pointer_down(&mut self, ctx: &GestureContext<'_>, input: PointerInput) -> Vec<EngineIntent> {
        if self.is_active() {
            return Vec::new();
        }
        let hit = ctx
            .index
            .top_hit(input.pos)
            .and_then(|id| ctx.layouts.get(&id).map(|layout| (id, *layout)));

        match (input.button, hit) {
            (PointerButton::Primary, Some((task_id, layout))) => {
                let original_days = ctx.tasks.get(&task_id).map_or(1, |t| t.duration_days);
                if input.pos.x >= layout.right_x() - ctx.config.resize_handle_px {
                    tracing::debug!(%task_id, "resize started");
                    self.state = GestureState::Resizing {
                        task_id,
                        start_x: layout.start_x,
                        top_y: layout.top_y,
                        radius: layout.radius,
                        original_days,
                        duration_days: original_days,
                    };
                } else {
                    tracing::debug!(%task_id, "drag started");
                    self.state = GestureState::Dragging {
                        task_id,
                        grab_offset: input.pos - layout.top_left(),
                        origin: layout,
                        latch: None,
                    };
                }
                vec![
                    EngineIntent::Select {
                        ids: vec![task_id],
                        anchor: Some(layout.anchors().right),
                    },
                    EngineIntent::GestureStarted,
                ]
            }
            (PointerButton::Primary, None) => vec![EngineIntent::Select {
                ids: Vec::new(),
                anchor: None,
            }],
            (PointerButton::Secondary, Some((source_id, layout))) => {
                tracing::debug!(%source_id, "dependency gesture started");
                let from = layout.anchors().right;
                self.state = GestureState::CreatingDependency {
                    source_id,
                    from,
                    target: None,
                };
                self.preview = Some(GesturePreview::Link {
                    from,
                    to: input.pos,
                    snapped: false,
                });
                vec![EngineIntent::GestureStarted]
            }
            _ => Vec::new(),
        }
    }

    pub fn pointer_move(&mut self, ctx: &GestureContext<'_>, pos: Pos2) -> Vec<EngineIntent> {
        match &mut self.state {
            GestureState::Idle => {}
            GestureState::Dragging {
                grab_offset,
                origin,
                latch,
                ..
            } => {
                let top_left = pos - *grab_offset;
                let center_y = top_left.y + origin.radius;
                let time = snap_x_to_time(top_left.x, &ctx.metrics, ctx.metrics.zoom, ctx.epoch);
                // Commits are whole days, so an hour tick lands on the nearest day.
                let (snapped_x, day_index) = snap_x_to_day(time.snapped_x, &ctx.metrics);
                let hit = find_nearest_staff_line(center_y, &ctx.staffs, &ctx.metrics)
                    .filter(|hit| (hit.center_y - center_y).abs() <= ctx.config.snap_tolerance);
                let valid = hit.is_some();
                if let Some(hit) = hit {
                    *latch = Some(DropTarget {
                        day_index,
                        snapped_x,
                        staff_id: hit.staff_id,
                        staff_line: hit.staff_line,
                        center_y: hit.center_y,
                    });
                }
                let size = Vec2::new(origin.width, origin.radius * 2.0);
                self.preview = Some(match (valid, *latch) {
                    (true, Some(target)) => GesturePreview::Ghost {
                        rect: Rect::from_min_size(
                            Pos2::new(target.snapped_x, target.center_y - origin.radius),
                            size,
                        ),
                        guide_y: target.center_y,
                        drop_marker: Pos2::new(target.snapped_x, target.center_y),
                        valid: true,
                    },
                    (_, latched) => GesturePreview::Ghost {
                        rect: Rect::from_min_size(top_left, size),
                        guide_y: center_y,
                        drop_marker: latched
                            .map_or(Pos2::new(top_left.x, center_y), |t| Pos2::new(t.snapped_x, t.center_y)),
                        valid: false,
                    },
                });
            }
            GestureState::Resizing {
                start_x,
                top_y,
                radius,
                duration_days,
                ..
            } => {
                let dw = ctx.metrics.day_width;
                if dw > 0.0 {
                    let days = ((pos.x - *start_x) / dw).round();
                    *duration_days = if days.is_finite() && days >= 1.0 {
                        days.min(u32::MAX as f32) as u32
                    } else {
                        1
                    };
                }
                let width = (pos.x - *start_x).max(dw);
                self.preview = Some(GesturePreview::Resize {
                    rect: Rect::from_min_size(Pos2::new(*start_x, *top_y), Vec2::new(width, *radius * 2.0)),
                    duration_days: *duration_days,
                });
            }
            GestureState::CreatingDependency {
                source_id,
                from,
                target,
            } => {
                let snapped = link_target(ctx, pos, *source_id);
                *target = snapped.map(|(id, _)| id);
                self.preview = Some(GesturePreview::Link {
                    from: *from,
                    to: snapped.map_or(pos, |(_, anchor)| anchor),
                    snapped: snapped.is_some(),
                });
            }
        }
        Vec::new()
    }

    /// Releases of a button other than the one that started the gesture are ignored.
    pub fn pointer_up(&mut self, ctx: &GestureContext<'_>, input: PointerInput) -> Vec<EngineIntent> {
        if self.state.button().is_some_and(|button| button != input.button) {
            return Vec::new();
        }
        let state = std::mem::take(&mut self.state);
        self.preview = None;
        let mut intents = Vec::new();
        match state {
            GestureState::Idle => return intents,
            GestureState::Dragging { task_id, latch, .. } => {
                if let Some(update) = latch.and_then(|target| drag_update(ctx, task_id, target)) {
                    tracing::debug!(%task_id, ?update, "drag committed");
                    intents.push(EngineIntent::UpdateTask {
                        project_id: ctx.project_id,
                        task_id,
                        update,
                    });
                }
            }
            GestureState::Resizing {
                task_id,
                original_days,
                duration_days,
                ..
            } => {
                if duration_days != original_days {
                    tracing::debug!(%task_id, duration_days, "resize committed");
                    intents.push(EngineIntent::UpdateTask {
                        project_id: ctx.project_id,
                        task_id,
                        update: TaskUpdate {
                            duration_days: Some(duration_days),
                            ..Default::default()
                        },
                    });
                }
            }
            GestureState::CreatingDependency { source_id, .. } => {
                let target = link_target(ctx, input.pos, source_id).map(|(id, _)| id);
                if let Some(dependency) = target.and_then(|t| new_dependency(ctx, source_id, t)) {
                    tracing::debug!(
                        src = %dependency.src_task_id,
                        dst = %dependency.dst_task_id,
                        "dependency committed"
                    );
                    intents.push(EngineIntent::CreateDependency {
                        project_id: ctx.project_id,
                        dependency,
                    });
                }
            }
        }
        intents.push(EngineIntent::GestureEnded);
        intents
    }

    /// Abandon the gesture in flight without committing anything.
    pub fn cancel(&mut self) -> Vec<EngineIntent> {
        self.preview = None;
        if std::mem::take(&mut self.state) == GestureState::Idle {
            return Vec::new();
        }
        tracing::debug!("gesture cancelled");
        vec![EngineIntent::GestureEnded]
    }
}

/// Task under `pos` other than `source_id`, with its left anchor.
fn link_target(ctx: &GestureContext<'_>, pos: Pos2, source_id: Uuid) -> Option<(Uuid, Pos2)> {
    ctx.index
        .point_query(pos)
        .into_iter()
        .rev()
        .find(|id| *id != source_id)
        .and_then(|id| ctx.layouts.get(&id).map(|layout| (id, layout.anchors().left)))
}

fn drag_update(ctx: &GestureContext<'_>, task_id: Uuid, target: DropTarget) -> Option<TaskUpdate> {
    let task = ctx.tasks.get(&task_id)?;
    let start_date = day_index_to_date(target.day_index, ctx.epoch)?;
    let unchanged = date_to_day_index(task.start_date, ctx.epoch) == target.day_index
        && task.staff_id == target.staff_id
        && task.staff_line == target.staff_line;
    if unchanged {
        return None;
    }
    Some(TaskUpdate {
        start_date: Some(start_date),
        duration_days: None,
        staff_id: Some(target.staff_id),
        staff_line: Some(target.staff_line),
    })
}

/// Orient the link earlier start → later start and drop it if the pair is
/// already linked in either direction.
fn new_dependency(ctx: &GestureContext<'_>, source_id: Uuid, target_id: Uuid) -> Option<NewDependency> {
    let source = ctx.tasks.get(&source_id)?;
    let target = ctx.tasks.get(&target_id)?;
    let (src, dst) = if target.start_date < source.start_date {
        (target.id, source.id)
    } else {
        (source.id, target.id)
    };
    if ctx.dependencies.values().any(|dep| dep.links(src, dst)) {
        tracing::debug!(%src, %dst, "tasks already linked");
        return None;
    }
    Some(NewDependency {
        id: Uuid::new_v4(),
        src_task_id: src,
        dst_task_id: dst,
        kind: DependencyKind::FinishToStart,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Staff;
    use crate::render::layout::compute_task_layout;

    struct World {
        tasks: HashMap<Uuid, Task>,
        dependencies: HashMap<Uuid, Dependency>,
        staffs: Vec<Staff>,
        layouts: HashMap<Uuid, TaskLayout>,
        index: SpatialIndex,
        config: EngineConfig,
        metrics: LayoutMetrics,
        epoch: NaiveDate,
        project_id: Uuid,
    }

    impl World {
        fn new(staffs: Vec<Staff>, tasks: Vec<Task>) -> Self {
            Self::at(staffs, tasks, Viewport::default())
        }

        fn at(staffs: Vec<Staff>, tasks: Vec<Task>, viewport: Viewport) -> Self {
            let config = EngineConfig::default();
            let metrics = LayoutMetrics::new(&config, &viewport);
            let epoch = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
            let mut world = Self {
                tasks: tasks.into_iter().map(|t| (t.id, t)).collect(),
                dependencies: HashMap::new(),
                staffs,
                layouts: HashMap::new(),
                index: SpatialIndex::new(config.spatial_cell_size),
                config,
                metrics,
                epoch,
                project_id: Uuid::new_v4(),
            };
            world.rebuild();
            world
        }

        fn rebuild(&mut self) {
            let stack = StaffStack::new(&self.staffs);
            self.layouts.clear();
            self.index.clear();
            for task in self.tasks.values() {
                if let Some(layout) = compute_task_layout(&self.metrics, task, self.epoch, &stack) {
                    self.index.insert(task.id, layout.rect());
                    self.layouts.insert(task.id, layout);
                }
            }
        }

        fn ctx(&self) -> GestureContext<'_> {
            GestureContext {
                tasks: &self.tasks,
                dependencies: &self.dependencies,
                staffs: StaffStack::new(&self.staffs),
                layouts: &self.layouts,
                index: &self.index,
                metrics: self.metrics,
                config: &self.config,
                epoch: self.epoch,
                project_id: self.project_id,
            }
        }

        fn day(&self, n: i64) -> NaiveDate {
            day_index_to_date(n, self.epoch).unwrap()
        }

        fn layout(&self, id: Uuid) -> TaskLayout {
            self.layouts[&id]
        }
    }

    fn one_staff() -> Vec<Staff> {
        vec![Staff::new("Melody", 5, 0)]
    }

    fn updates(intents: &[EngineIntent]) -> Vec<&TaskUpdate> {
        intents
            .iter()
            .filter_map(|i| match i {
                EngineIntent::UpdateTask { update, .. } => Some(update),
                _ => None,
            })
            .collect()
    }

    fn links(intents: &[EngineIntent]) -> Vec<&NewDependency> {
        intents
            .iter()
            .filter_map(|i| match i {
                EngineIntent::CreateDependency { dependency, .. } => Some(dependency),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn drag_commits_snapped_day_and_line_once_on_release() {
        let staffs = one_staff();
        let epoch = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let task = Task::new("Verse", Uuid::nil(), staffs[0].id, epoch, 3).with_line(4);
        let id = task.id;
        let world = World::new(staffs, vec![task]);
        let ctx = world.ctx();
        let layout = world.layout(id);
        let mut controller = GestureController::new();
        let mut all = Vec::new();

        let grab = layout.top_left() + Vec2::new(8.0, 8.0);
        let down = controller.pointer_down(&ctx, PointerInput::primary(grab));
        assert_eq!(
            down,
            vec![
                EngineIntent::Select {
                    ids: vec![id],
                    anchor: Some(layout.anchors().right),
                },
                EngineIntent::GestureStarted,
            ]
        );
        assert!(matches!(controller.state(), GestureState::Dragging { .. }));

        // Target: day 5 on line 2, nudged a few pixels off the exact spot.
        let m = &world.metrics;
        let target_x = m.task_origin_x() + 5.0 * m.day_width + 8.0 + 5.0;
        let target_y = m.line_y(0, 2) + 3.0;
        for step in 1..=4 {
            let t = step as f32 / 4.0;
            let pos = grab + (Pos2::new(target_x, target_y) - grab) * t;
            all.extend(controller.pointer_move(&ctx, pos));
        }
        match controller.preview() {
            Some(GesturePreview::Ghost { valid, guide_y, .. }) => {
                assert!(*valid);
                assert_eq!(*guide_y, m.line_y(0, 2));
            }
            other => panic!("unexpected preview {other:?}"),
        }
        assert!(updates(&all).is_empty());

        let up = controller.pointer_up(&ctx, PointerInput::primary(Pos2::new(target_x, target_y)));
        all.extend(up.iter().cloned());
        let committed = updates(&all);
        assert_eq!(committed.len(), 1);
        assert_eq!(committed[0].start_date, Some(world.day(5)));
        assert_eq!(committed[0].staff_line, Some(2));
        assert_eq!(committed[0].staff_id, Some(world.staffs[0].id));
        assert_eq!(committed[0].duration_days, None);
        assert_eq!(up.last(), Some(&EngineIntent::GestureEnded));
        assert_eq!(controller.state(), &GestureState::Idle);
        assert!(controller.preview().is_none());
    }

    #[test]
    fn drag_out_of_tolerance_keeps_last_latch_and_flags_invalid() {
        let staffs = one_staff();
        let epoch = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let task = Task::new("Verse", Uuid::nil(), staffs[0].id, epoch, 3);
        let id = task.id;
        let world = World::new(staffs, vec![task]);
        let ctx = world.ctx();
        let m = world.metrics;
        let grab = world.layout(id).top_left() + Vec2::new(4.0, 8.0);
        let mut controller = GestureController::new();
        controller.pointer_down(&ctx, PointerInput::primary(grab));

        let latched = Pos2::new(grab.x + 2.0 * m.day_width, m.line_y(0, 4));
        controller.pointer_move(&ctx, latched);
        controller.pointer_move(&ctx, Pos2::new(grab.x + 9.0 * m.day_width, 2_000.0));
        assert!(matches!(
            controller.preview(),
            Some(GesturePreview::Ghost { valid: false, .. })
        ));

        let up = controller.pointer_up(&ctx, PointerInput::primary(Pos2::new(0.0, 2_000.0)));
        let committed = updates(&up);
        assert_eq!(committed.len(), 1);
        assert_eq!(committed[0].start_date, Some(world.day(2)));
        assert_eq!(committed[0].staff_line, Some(4));
    }

    #[test]
    fn click_without_movement_commits_nothing() {
        let staffs = one_staff();
        let epoch = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let task = Task::new("Verse", Uuid::nil(), staffs[0].id, epoch, 3).with_line(2);
        let id = task.id;
        let world = World::new(staffs, vec![task]);
        let ctx = world.ctx();
        let layout = world.layout(id);
        let mut controller = GestureController::new();

        let grab = layout.top_left() + Vec2::new(10.0, layout.radius);
        controller.pointer_down(&ctx, PointerInput::primary(grab));
        assert_eq!(
            controller.pointer_up(&ctx, PointerInput::primary(grab)),
            vec![EngineIntent::GestureEnded]
        );

        // Moving back onto the original slot is not a change either.
        controller.pointer_down(&ctx, PointerInput::primary(grab));
        controller.pointer_move(&ctx, grab + Vec2::new(3.0, 2.0));
        assert!(updates(&controller.pointer_up(&ctx, PointerInput::primary(grab))).is_empty());
    }

    #[test]
    fn resize_rounds_to_whole_days_and_clamps_to_one() {
        let staffs = one_staff();
        let epoch = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let task = Task::new("Chorus", Uuid::nil(), staffs[0].id, epoch, 2);
        let id = task.id;
        let world = World::new(staffs, vec![task]);
        let ctx = world.ctx();
        let layout = world.layout(id);
        let dw = world.metrics.day_width;
        let handle = Pos2::new(layout.right_x() - 2.0, layout.center_y);

        let mut controller = GestureController::new();
        controller.pointer_down(&ctx, PointerInput::primary(handle));
        assert!(matches!(controller.state(), GestureState::Resizing { .. }));
        controller.pointer_move(&ctx, Pos2::new(layout.start_x + 5.2 * dw, handle.y));
        assert!(matches!(
            controller.preview(),
            Some(GesturePreview::Resize { duration_days: 5, .. })
        ));
        let up = controller.pointer_up(&ctx, PointerInput::primary(handle));
        assert_eq!(updates(&up)[0].duration_days, Some(5));
        assert_eq!(updates(&up)[0].start_date, None);

        controller.pointer_down(&ctx, PointerInput::primary(handle));
        controller.pointer_move(&ctx, Pos2::new(layout.start_x - 3.0 * dw, handle.y));
        match controller.preview() {
            Some(GesturePreview::Resize { rect, duration_days }) => {
                assert_eq!(*duration_days, 1);
                assert_eq!(rect.width(), dw);
            }
            other => panic!("unexpected preview {other:?}"),
        }
        let up = controller.pointer_up(&ctx, PointerInput::primary(handle));
        assert_eq!(updates(&up)[0].duration_days, Some(1));
    }

    #[test]
    fn hour_scale_drop_lands_where_the_ghost_was_drawn() {
        let staffs = one_staff();
        let epoch = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let task = Task::new("Bridge", Uuid::nil(), staffs[0].id, epoch, 2);
        let id = task.id;
        let viewport = Viewport {
            zoom: 2.0,
            ..Viewport::default()
        };
        let world = World::at(staffs, vec![task], viewport);
        let ctx = world.ctx();
        let m = world.metrics;
        let layout = world.layout(id);
        let mut controller = GestureController::new();

        let offset = Vec2::new(8.0, layout.radius);
        controller.pointer_down(&ctx, PointerInput::primary(layout.top_left() + offset));
        // Day 4 plus 23 hours, on line 2.
        let hour = m.day_width / 24.0;
        let top_left = Pos2::new(
            m.task_origin_x() + 4.0 * m.day_width + 23.0 * hour,
            m.line_y(0, 2) - layout.radius,
        );
        controller.pointer_move(&ctx, top_left + offset);

        let ghost_x = match controller.preview() {
            Some(GesturePreview::Ghost { rect, drop_marker, valid: true, .. }) => {
                assert_eq!(drop_marker.x, rect.min.x);
                rect.min.x
            }
            other => panic!("unexpected preview {other:?}"),
        };
        let up = controller.pointer_up(&ctx, PointerInput::primary(top_left + offset));
        let committed = updates(&up);
        assert_eq!(committed[0].start_date, Some(world.day(5)));
        assert_eq!(ghost_x, m.task_origin_x() + 5.0 * m.day_width);
    }

    #[test]
    fn only_the_starting_button_ends_a_gesture() {
        let staffs = one_staff();
        let epoch = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let task = Task::new("Verse", Uuid::nil(), staffs[0].id, epoch, 3);
        let id = task.id;
        let world = World::new(staffs, vec![task]);
        let ctx = world.ctx();
        let m = world.metrics;
        let grab = world.layout(id).top_left() + Vec2::new(4.0, 8.0);
        let mut controller = GestureController::new();

        controller.pointer_down(&ctx, PointerInput::primary(grab));
        let moved = grab + Vec2::new(2.0 * m.day_width, 0.0);
        controller.pointer_move(&ctx, moved);
        assert!(controller.pointer_down(&ctx, PointerInput::secondary(moved)).is_empty());
        assert!(controller.pointer_up(&ctx, PointerInput::secondary(moved)).is_empty());
        let middle = PointerInput {
            pos: moved,
            button: PointerButton::Middle,
        };
        assert!(controller.pointer_up(&ctx, middle).is_empty());
        assert!(matches!(controller.state(), GestureState::Dragging { .. }));
        assert!(controller.preview().is_some());

        let up = controller.pointer_up(&ctx, PointerInput::primary(moved));
        assert_eq!(updates(&up)[0].start_date, Some(world.day(2)));
        assert_eq!(up.last(), Some(&EngineIntent::GestureEnded));

        let center = world.layout(id).rect().center();
        controller.pointer_down(&ctx, PointerInput::secondary(center));
        assert!(controller.pointer_up(&ctx, PointerInput::primary(center)).is_empty());
        assert!(matches!(controller.state(), GestureState::CreatingDependency { .. }));
        assert_eq!(
            controller.pointer_up(&ctx, PointerInput::secondary(center)),
            vec![EngineIntent::GestureEnded]
        );
    }

    fn two_tasks(a_day: i64, b_day: i64) -> (World, Uuid, Uuid) {
        let staffs = vec![Staff::new("Upper", 5, 0), Staff::new("Lower", 5, 1)];
        let epoch = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let a = Task::new("A", Uuid::nil(), staffs[0].id, day_index_to_date(a_day, epoch).unwrap(), 2);
        let b = Task::new("B", Uuid::nil(), staffs[1].id, day_index_to_date(b_day, epoch).unwrap(), 2);
        let (a_id, b_id) = (a.id, b.id);
        (World::new(staffs, vec![a, b]), a_id, b_id)
    }

    fn link(world: &World, from: Uuid, to: Uuid) -> Vec<EngineIntent> {
        let ctx = world.ctx();
        let mut controller = GestureController::new();
        let from_pos = world.layout(from).rect().center();
        let to_pos = world.layout(to).rect().center();
        assert_eq!(
            controller.pointer_down(&ctx, PointerInput::secondary(from_pos)),
            vec![EngineIntent::GestureStarted]
        );
        controller.pointer_move(&ctx, to_pos);
        assert_eq!(
            controller.preview(),
            Some(&GesturePreview::Link {
                from: world.layout(from).anchors().right,
                to: world.layout(to).anchors().left,
                snapped: true,
            })
        );
        controller.pointer_up(&ctx, PointerInput::secondary(to_pos))
    }

    #[test]
    fn dependency_runs_from_earlier_to_later_start() {
        let (world, a, b) = two_tasks(5, 1);
        let up = link(&world, a, b);
        let created = links(&up);
        assert_eq!(created.len(), 1);
        assert_eq!((created[0].src_task_id, created[0].dst_task_id), (b, a));
        assert_eq!(created[0].kind, DependencyKind::FinishToStart);

        let (world, a, b) = two_tasks(1, 5);
        let created = link(&world, a, b);
        assert_eq!((links(&created)[0].src_task_id, links(&created)[0].dst_task_id), (a, b));
    }

    #[test]
    fn equal_starts_keep_the_gesture_source_first() {
        let (world, a, b) = two_tasks(3, 3);
        let up = link(&world, b, a);
        assert_eq!((links(&up)[0].src_task_id, links(&up)[0].dst_task_id), (b, a));
    }

    #[test]
    fn existing_links_are_not_duplicated_in_either_direction() {
        let (mut world, a, b) = two_tasks(1, 5);
        let existing = Dependency::new(world.project_id, a, b);
        world.dependencies.insert(existing.id, existing);

        for (from, to) in [(a, b), (b, a)] {
            let up = link(&world, from, to);
            assert!(links(&up).is_empty());
            assert_eq!(up, vec![EngineIntent::GestureEnded]);
        }
    }

    #[test]
    fn link_released_on_empty_space_or_source_commits_nothing() {
        let (world, a, _) = two_tasks(1, 5);
        let ctx = world.ctx();
        let mut controller = GestureController::new();
        let from = world.layout(a).rect().center();
        controller.pointer_down(&ctx, PointerInput::secondary(from));
        controller.pointer_move(&ctx, Pos2::new(-500.0, -500.0));
        assert!(matches!(
            controller.preview(),
            Some(GesturePreview::Link { snapped: false, .. })
        ));
        assert_eq!(
            controller.pointer_up(&ctx, PointerInput::secondary(Pos2::new(-500.0, -500.0))),
            vec![EngineIntent::GestureEnded]
        );

        controller.pointer_down(&ctx, PointerInput::secondary(from));
        assert!(links(&controller.pointer_up(&ctx, PointerInput::secondary(from))).is_empty());
    }

    #[test]
    fn background_click_clears_selection_and_cancel_returns_to_idle() {
        let (world, a, _) = two_tasks(1, 5);
        let ctx = world.ctx();
        let mut controller = GestureController::new();
        assert_eq!(
            controller.pointer_down(&ctx, PointerInput::primary(Pos2::new(-100.0, -100.0))),
            vec![EngineIntent::Select {
                ids: vec![],
                anchor: None,
            }]
        );
        assert!(!controller.is_active());
        assert!(controller.cancel().is_empty());

        controller.pointer_down(&ctx, PointerInput::primary(world.layout(a).rect().center()));
        controller.pointer_move(&ctx, Pos2::new(900.0, 90.0));
        assert_eq!(controller.cancel(), vec![EngineIntent::GestureEnded]);
        assert!(!controller.is_active());
        assert!(controller.preview().is_none());
        assert!(controller
            .pointer_up(&ctx, PointerInput::primary(Pos2::ZERO))
            .is_empty());
    }
}
