//! Layout math: calendar days, staffs and half-steps to pixels and back.
//!
//! Everything here is pure. Positions are in *layout space*: pixels at the
//! current zoom and vertical scale, before the viewport pan is applied.
//! [`SceneTransform`] maps layout space to the screen.

use std::collections::HashMap;

use chrono::{Datelike, Days, NaiveDate};
use egui::{Pos2, Rect, Vec2};
use uuid::Uuid;

use crate::config::{EngineConfig, MeasureConfig};
use crate::model::{Staff, Task, Viewport};

pub const MS_PER_HOUR: i64 = 3_600_000;
pub const MS_PER_DAY: i64 = 24 * MS_PER_HOUR;

/// Minimum horizontal room for one date label before labels get thinned.
const MIN_LABEL_SPACING: f32 = 30.0;
/// Upper bound on generated grid lines, whatever the step.
const MAX_GRID_LINES: i64 = 4096;

/// Configuration resolved at the current zoom and vertical scale.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LayoutMetrics {
    pub left_margin: f32,
    pub top_margin: f32,
    /// Width of one day at zoom 1.
    pub base_day_width: f32,
    /// Width of one day at the current zoom.
    pub day_width: f32,
    pub staff_spacing: f32,
    pub staff_line_spacing: f32,
    pub task_height: f32,
    pub start_padding: f32,
    pub gutter: f32,
    pub min_width: f32,
    pub zoom: f32,
    pub vertical_scale: f32,
}

impl LayoutMetrics {
    pub fn new(config: &EngineConfig, viewport: &Viewport) -> Self {
        let zoom = sanitize_scale(viewport.zoom);
        let vertical_scale = sanitize_scale(viewport.vertical_scale);
        Self {
            left_margin: config.left_margin,
            top_margin: config.top_margin,
            base_day_width: config.day_width,
            day_width: config.day_width * zoom,
            staff_spacing: config.staff_spacing * vertical_scale,
            staff_line_spacing: config.staff_line_spacing * vertical_scale,
            task_height: config.task_height * vertical_scale,
            start_padding: config.start_padding,
            gutter: config.gutter,
            min_width: config.min_task_width,
            zoom,
            vertical_scale,
        }
    }

    /// Layout x of the left edge of day zero.
    pub fn day_origin_x(&self) -> f32 {
        self.left_margin
    }

    /// Layout x where a task starting on day zero begins.
    pub fn task_origin_x(&self) -> f32 {
        self.left_margin + self.start_padding
    }

    pub fn half_step(&self) -> f32 {
        self.staff_line_spacing / 2.0
    }

    pub fn radius(&self) -> f32 {
        self.task_height / 2.0
    }

    pub fn day_boundary_x(&self, day_index: i64) -> f32 {
        self.left_margin + day_index as f32 * self.day_width
    }

    /// Layout y of the top line of the staff at `staff_index`.
    pub fn staff_top_y(&self, staff_index: usize) -> f32 {
        self.top_margin + staff_index as f32 * self.staff_spacing
    }

    pub fn line_y(&self, staff_index: usize, staff_line: i32) -> f32 {
        self.staff_top_y(staff_index) + staff_line as f32 * self.half_step()
    }

    /// Viewport pan expressed in days.
    pub fn viewport_x_days(&self, viewport: &Viewport) -> f64 {
        if self.base_day_width <= 0.0 {
            return 0.0;
        }
        f64::from(viewport.x) / f64::from(self.base_day_width)
    }
}

fn sanitize_scale(scale: f32) -> f32 {
    if scale.is_finite() && scale > 0.0 {
        scale
    } else {
        1.0
    }
}

/// Pixel geometry of one task glyph, in layout space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TaskLayout {
    pub start_x: f32,
    pub center_y: f32,
    pub top_y: f32,
    pub width: f32,
    pub radius: f32,
}

impl TaskLayout {
    pub fn rect(&self) -> Rect {
        Rect::from_min_size(
            Pos2::new(self.start_x, self.top_y),
            Vec2::new(self.width, self.radius * 2.0),
        )
    }

    pub fn right_x(&self) -> f32 {
        self.start_x + self.width
    }

    pub fn top_left(&self) -> Pos2 {
        Pos2::new(self.start_x, self.top_y)
    }

    pub fn anchors(&self) -> TaskAnchors {
        TaskAnchors {
            left: Pos2::new(self.start_x, self.center_y),
            right: Pos2::new(self.right_x(), self.center_y),
        }
    }
}

/// Dependency curve endpoints of a task glyph.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TaskAnchors {
    pub left: Pos2,
    pub right: Pos2,
}

/// Staffs in vertical order with an id → index lookup.
#[derive(Debug, Clone)]
pub struct StaffStack<'a> {
    ordered: Vec<&'a Staff>,
    index: HashMap<Uuid, usize>,
}

impl<'a> StaffStack<'a> {
    pub fn new(staffs: &'a [Staff]) -> Self {
        let ordered = crate::model::ordered_staffs(staffs);
        let index = ordered
            .iter()
            .enumerate()
            .map(|(i, s)| (s.id, i))
            .collect();
        Self { ordered, index }
    }

    pub fn index_of(&self, staff_id: Uuid) -> Option<usize> {
        self.index.get(&staff_id).copied()
    }

    pub fn get(&self, index: usize) -> Option<&'a Staff> {
        self.ordered.get(index).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, &'a Staff)> + '_ {
        self.ordered.iter().copied().enumerate()
    }

    pub fn len(&self) -> usize {
        self.ordered.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ordered.is_empty()
    }
}

// ─── Dates ──────────────────────────────────────────────────────────────────

/// Whole days from `epoch` to `date`. Calendar arithmetic, no time zones.
pub fn date_to_day_index(date: NaiveDate, epoch: NaiveDate) -> i64 {
    (date - epoch).num_days()
}

pub fn day_index_to_date(day_index: i64, epoch: NaiveDate) -> Option<NaiveDate> {
    if day_index >= 0 {
        epoch.checked_add_days(Days::new(day_index.unsigned_abs()))
    } else {
        epoch.checked_sub_days(Days::new(day_index.unsigned_abs()))
    }
}

/// `YYYY-MM-DD` for the given day index, or `None` outside the calendar range.
pub fn day_index_to_iso_date(day_index: i64, epoch: NaiveDate) -> Option<String> {
    day_index_to_date(day_index, epoch).map(|d| d.format("%Y-%m-%d").to_string())
}

fn first_of_month(date: NaiveDate) -> NaiveDate {
    date.with_day(1).unwrap_or(date)
}

fn next_month(date: NaiveDate) -> Option<NaiveDate> {
    let (y, m) = if date.month() == 12 {
        (date.year() + 1, 1)
    } else {
        (date.year(), date.month() + 1)
    };
    NaiveDate::from_ymd_opt(y, m, 1)
}

// ─── Task geometry ──────────────────────────────────────────────────────────

/// Geometry of `task`, or `None` when its staff is not part of `staffs`.
pub fn compute_task_layout(
    metrics: &LayoutMetrics,
    task: &Task,
    epoch: NaiveDate,
    staffs: &StaffStack<'_>,
) -> Option<TaskLayout> {
    let staff_index = staffs.index_of(task.staff_id)?;
    let day_index = date_to_day_index(task.start_date, epoch);
    let start_x = metrics.task_origin_x() + day_index as f32 * metrics.day_width;
    let width = (task.duration_days.max(1) as f32 * metrics.day_width - metrics.gutter)
        .max(metrics.min_width);
    let radius = metrics.radius();
    let center_y = metrics.line_y(staff_index, task.staff_line);
    Some(TaskLayout {
        start_x,
        center_y,
        top_y: center_y - radius,
        width,
        radius,
    })
}

// ─── Time scales ────────────────────────────────────────────────────────────

/// Grid and label granularity for a zoom level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimeScale {
    Hour,
    Day,
    Week,
    Month,
}

impl TimeScale {
    pub fn label(self) -> &'static str {
        match self {
            TimeScale::Hour => "Hours",
            TimeScale::Day => "Days",
            TimeScale::Week => "Weeks",
            TimeScale::Month => "Months",
        }
    }
}

/// Fixed zoom bands: hour ≥ 2.0, day ≥ 0.75, week ≥ 0.35, month below.
pub fn time_scale_for_zoom(zoom: f32) -> TimeScale {
    if zoom >= 2.0 {
        TimeScale::Hour
    } else if zoom >= 0.75 {
        TimeScale::Day
    } else if zoom >= 0.35 {
        TimeScale::Week
    } else {
        TimeScale::Month
    }
}

/// Result of snapping a layout x to the active time scale.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimeSnap {
    pub snapped_x: f32,
    /// Day containing the snapped instant.
    pub day_index: i64,
    /// Offset of the snapped instant from the epoch.
    pub offset_ms: i64,
    pub scale: TimeScale,
}

/// Round a task-start x to the nearest day. Idempotent with [`compute_task_layout`].
pub fn snap_x_to_day(x: f32, metrics: &LayoutMetrics) -> (f32, i64) {
    if metrics.day_width <= 0.0 {
        return (metrics.task_origin_x(), 0);
    }
    let day = ((x - metrics.task_origin_x()) / metrics.day_width).round() as i64;
    (metrics.task_origin_x() + day as f32 * metrics.day_width, day)
}

/// Round a task-start x to the nearest tick of the scale active at `zoom`.
pub fn snap_x_to_time(x: f32, metrics: &LayoutMetrics, zoom: f32, epoch: NaiveDate) -> TimeSnap {
    let scale = time_scale_for_zoom(zoom);
    let origin = metrics.task_origin_x();
    let dw = metrics.day_width;
    if dw <= 0.0 {
        return TimeSnap {
            snapped_x: origin,
            day_index: 0,
            offset_ms: 0,
            scale,
        };
    }
    let days_f = f64::from(x - origin) / f64::from(dw);
    let day_snap = |day: i64| TimeSnap {
        snapped_x: origin + day as f32 * dw,
        day_index: day,
        offset_ms: day * MS_PER_DAY,
        scale,
    };

    match scale {
        TimeScale::Hour => {
            let hours = (days_f * 24.0).round() as i64;
            TimeSnap {
                snapped_x: origin + hours as f32 * dw / 24.0,
                day_index: hours.div_euclid(24),
                offset_ms: hours * MS_PER_HOUR,
                scale,
            }
        }
        TimeScale::Day => day_snap(days_f.round() as i64),
        TimeScale::Week => {
            // Day indices d with (shift + d) % 7 == 0 are Mondays.
            let shift = i64::from(epoch.weekday().num_days_from_monday());
            let week = ((days_f + shift as f64) / 7.0).round() as i64;
            day_snap(week * 7 - shift)
        }
        TimeScale::Month => {
            let floor_day = days_f.floor() as i64;
            let Some(date) = day_index_to_date(floor_day, epoch) else {
                return day_snap(days_f.round() as i64);
            };
            let this_start = date_to_day_index(first_of_month(date), epoch);
            let next_start = next_month(date)
                .map(|d| date_to_day_index(d, epoch))
                .unwrap_or(this_start);
            let nearest = if (days_f - this_start as f64).abs() <= (next_start as f64 - days_f).abs() {
                this_start
            } else {
                next_start
            };
            day_snap(nearest)
        }
    }
}

// ─── Staff snapping ─────────────────────────────────────────────────────────

/// Closest staff line or space to a layout y.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StaffLineHit {
    pub staff_id: Uuid,
    pub staff_index: usize,
    pub staff_line: i32,
    pub center_y: f32,
}

/// Exhaustive nearest half-step search. Ties resolve to the first staff in
/// position order, then to the lower half-step.
pub fn find_nearest_staff_line(
    y: f32,
    staffs: &StaffStack<'_>,
    metrics: &LayoutMetrics,
) -> Option<StaffLineHit> {
    let mut best: Option<(f32, StaffLineHit)> = None;
    for (staff_index, staff) in staffs.iter() {
        for staff_line in 0..=staff.max_half_step() {
            let center_y = metrics.line_y(staff_index, staff_line);
            let distance = (y - center_y).abs();
            if best.as_ref().map_or(true, |(d, _)| distance < *d) {
                best = Some((
                    distance,
                    StaffLineHit {
                        staff_id: staff.id,
                        staff_index,
                        staff_line,
                        center_y,
                    },
                ));
            }
        }
    }
    best.map(|(_, hit)| hit)
}

// ─── Viewport alignment ─────────────────────────────────────────────────────

/// Viewport pan split into whole days plus a whole-pixel remainder.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewportAlignment {
    pub quantized_days: i64,
    pub pixel_offset: f32,
    day_width: f32,
}

impl ViewportAlignment {
    /// Integral pixel shift applied to every layout x.
    pub fn shift_px(&self) -> f32 {
        (self.quantized_days as f64 * f64::from(self.day_width)).round() as f32 + self.pixel_offset
    }

    pub fn to_screen_x(&self, layout_x: f32) -> f32 {
        layout_x - self.shift_px()
    }

    pub fn to_layout_x(&self, screen_x: f32) -> f32 {
        screen_x + self.shift_px()
    }
}

pub fn compute_viewport_alignment(metrics: &LayoutMetrics, viewport_x_days: f64) -> ViewportAlignment {
    let days = if viewport_x_days.is_finite() {
        viewport_x_days
    } else {
        0.0
    };
    let quantized = days.floor();
    let pixel_offset = ((days - quantized) * f64::from(metrics.day_width)).round() as f32;
    ViewportAlignment {
        quantized_days: quantized as i64,
        pixel_offset,
        day_width: metrics.day_width,
    }
}

/// Layout space → surface pixels: alignment for x, rounded pan for y.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SceneTransform {
    pub origin: Pos2,
    pub alignment: ViewportAlignment,
    pub shift_y: f32,
}

impl SceneTransform {
    pub fn new(origin: Pos2, metrics: &LayoutMetrics, viewport: &Viewport) -> Self {
        Self {
            origin,
            alignment: compute_viewport_alignment(metrics, metrics.viewport_x_days(viewport)),
            shift_y: viewport.pan_py().round(),
        }
    }

    /// Offset added to a layout position to get its screen position.
    pub fn translation(&self) -> Vec2 {
        Vec2::new(
            self.origin.x - self.alignment.shift_px(),
            self.origin.y - self.shift_y,
        )
    }

    pub fn to_screen(&self, layout: Pos2) -> Pos2 {
        layout + self.translation()
    }

    pub fn to_layout(&self, screen: Pos2) -> Pos2 {
        screen - self.translation()
    }

    pub fn rect_to_screen(&self, rect: Rect) -> Rect {
        rect.translate(self.translation())
    }
}

// ─── Grid generation ────────────────────────────────────────────────────────

/// Restartable sequence of x positions `anchor + k * step` inside a window.
#[derive(Debug, Clone)]
pub struct GridLines {
    anchor: f32,
    step: f32,
    next: i64,
    last: i64,
}

impl GridLines {
    /// Lines through `anchor` every `step` pixels within `[lo, hi]`.
    pub fn new(anchor: f32, step: f32, lo: f32, hi: f32) -> Self {
        if !(step.is_finite() && step > 0.0 && anchor.is_finite() && lo <= hi) {
            return Self::empty();
        }
        let first = ((f64::from(lo) - f64::from(anchor)) / f64::from(step)).ceil() as i64;
        let last = ((f64::from(hi) - f64::from(anchor)) / f64::from(step)).floor() as i64;
        Self {
            anchor,
            step,
            next: first,
            last: last.min(first.saturating_add(MAX_GRID_LINES - 1)),
        }
    }

    fn empty() -> Self {
        Self {
            anchor: 0.0,
            step: 1.0,
            next: 1,
            last: 0,
        }
    }

    /// Index of the line at `x`, counted from the anchor.
    pub fn index_of(&self, x: f32) -> i64 {
        ((x - self.anchor) / self.step).round() as i64
    }
}

impl Iterator for GridLines {
    type Item = f32;

    fn next(&mut self) -> Option<f32> {
        if self.next > self.last {
            return None;
        }
        let x = (f64::from(self.anchor) + self.next as f64 * f64::from(self.step)) as f32;
        self.next += 1;
        Some(x)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let n = (self.last - self.next + 1).max(0) as usize;
        (n, Some(n))
    }
}

/// The visible part of the timeline, in surface-local pixels.
#[derive(Debug, Clone, Copy)]
pub struct GridWindow {
    pub metrics: LayoutMetrics,
    pub alignment: ViewportAlignment,
    pub width: f32,
    pub overscan: f32,
}

impl GridWindow {
    pub fn lo(&self) -> f32 {
        -self.overscan
    }

    pub fn hi(&self) -> f32 {
        self.width + self.overscan
    }

    /// Surface-local x of the left edge of a day.
    pub fn day_x(&self, day_index: i64) -> f32 {
        self.alignment.to_screen_x(self.metrics.day_boundary_x(day_index))
    }

    /// Day under a surface-local x.
    pub fn day_at(&self, x: f32) -> i64 {
        if self.metrics.day_width <= 0.0 {
            return 0;
        }
        ((self.alignment.to_layout_x(x) - self.metrics.day_origin_x()) / self.metrics.day_width).floor()
            as i64
    }

    pub fn lines(&self, anchor_day: i64, step_days: f32) -> GridLines {
        GridLines::new(
            self.day_x(anchor_day),
            step_days * self.metrics.day_width,
            self.lo(),
            self.hi(),
        )
    }
}

/// One vertical grid line with its optional date label.
#[derive(Debug, Clone, PartialEq)]
pub struct GridTick {
    pub x: f32,
    pub major: bool,
    pub label: Option<String>,
}

/// Show one day label every `n` days so labels never overlap.
pub fn day_label_stride(day_width: f32) -> i64 {
    if !(day_width.is_finite() && day_width > 0.0) {
        return 1;
    }
    if day_width >= MIN_LABEL_SPACING {
        1
    } else {
        (MIN_LABEL_SPACING / day_width).ceil() as i64
    }
}

fn hour_label_stride(hour_width: f32) -> i64 {
    const NICE: [i64; 5] = [1, 2, 3, 6, 12];
    NICE.into_iter()
        .find(|&h| h as f32 * hour_width >= MIN_LABEL_SPACING * 1.5)
        .unwrap_or(24)
}

/// Grid lines and labels for the active scale.
pub fn grid_ticks(window: &GridWindow, scale: TimeScale, epoch: NaiveDate) -> Vec<GridTick> {
    let dw = window.metrics.day_width;
    let mut ticks = Vec::new();
    match scale {
        TimeScale::Hour => {
            let lines = window.lines(0, 1.0 / 24.0);
            let stride = hour_label_stride(dw / 24.0);
            let indexer = lines.clone();
            for x in lines {
                let hour = indexer.index_of(x);
                let major = hour.rem_euclid(24) == 0;
                let label = if major {
                    day_index_to_date(hour.div_euclid(24), epoch).map(|d| d.format("%a %d %b").to_string())
                } else if hour.rem_euclid(stride) == 0 {
                    Some(format!("{:02}:00", hour.rem_euclid(24)))
                } else {
                    None
                };
                ticks.push(GridTick { x, major, label });
            }
        }
        TimeScale::Day => {
            let lines = window.lines(0, 1.0);
            let stride = day_label_stride(dw);
            let indexer = lines.clone();
            for x in lines {
                let day = indexer.index_of(x);
                let Some(date) = day_index_to_date(day, epoch) else {
                    continue;
                };
                let major = date.weekday().num_days_from_monday() == 0;
                let label = if day.rem_euclid(stride) == 0 {
                    Some(if date.day() == 1 || (major && stride < 7) {
                        date.format("%d %b").to_string()
                    } else {
                        date.format("%d").to_string()
                    })
                } else {
                    None
                };
                ticks.push(GridTick { x, major, label });
            }
        }
        TimeScale::Week => {
            let shift = i64::from(epoch.weekday().num_days_from_monday());
            let lines = window.lines(-shift, 7.0);
            let indexer = lines.clone();
            let label_every = if 7.0 * dw >= MIN_LABEL_SPACING { 1 } else { 2 };
            for x in lines {
                let week = indexer.index_of(x);
                let Some(date) = day_index_to_date(week * 7 - shift, epoch) else {
                    continue;
                };
                let major = date.day() <= 7;
                let label = (week.rem_euclid(label_every) == 0).then(|| date.format("W%V").to_string());
                ticks.push(GridTick { x, major, label });
            }
        }
        TimeScale::Month => {
            let first_day = window.day_at(window.lo());
            let last_day = window.day_at(window.hi());
            let mut date = day_index_to_date(first_day, epoch).map(first_of_month);
            while let Some(month) = date {
                let day = date_to_day_index(month, epoch);
                if day > last_day || ticks.len() as i64 >= MAX_GRID_LINES {
                    break;
                }
                let x = window.day_x(day);
                if x >= window.lo() {
                    let major = month.month() == 1;
                    let label = if major || 30.0 * dw >= MIN_LABEL_SPACING * 1.5 {
                        Some(month.format("%b %Y").to_string())
                    } else {
                        None
                    };
                    ticks.push(GridTick { x, major, label });
                }
                date = next_month(month);
            }
        }
    }
    ticks
}

/// Bar lines every `measure.length_days`, starting at `measure.offset_days`.
pub fn measure_marker_positions(window: &GridWindow, measure: &MeasureConfig) -> GridLines {
    window.lines(i64::from(measure.offset_days), measure.length_days.max(1) as f32)
}
