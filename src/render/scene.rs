//! Retained scene: one persistent visual node per task and per dependency.
//!
//! Nodes own their shapes in local space. [`SceneManager::upsert_task`] only
//! rebuilds a node when the inputs that shape it change; everything else is
//! a position assignment. Background, selection, previews and the hover card
//! are separate layers.

use std::collections::{HashMap, HashSet};

use chrono::NaiveDate;
use egui::epaint::CubicBezierShape;
use egui::{Align2, Color32, FontId, Painter, Pos2, Rect, Rounding, Shape, Stroke, Vec2};
use uuid::Uuid;

use crate::config::{EngineColors, EngineConfig};
use crate::model::{Staff, Task, TaskStatus, Viewport};
use crate::render::controller::GesturePreview;
use crate::render::layout::{
    date_to_day_index, grid_ticks, measure_marker_positions, time_scale_for_zoom, GridWindow,
    LayoutMetrics, SceneTransform, StaffStack, TaskAnchors, TaskLayout,
};
use crate::render::markup::{self, InlineSpan, MarkupColors};
use crate::render::theme::{self, ClefKind};

/// Inputs that decide whether a task node needs new geometry.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeMeta {
    pub width: f32,
    pub center_y: f32,
    pub start_x: f32,
    pub title: String,
    pub status: TaskStatus,
    pub zoom: f32,
}

/// Text drawn on top of a node, relative to its origin.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeLabel {
    pub text: String,
    pub offset: Vec2,
    pub font: FontId,
    pub color: Color32,
}

#[derive(Debug, Clone, Default)]
pub struct TaskNode {
    /// Layout-space origin: the glyph's top-left corner.
    pub position: Pos2,
    pub size: Vec2,
    shapes: Vec<Shape>,
    labels: Vec<NodeLabel>,
    meta: Option<NodeMeta>,
    redraws: u64,
}

impl TaskNode {
    pub fn redraw_count(&self) -> u64 {
        self.redraws
    }

    pub fn meta(&self) -> Option<&NodeMeta> {
        self.meta.as_ref()
    }

    pub fn labels(&self) -> &[NodeLabel] {
        &self.labels
    }

    fn rebuild(&mut self, layout: &TaskLayout, colors: &EngineColors, meta: &NodeMeta) {
        let r = layout.radius;
        let size = Vec2::new(layout.width, r * 2.0);
        let head = Rect::from_min_size(Pos2::ZERO, size);
        let style = theme::status_style(meta.status);
        let rounding = Rounding {
            nw: r,
            sw: r,
            ne: 2.0,
            se: 2.0,
        };

        self.shapes.clear();
        self.shapes.push(Shape::rect_filled(
            head.translate(Vec2::new(1.0, 1.5)),
            rounding,
            Color32::from_black_alpha(35),
        ));
        self.shapes.push(Shape::rect_filled(head, rounding, style.fill));
        self.shapes.push(Shape::rect_filled(
            Rect::from_min_size(Pos2::ZERO, Vec2::new(layout.width, (r * 0.8).max(2.0))),
            Rounding {
                nw: r,
                ne: 2.0,
                sw: 0.0,
                se: 0.0,
            },
            Color32::from_white_alpha(25),
        ));
        self.shapes.push(Shape::rect_stroke(head, rounding, Stroke::new(1.0, style.outline)));
        // Note stem rising from the head's round end.
        let stem_x = (r * 2.0 - 1.0).min(layout.width);
        self.shapes.push(Shape::line_segment(
            [Pos2::new(stem_x, r), Pos2::new(stem_x, r - theme::STEM_LENGTH)],
            Stroke::new(1.5, style.outline),
        ));
        if meta.status == TaskStatus::Cancelled {
            self.shapes.push(Shape::line_segment(
                [Pos2::new(r, r), Pos2::new(layout.width - 2.0, r)],
                Stroke::new(1.0, colors.text_on_glyph),
            ));
        }

        self.labels.clear();
        if layout.width >= r * 2.0 + 4.0 {
            self.labels.push(NodeLabel {
                text: style.icon.to_string(),
                offset: Vec2::new(r, r),
                font: theme::font_small(),
                color: colors.text_on_glyph,
            });
        }
        if layout.width > 30.0 + r * 2.0 {
            self.labels.push(NodeLabel {
                text: meta.title.clone(),
                offset: Vec2::new(r * 2.0 + 4.0, r),
                font: theme::font_glyph(),
                color: colors.text_on_glyph,
            });
        }

        self.size = size;
        self.redraws += 1;
    }

    fn paint(&self, painter: &Painter, translation: Vec2) {
        let offset = self.position.to_vec2() + translation;
        for shape in &self.shapes {
            let mut shape = shape.clone();
            shape.translate(offset);
            painter.add(shape);
        }
        let clip = Rect::from_min_size(Pos2::ZERO + offset, self.size).intersect(painter.clip_rect());
        let clipped = painter.with_clip_rect(clip);
        for label in &self.labels {
            clipped.text(
                Pos2::ZERO + offset + label.offset,
                Align2::LEFT_CENTER,
                &label.text,
                label.font.clone(),
                label.color,
            );
        }
    }
}

/// Persistent drawable for one dependency. Its curve is redrawn every frame.
#[derive(Debug, Clone, Default)]
pub struct DependencyNode {
    shapes: Vec<Shape>,
}

impl DependencyNode {
    /// Replace the curve with one from `from` (source right anchor) to `to`.
    pub fn redraw(&mut self, from: Pos2, to: Pos2, color: Color32) {
        self.shapes.clear();
        self.shapes.extend(arrow_shapes(from, to, Stroke::new(1.5, color)));
    }

    pub fn is_empty(&self) -> bool {
        self.shapes.is_empty()
    }
}

/// Cubic curve between two anchors plus an arrowhead at `to`.
fn arrow_shapes(from: Pos2, to: Pos2, stroke: Stroke) -> Vec<Shape> {
    let dx = ((to.x - from.x).abs() * 0.5).max(30.0);
    let c1 = from + Vec2::new(dx, 0.0);
    let c2 = to - Vec2::new(dx, 0.0);
    let curve = CubicBezierShape::from_points_stroke([from, c1, c2, to], false, Color32::TRANSPARENT, stroke);
    let dir = (to - c2).normalized();
    let normal = Vec2::new(-dir.y, dir.x);
    let back = to - dir * theme::ARROW_HEAD;
    let head = vec![
        to,
        back + normal * (theme::ARROW_HEAD * 0.5),
        back - normal * (theme::ARROW_HEAD * 0.5),
    ];
    vec![
        curve.into(),
        Shape::convex_polygon(head, stroke.color, Stroke::NONE),
    ]
}

/// Everything that determines the background's appearance.
#[derive(Debug, Clone, PartialEq)]
pub struct BackgroundKey {
    pub viewport: Viewport,
    pub surface: Rect,
    pub config_revision: u64,
    pub today: NaiveDate,
    pub epoch: NaiveDate,
    pub staffs: Vec<(Uuid, String, u32, i32)>,
}

impl BackgroundKey {
    pub fn staff_signature(staffs: &[Staff]) -> Vec<(Uuid, String, u32, i32)> {
        staffs
            .iter()
            .map(|s| (s.id, s.name.clone(), s.number_of_lines, s.position))
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq)]
struct TextItem {
    pos: Pos2,
    anchor: Align2,
    text: String,
    font: FontId,
    color: Color32,
}

/// Grid, staffs, labels and the today marker, in surface-local pixels.
#[derive(Debug, Clone, Default)]
pub struct BackgroundLayer {
    shapes: Vec<Shape>,
    texts: Vec<TextItem>,
}

impl BackgroundLayer {
    fn line(&mut self, a: Pos2, b: Pos2, stroke: Stroke) {
        self.shapes.push(Shape::line_segment([a, b], stroke));
    }

    fn text(&mut self, pos: Pos2, anchor: Align2, text: impl Into<String>, font: FontId, color: Color32) {
        self.texts.push(TextItem {
            pos,
            anchor,
            text: text.into(),
            font,
            color,
        });
    }

    fn paint(&self, painter: &Painter, origin: Pos2) {
        let offset = origin.to_vec2();
        for shape in &self.shapes {
            let mut shape = shape.clone();
            shape.translate(offset);
            painter.add(shape);
        }
        for item in &self.texts {
            painter.text(item.pos + offset, item.anchor, &item.text, item.font.clone(), item.color);
        }
    }
}

/// Inputs for building the background layer.
pub struct BackgroundInput<'a> {
    pub config: &'a EngineConfig,
    pub metrics: &'a LayoutMetrics,
    pub transform: &'a SceneTransform,
    pub staffs: &'a StaffStack<'a>,
    pub size: Vec2,
    pub epoch: NaiveDate,
    pub today: NaiveDate,
}

/// Build the background in surface-local coordinates.
pub fn build_background(input: &BackgroundInput<'_>) -> BackgroundLayer {
    let BackgroundInput {
        config,
        metrics,
        transform,
        staffs,
        size,
        epoch,
        today,
    } = *input;
    let colors = &config.colors;
    let mut layer = BackgroundLayer::default();
    let full = Rect::from_min_size(Pos2::ZERO, size);
    let local_y = |layout_y: f32| layout_y - transform.shift_y;
    let window = GridWindow {
        metrics: *metrics,
        alignment: transform.alignment,
        width: size.x,
        overscan: config.overscan,
    };
    let header_height = (config.top_margin * 0.75).min(size.y);

    layer.shapes.push(Shape::rect_filled(full, 0.0, colors.background));

    // Vertical grid for the active scale.
    let scale = time_scale_for_zoom(metrics.zoom);
    let ticks = grid_ticks(&window, scale, epoch);
    for tick in &ticks {
        let (color, width) = if tick.major {
            (colors.grid_major, 1.0)
        } else {
            (colors.grid_minor, 0.5)
        };
        layer.line(
            Pos2::new(tick.x, header_height),
            Pos2::new(tick.x, size.y),
            Stroke::new(width, color),
        );
    }

    // Staff line sets and bar lines.
    for (index, staff) in staffs.iter() {
        let top = local_y(metrics.line_y(index, 0));
        let bottom = local_y(metrics.line_y(index, staff.max_half_step()));
        if bottom < header_height - metrics.staff_spacing || top > size.y + metrics.staff_spacing {
            continue;
        }
        for line in (0..=staff.max_half_step()).step_by(2) {
            let y = local_y(metrics.line_y(index, line));
            layer.line(Pos2::new(0.0, y), Pos2::new(size.x, y), Stroke::new(1.0, colors.staff_line));
        }
        if let Some(measure) = &config.measure {
            for x in measure_marker_positions(&window, measure) {
                layer.line(Pos2::new(x, top), Pos2::new(x, bottom), Stroke::new(measure.width, measure.color));
            }
        }
    }

    // Today marker.
    let today_x = window.day_x(date_to_day_index(today, epoch));
    if (window.lo()..=window.hi()).contains(&today_x) {
        layer.line(
            Pos2::new(today_x, header_height),
            Pos2::new(today_x, size.y),
            Stroke::new(1.5, colors.today),
        );
        let badge = Rect::from_min_size(
            Pos2::new(today_x - theme::TODAY_BADGE_WIDTH / 2.0, header_height - 1.0),
            Vec2::new(theme::TODAY_BADGE_WIDTH, theme::TODAY_BADGE_HEIGHT),
        );
        layer.shapes.push(Shape::rect_filled(badge, 3.0, colors.today));
        layer.text(badge.center(), Align2::CENTER_CENTER, "Today", theme::font_small(), Color32::WHITE);
    }

    // Sticky staff header column: clef glyph and name.
    let column = Rect::from_min_size(Pos2::new(0.0, header_height), Vec2::new(config.left_margin, size.y));
    layer.shapes.push(Shape::rect_filled(column, 0.0, colors.background));
    layer.line(
        Pos2::new(config.left_margin, header_height),
        Pos2::new(config.left_margin, size.y),
        Stroke::new(1.0, colors.grid_major),
    );
    for (index, staff) in staffs.iter() {
        let top = local_y(metrics.line_y(index, 0));
        let bottom = local_y(metrics.line_y(index, staff.max_half_step()));
        let mid = (top + bottom) / 2.0;
        if mid < header_height || mid > size.y {
            continue;
        }
        for line in (0..=staff.max_half_step()).step_by(2) {
            let y = local_y(metrics.line_y(index, line));
            layer.line(
                Pos2::new(config.left_margin - 36.0, y),
                Pos2::new(config.left_margin, y),
                Stroke::new(1.0, colors.staff_line),
            );
        }
        let clef_x = config.left_margin - 22.0;
        match ClefKind::for_staff_name(&staff.name).letter() {
            Some(letter) => layer.text(
                Pos2::new(clef_x, mid),
                Align2::CENTER_CENTER,
                letter,
                theme::font_clef((bottom - top).max(metrics.staff_line_spacing)),
                colors.staff_label,
            ),
            None => {
                let half = ((bottom - top) / 4.0).max(4.0);
                for dx in [-3.0, 3.0] {
                    layer.shapes.push(Shape::rect_filled(
                        Rect::from_center_size(Pos2::new(clef_x + dx, mid), Vec2::new(3.0, half * 2.0)),
                        0.0,
                        colors.staff_label,
                    ));
                }
            }
        }
        if config.show_labels {
            layer.text(
                Pos2::new(8.0, mid),
                Align2::LEFT_CENTER,
                &staff.name,
                theme::font_sub(),
                colors.staff_label,
            );
            if let Some(signature) = &staff.time_signature {
                layer.text(
                    Pos2::new(8.0, mid + 14.0),
                    Align2::LEFT_CENTER,
                    signature,
                    theme::font_small(),
                    colors.date_label,
                );
            }
        }
    }

    // Sticky date header.
    let header = Rect::from_min_size(Pos2::ZERO, Vec2::new(size.x, header_height));
    layer.shapes.push(Shape::rect_filled(header, 0.0, colors.background));
    layer.line(
        Pos2::new(0.0, header_height),
        Pos2::new(size.x, header_height),
        Stroke::new(1.0, colors.grid_major),
    );
    if config.show_labels {
        for tick in ticks.iter().filter(|t| t.x >= config.left_margin) {
            if let Some(label) = &tick.label {
                let (y, font) = if tick.major {
                    (theme::HEADER_LABEL_Y, theme::font_header())
                } else {
                    (theme::SUBHEADER_LABEL_Y, theme::font_sub())
                };
                layer.text(
                    Pos2::new(tick.x + 3.0, y.min(header_height - 6.0)),
                    Align2::LEFT_CENTER,
                    label,
                    font,
                    colors.date_label,
                );
            }
        }
        layer.text(
            Pos2::new(8.0, theme::HEADER_LABEL_Y),
            Align2::LEFT_CENTER,
            scale.label(),
            theme::font_small(),
            colors.date_label,
        );
    }

    layer
}

/// Callout shown next to a hovered task.
#[derive(Debug, Clone, PartialEq)]
pub struct HoverCard {
    pub task_id: Uuid,
    /// Right anchor of the task, in layout space.
    pub anchor: Pos2,
    pub title: String,
    pub subtitle: String,
    pub body: Vec<InlineSpan>,
}

impl HoverCard {
    pub fn for_task(task: &Task, anchors: &TaskAnchors) -> Self {
        let mut subtitle = format!(
            "{} → {} ({} day{}) · {}",
            task.start_date.format("%d/%m/%Y"),
            task.end_date().format("%d/%m/%Y"),
            task.duration_days,
            if task.duration_days == 1 { "" } else { "s" },
            task.status.label(),
        );
        if let Some(assignee) = &task.assignee {
            subtitle.push_str(&format!(" · {assignee}"));
        }
        Self {
            task_id: task.id,
            anchor: anchors.right,
            title: task.title.clone(),
            subtitle,
            body: task
                .description
                .as_deref()
                .map(markup::parse_inline)
                .unwrap_or_default(),
        }
    }
}

/// Owner of every visual node. Controller and index only ever see ids and layouts.
#[derive(Debug, Default)]
pub struct SceneManager {
    tasks: HashMap<Uuid, TaskNode>,
    dependencies: HashMap<Uuid, DependencyNode>,
    layouts: HashMap<Uuid, TaskLayout>,
    anchors: HashMap<Uuid, TaskAnchors>,
    paint_order: Vec<Uuid>,
    selection: Vec<Shape>,
    overlay: Vec<Shape>,
    hover: Option<HoverCard>,
    background: Option<(BackgroundKey, BackgroundLayer)>,
    background_builds: u64,
}

impl SceneManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create or refresh the node for `task`. Returns `true` when geometry was rebuilt.
    pub fn upsert_task(
        &mut self,
        task: &Task,
        layout: &TaskLayout,
        config: &EngineConfig,
        zoom: f32,
        title: &str,
        status: TaskStatus,
    ) -> bool {
        let meta = NodeMeta {
            width: layout.width,
            center_y: layout.center_y,
            start_x: layout.start_x,
            title: title.to_string(),
            status,
            zoom,
        };
        let node = self.tasks.entry(task.id).or_default();
        node.position = layout.top_left();
        self.layouts.insert(task.id, *layout);
        self.anchors.insert(task.id, layout.anchors());
        if node.meta.as_ref() == Some(&meta) {
            return false;
        }
        node.rebuild(layout, &config.colors, &meta);
        node.meta = Some(meta);
        true
    }

    /// Drop every task node whose id is not in `valid_ids`.
    pub fn remove_missing_tasks(&mut self, valid_ids: &HashSet<Uuid>) -> usize {
        let before = self.tasks.len();
        self.tasks.retain(|id, _| valid_ids.contains(id));
        self.layouts.retain(|id, _| valid_ids.contains(id));
        self.anchors.retain(|id, _| valid_ids.contains(id));
        self.paint_order.retain(|id| valid_ids.contains(id));
        if let Some(hover) = &self.hover {
            if !valid_ids.contains(&hover.task_id) {
                self.hover = None;
            }
        }
        before - self.tasks.len()
    }

    /// Lazily create the drawable for a dependency.
    pub fn upsert_dependency(&mut self, id: Uuid) -> &mut DependencyNode {
        self.dependencies.entry(id).or_default()
    }

    pub fn remove_missing_dependencies(&mut self, valid_ids: &HashSet<Uuid>) -> usize {
        let before = self.dependencies.len();
        self.dependencies.retain(|id, _| valid_ids.contains(id));
        before - self.dependencies.len()
    }

    pub fn set_paint_order(&mut self, order: Vec<Uuid>) {
        self.paint_order = order;
    }

    pub fn task_node(&self, id: Uuid) -> Option<&TaskNode> {
        self.tasks.get(&id)
    }

    pub fn layout(&self, id: Uuid) -> Option<&TaskLayout> {
        self.layouts.get(&id)
    }

    pub fn anchors(&self, id: Uuid) -> Option<&TaskAnchors> {
        self.anchors.get(&id)
    }

    pub fn layouts(&self) -> &HashMap<Uuid, TaskLayout> {
        &self.layouts
    }

    pub fn task_count(&self) -> usize {
        self.tasks.len()
    }

    pub fn dependency_count(&self) -> usize {
        self.dependencies.len()
    }

    pub fn total_redraws(&self) -> u64 {
        self.tasks.values().map(TaskNode::redraw_count).sum()
    }

    /// Rebuild the selection overlay. Never diffed.
    pub fn update_selection(&mut self, selection: &[Uuid], color: Color32) {
        self.selection.clear();
        for id in selection {
            let Some(layout) = self.layouts.get(id) else {
                continue;
            };
            let r = layout.radius;
            self.selection.push(Shape::rect_stroke(
                layout.rect().expand(2.0),
                Rounding {
                    nw: r + 2.0,
                    sw: r + 2.0,
                    ne: 4.0,
                    se: 4.0,
                },
                Stroke::new(2.0, color),
            ));
        }
    }

    pub fn selection_shape_count(&self) -> usize {
        self.selection.len()
    }

    pub fn set_preview(&mut self, preview: Option<&GesturePreview>, metrics: &LayoutMetrics, colors: &EngineColors) {
        self.overlay = preview
            .map(|p| preview_shapes(p, metrics, colors))
            .unwrap_or_default();
    }

    pub fn has_preview(&self) -> bool {
        !self.overlay.is_empty()
    }

    pub fn set_hover(&mut self, hover: Option<HoverCard>) {
        self.hover = hover;
    }

    pub fn hover(&self) -> Option<&HoverCard> {
        self.hover.as_ref()
    }

    /// Rebuild the background only when `key` differs from the cached one.
    pub fn ensure_background(
        &mut self,
        key: BackgroundKey,
        build: impl FnOnce() -> BackgroundLayer,
    ) -> bool {
        if matches!(&self.background, Some((cached, _)) if *cached == key) {
            return false;
        }
        self.background = Some((key, build()));
        self.background_builds += 1;
        true
    }

    pub fn background_builds(&self) -> u64 {
        self.background_builds
    }

    /// Destroy every node and cached layer.
    pub fn clear(&mut self) {
        self.tasks.clear();
        self.dependencies.clear();
        self.layouts.clear();
        self.anchors.clear();
        self.paint_order.clear();
        self.selection.clear();
        self.overlay.clear();
        self.hover = None;
        self.background = None;
    }

    pub fn paint(&self, painter: &Painter, transform: &SceneTransform, colors: &EngineColors) {
        if let Some((_, background)) = &self.background {
            background.paint(painter, transform.origin);
        }
        let translation = transform.translation();
        let clip = painter.clip_rect();

        let layer = |shapes: &[Shape]| {
            for shape in shapes {
                let mut shape = shape.clone();
                shape.translate(translation);
                painter.add(shape);
            }
        };

        for node in self.dependencies.values() {
            layer(&node.shapes);
        }
        for id in &self.paint_order {
            let Some(node) = self.tasks.get(id) else {
                continue;
            };
            let screen = Rect::from_min_size(node.position + translation, node.size)
                .expand2(Vec2::new(0.0, theme::STEM_LENGTH));
            if screen.intersects(clip) {
                node.paint(painter, translation);
            }
        }
        layer(&self.selection);
        layer(&self.overlay);

        if let Some(card) = &self.hover {
            paint_hover_card(painter, card, card.anchor + translation, colors);
        }
    }
}

fn paint_hover_card(painter: &Painter, card: &HoverCard, anchor: Pos2, colors: &EngineColors) {
    let pad = theme::TOOLTIP_PADDING;
    let wrap = theme::TOOLTIP_MAX_WIDTH - pad * 2.0;
    let title = painter.layout(card.title.clone(), theme::font_header(), colors.tooltip_text, wrap);
    let subtitle = painter.layout(card.subtitle.clone(), theme::font_small(), colors.date_label, wrap);
    let body = (!card.body.is_empty()).then(|| {
        painter.layout_job(markup::layout_job(
            &card.body,
            MarkupColors {
                text: colors.date_label,
                strong: colors.tooltip_text,
                link: colors.selection,
                code_bg: colors.background,
            },
            wrap,
        ))
    });

    let width = title
        .size()
        .x
        .max(subtitle.size().x)
        .max(body.as_ref().map_or(0.0, |b| b.size().x))
        + pad * 2.0;
    let height = title.size().y
        + subtitle.size().y
        + body.as_ref().map_or(0.0, |b| b.size().y + 4.0)
        + pad * 2.0
        + 2.0;

    let mut min = Pos2::new(anchor.x + theme::TOOLTIP_GAP, anchor.y - height / 2.0);
    let bounds = painter.clip_rect();
    if min.x + width > bounds.max.x {
        min.x = (bounds.max.x - width).max(bounds.min.x);
    }
    min.y = min.y.clamp(bounds.min.y, (bounds.max.y - height).max(bounds.min.y));
    let rect = Rect::from_min_size(min, Vec2::new(width, height));

    let stem_end = Pos2::new(rect.min.x, anchor.y.clamp(rect.min.y + 4.0, rect.max.y - 4.0));
    painter.line_segment([anchor, stem_end], Stroke::new(1.0, colors.grid_major));
    painter.circle_filled(anchor, 2.5, colors.grid_major);
    painter.rect_filled(rect.translate(Vec2::new(1.0, 2.0)), 6.0, Color32::from_black_alpha(50));
    painter.rect(rect, 6.0, colors.tooltip_bg, Stroke::new(1.0, colors.grid_major));

    let mut cursor = rect.min + Vec2::splat(pad);
    let title_height = title.size().y;
    painter.galley(cursor, title, colors.tooltip_text);
    cursor.y += title_height + 2.0;
    let subtitle_height = subtitle.size().y;
    painter.galley(cursor, subtitle, colors.date_label);
    cursor.y += subtitle_height + 4.0;
    if let Some(body) = body {
        painter.galley(cursor, body, colors.tooltip_text);
    }
}

/// Shapes for the live gesture preview, in layout space.
pub fn preview_shapes(preview: &GesturePreview, metrics: &LayoutMetrics, colors: &EngineColors) -> Vec<Shape> {
    let mut shapes = Vec::new();
    match preview {
        GesturePreview::Ghost {
            rect,
            guide_y,
            drop_marker,
            valid,
        } => {
            let color = if *valid { colors.ghost } else { colors.invalid };
            let r = rect.height() / 2.0;
            shapes.push(Shape::line_segment(
                [
                    Pos2::new(metrics.left_margin, *guide_y),
                    Pos2::new(rect.max.x + metrics.day_width * 4.0, *guide_y),
                ],
                Stroke::new(1.0, color),
            ));
            shapes.push(Shape::rect_filled(
                *rect,
                Rounding {
                    nw: r,
                    sw: r,
                    ne: 2.0,
                    se: 2.0,
                },
                color,
            ));
            shapes.push(Shape::circle_stroke(
                *drop_marker,
                theme::DROP_MARKER_RADIUS,
                Stroke::new(1.5, color),
            ));
            shapes.push(Shape::circle_filled(*drop_marker, 2.0, color));
        }
        GesturePreview::Resize { rect, .. } => {
            let r = rect.height() / 2.0;
            shapes.push(Shape::rect_stroke(
                *rect,
                Rounding {
                    nw: r,
                    sw: r,
                    ne: 2.0,
                    se: 2.0,
                },
                Stroke::new(1.5, colors.ghost),
            ));
            shapes.push(Shape::line_segment(
                [
                    Pos2::new(rect.max.x, rect.min.y - 4.0),
                    Pos2::new(rect.max.x, rect.max.y + 4.0),
                ],
                Stroke::new(2.0, colors.selection),
            ));
        }
        GesturePreview::Link { from, to, snapped } => {
            let color = colors.dependency_preview;
            if *snapped {
                shapes.extend(arrow_shapes(*from, *to, Stroke::new(2.0, color)));
            } else {
                shapes.extend(Shape::dashed_line(&[*from, *to], Stroke::new(1.5, color), 6.0, 4.0));
                shapes.push(Shape::circle_filled(*to, 3.0, color));
            }
        }
    }
    shapes
}
