//! Uniform grid hash for hit-testing task glyphs.
//!
//! Rebuilt once per frame from the current layouts. Each entry is stored in
//! every cell its rectangle overlaps; queries re-check the exact rectangle, so
//! results never contain false positives.

use std::collections::HashMap;

use egui::{Pos2, Rect};
use uuid::Uuid;

pub const DEFAULT_CELL_SIZE: f32 = 200.0;

/// Guard against degenerate rectangles spanning absurd numbers of cells.
const MAX_CELLS_PER_ENTRY: i64 = 1024;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpatialEntry {
    pub id: Uuid,
    pub rect: Rect,
}

#[derive(Debug, Clone)]
pub struct SpatialIndex {
    cell_size: f32,
    entries: Vec<SpatialEntry>,
    cells: HashMap<(i32, i32), Vec<usize>>,
}

impl Default for SpatialIndex {
    fn default() -> Self {
        Self::new(DEFAULT_CELL_SIZE)
    }
}

impl SpatialIndex {
    pub fn new(cell_size: f32) -> Self {
        let cell_size = if cell_size.is_finite() && cell_size > 0.0 {
            cell_size
        } else {
            DEFAULT_CELL_SIZE
        };
        Self {
            cell_size,
            entries: Vec::new(),
            cells: HashMap::new(),
        }
    }

    pub fn cell_size(&self) -> f32 {
        self.cell_size
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.cells.clear();
    }

    fn cell_of(&self, x: f32, y: f32) -> (i32, i32) {
        (
            (x / self.cell_size).floor() as i32,
            (y / self.cell_size).floor() as i32,
        )
    }

    pub fn insert(&mut self, id: Uuid, rect: Rect) {
        if !rect.is_finite() || rect.is_negative() {
            tracing::trace!(%id, "skipping degenerate spatial entry");
            return;
        }
        let (x0, y0) = self.cell_of(rect.min.x, rect.min.y);
        let (x1, y1) = self.cell_of(rect.max.x, rect.max.y);
        let span = (i64::from(x1) - i64::from(x0) + 1) * (i64::from(y1) - i64::from(y0) + 1);
        if span > MAX_CELLS_PER_ENTRY {
            tracing::trace!(%id, span, "spatial entry spans too many cells");
            return;
        }
        let slot = self.entries.len();
        self.entries.push(SpatialEntry { id, rect });
        for cx in x0..=x1 {
            for cy in y0..=y1 {
                self.cells.entry((cx, cy)).or_default().push(slot);
            }
        }
    }

    /// Ids whose rectangle contains `pos`, in insertion order.
    pub fn point_query(&self, pos: Pos2) -> Vec<Uuid> {
        let Some(slots) = self.cells.get(&self.cell_of(pos.x, pos.y)) else {
            return Vec::new();
        };
        slots
            .iter()
            .map(|&slot| self.entries[slot])
            .filter(|entry| entry.rect.contains(pos))
            .map(|entry| entry.id)
            .collect()
    }

    /// Topmost hit: the entry inserted last wins, matching paint order.
    pub fn top_hit(&self, pos: Pos2) -> Option<Uuid> {
        self.point_query(pos).pop()
    }

    /// Ids whose rectangle intersects `rect`, de-duplicated, in insertion order.
    pub fn range_query(&self, rect: Rect) -> Vec<Uuid> {
        if !rect.is_finite() || rect.is_negative() {
            return Vec::new();
        }
        let (x0, y0) = self.cell_of(rect.min.x, rect.min.y);
        let (x1, y1) = self.cell_of(rect.max.x, rect.max.y);
        let mut slots: Vec<usize> = Vec::new();
        for cx in x0..=x1 {
            for cy in y0..=y1 {
                if let Some(cell) = self.cells.get(&(cx, cy)) {
                    slots.extend(cell.iter().copied());
                }
            }
        }
        slots.sort_unstable();
        slots.dedup();
        slots
            .into_iter()
            .map(|slot| self.entries[slot])
            .filter(|entry| entry.rect.intersects(rect))
            .map(|entry| entry.id)
            .collect()
    }
}
