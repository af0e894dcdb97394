use serde::{Deserialize, Serialize};
use std::ops::Range;

/// Axis-aligned rectangle in content coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CellRect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl CellRect {
    pub fn contains(&self, x: f32, y: f32) -> bool {
        x >= self.x && x < self.x + self.width && y >= self.y && y < self.y + self.height
    }
}

/// Fixed cell geometry of the wrap-flowed icon grid. All units are pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GridGeometry {
    pub cell_width: f32,
    pub cell_height: f32,
    pub spacing: f32,
    pub padding: f32,
}

impl Default for GridGeometry {
    fn default() -> Self {
        Self {
            cell_width: 96.0,
            cell_height: 112.0,
            spacing: 8.0,
            padding: 8.0,
        }
    }
}

impl GridGeometry {
    fn stride_x(&self) -> f32 {
        self.cell_width + self.spacing
    }

    fn stride_y(&self) -> f32 {
        self.cell_height + self.spacing
    }

    /// `max(1, floor((width - 2*padding + spacing) / (cell_width + spacing)))`
    pub fn columns(&self, available_width: f32) -> usize {
        let fit = (available_width - 2.0 * self.padding + self.spacing) / self.stride_x();
        if fit.is_finite() && fit >= 1.0 {
            fit.floor() as usize
        } else {
            1
        }
    }

    pub fn rows(&self, item_count: usize, columns: usize) -> usize {
        item_count.div_ceil(columns.max(1))
    }

    pub fn cell_rect(&self, index: usize, columns: usize) -> CellRect {
        let columns = columns.max(1);
        let col = (index % columns) as f32;
        let row = (index / columns) as f32;
        CellRect {
            x: self.padding + col * self.stride_x(),
            y: self.padding + row * self.stride_y(),
            width: self.cell_width,
            height: self.cell_height,
        }
    }

    /// Total scrollable height for `item_count` items.
    pub fn content_height(&self, item_count: usize, columns: usize) -> f32 {
        let rows = self.rows(item_count, columns);
        if rows == 0 {
            return 2.0 * self.padding;
        }
        2.0 * self.padding + rows as f32 * self.cell_height + (rows - 1) as f32 * self.spacing
    }

    /// Item index under a point in content coordinates (scroll already
    /// applied). Points in the spacing between cells hit nothing.
    pub fn hit_test(&self, x: f32, y: f32, available_width: f32, item_count: usize) -> Option<usize> {
        let rel_x = x - self.padding;
        let rel_y = y - self.padding;
        if !rel_x.is_finite() || !rel_y.is_finite() || rel_x < 0.0 || rel_y < 0.0 {
            return None;
        }

        let columns = self.columns(available_width);
        let col = (rel_x / self.stride_x()).floor() as usize;
        let row = (rel_y / self.stride_y()).floor() as usize;
        // Bound both axes before combining them; far-off points saturate.
        if col >= columns || row >= self.rows(item_count, columns) {
            return None;
        }

        let index = row * columns + col;
        if index >= item_count {
            return None;
        }
        self.cell_rect(index, columns)
            .contains(x, y)
            .then_some(index)
    }

    /// Indices of the items on rows that intersect the viewport.
    pub fn visible_range(
        &self,
        scroll_offset: f32,
        viewport_height: f32,
        item_count: usize,
        columns: usize,
    ) -> Range<usize> {
        let columns = columns.max(1);
        let top = (scroll_offset - self.padding).max(0.0);
        let bottom = (scroll_offset + viewport_height - self.padding).max(0.0);

        let first_row = (top / self.stride_y()).floor() as usize;
        let end_row = (bottom / self.stride_y()).ceil() as usize;

        let start = (first_row * columns).min(item_count);
        let end = (end_row * columns).min(item_count);
        start..end.max(start)
    }
}
