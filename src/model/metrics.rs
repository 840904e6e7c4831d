use serde::{Deserialize, Serialize};

use super::span_state::Region;
use crate::sys::geometry::{Point, Rect};

/// Pixel metrics of the workspace grid for the current device profile.
#[derive(Serialize, Deserialize, Debug, PartialEq, Clone, Copy)]
#[serde(deny_unknown_fields)]
pub struct DeviceMetrics {
    pub cell_width: i32,
    pub cell_height: i32,
    #[serde(default)]
    pub border_space: i32,
    pub icon_size: i32,
    pub grid_cols: u32,
    pub grid_rows: u32,
    /// Screen position of the top-left corner of cell (0, 0).
    #[serde(default)]
    pub grid_origin: Point,
}

impl Default for DeviceMetrics {
    fn default() -> Self {
        DeviceMetrics {
            cell_width: 96,
            cell_height: 112,
            border_space: 16,
            icon_size: 56,
            grid_cols: 4,
            grid_rows: 6,
            grid_origin: Point::new(0.0, 0.0),
        }
    }
}

impl DeviceMetrics {
    /// Cell and icon sizes must be positive before anything can be laid out.
    pub fn is_ready(&self) -> bool {
        self.cell_width > 0 && self.cell_height > 0 && self.icon_size > 0
    }

    /// Screen rect covered by `region`, border spacing included between cells.
    pub fn region_rect(&self, region: Region) -> Rect {
        let step_x = f64::from(self.cell_width + self.border_space);
        let step_y = f64::from(self.cell_height + self.border_space);
        let border = f64::from(self.border_space);
        Rect::from_xywh(
            self.grid_origin.x + f64::from(region.cell_x) * step_x,
            self.grid_origin.y + f64::from(region.cell_y) * step_y,
            f64::from(region.span_x) * step_x - border,
            f64::from(region.span_y) * step_y - border,
        )
    }

    pub fn validate(&self) -> Vec<String> {
        let mut issues = Vec::new();

        if self.cell_width <= 0 || self.cell_height <= 0 {
            issues.push(format!(
                "cell size must be positive, got {}x{}",
                self.cell_width, self.cell_height
            ));
        }
        if self.icon_size <= 0 {
            issues.push(format!("icon_size must be positive, got {}", self.icon_size));
        }
        if self.border_space < 0 {
            issues.push(format!(
                "border_space must be non-negative, got {}",
                self.border_space
            ));
        }
        if self.grid_cols == 0 || self.grid_rows == 0 {
            issues.push(format!(
                "grid must have at least one cell, got {}x{}",
                self.grid_cols, self.grid_rows
            ));
        }

        issues
    }
}
