//! Canvas Store
//!
//! Sole owner of the pixel grid. All reads and writes go through one lock
//! that also guards the dirty flag, so a write and the sync loop's
//! read-and-clear can never interleave.

use serde::{Deserialize, Serialize};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::trace;

use crate::config::CanvasConfig;
use crate::error::{Error, Result};
use crate::events::Delta;

/// Point-in-time copy of the whole canvas
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanvasSnapshot {
    /// Grid width
    pub width: usize,
    /// Grid height
    pub height: usize,
    /// Row-major color codes, `width * height` long
    pub cells: Vec<u8>,
}

impl CanvasSnapshot {
    /// Color at `(y, x)`, if inside the grid
    #[must_use]
    pub fn get(&self, y: usize, x: usize) -> Option<u8> {
        if y < self.height && x < self.width {
            self.cells.get(y * self.width + x).copied()
        } else {
            None
        }
    }
}

struct Grid {
    cells: Vec<u8>,
    dirty: bool,
}

/// Shared canvas state
pub struct CanvasStore {
    width: usize,
    height: usize,
    color_max: u16,
    grid: RwLock<Grid>,
}

impl CanvasStore {
    /// Create a zero-filled canvas
    #[must_use]
    pub fn new(width: usize, height: usize, color_max: u16) -> Self {
        Self {
            width,
            height,
            color_max,
            grid: RwLock::new(Grid {
                cells: vec![0; width * height],
                dirty: false,
            }),
        }
    }

    /// Create a zero-filled canvas from configuration
    #[must_use]
    pub fn from_config(config: &CanvasConfig) -> Self {
        Self::new(config.width, config.height, config.color_domain_size)
    }

    fn read(&self) -> RwLockReadGuard<'_, Grid> {
        self.grid.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, Grid> {
        self.grid.write().unwrap_or_else(|e| e.into_inner())
    }

    /// Replace the grid with previously persisted cells.
    ///
    /// Leaves the dirty flag untouched; the restored state is already durable.
    pub fn restore(&self, cells: Vec<u8>) -> Result<()> {
        let expected = self.width * self.height;
        if cells.len() != expected {
            return Err(Error::SnapshotMismatch {
                expected,
                actual: cells.len(),
            });
        }
        if let Some(&bad) = cells.iter().find(|&&c| u16::from(c) >= self.color_max) {
            return Err(Error::InvalidColor {
                color: i64::from(bad),
                color_max: self.color_max,
            });
        }

        self.write().cells = cells;
        Ok(())
    }

    /// Consistent copy of the whole canvas
    #[must_use]
    pub fn snapshot(&self) -> CanvasSnapshot {
        let grid = self.read();
        CanvasSnapshot {
            width: self.width,
            height: self.height,
            cells: grid.cells.clone(),
        }
    }

    /// Validate and commit one cell.
    ///
    /// Nothing is mutated when validation fails.
    pub fn set_pixel(&self, y: i64, x: i64, color: i64) -> Result<Delta> {
        let (row, col) = match (usize::try_from(y), usize::try_from(x)) {
            (Ok(row), Ok(col)) if row < self.height && col < self.width => (row, col),
            _ => {
                return Err(Error::OutOfRange {
                    y,
                    x,
                    width: self.width,
                    height: self.height,
                })
            }
        };

        let color = u8::try_from(color)
            .ok()
            .filter(|&c| u16::from(c) < self.color_max)
            .ok_or(Error::InvalidColor {
                color,
                color_max: self.color_max,
            })?;

        {
            let mut grid = self.write();
            grid.cells[row * self.width + col] = color;
            grid.dirty = true;
        }
        trace!(y = row, x = col, color, "Pixel set");

        Ok(Delta::new(row, col, color))
    }

    /// Read the dirty flag and clear it in one step
    pub fn take_dirty(&self) -> bool {
        std::mem::take(&mut self.write().dirty)
    }

    /// Whether mutations happened since the last `take_dirty`
    #[must_use]
    pub fn is_dirty(&self) -> bool {
        self.read().dirty
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn board() -> CanvasStore {
        CanvasStore::new(100, 100, 10)
    }

    #[test]
    fn test_new_canvas_is_zero_filled() {
        let store = CanvasStore::new(4, 3, 10);
        let snapshot = store.snapshot();

        assert_eq!(snapshot.width, 4);
        assert_eq!(snapshot.height, 3);
        assert_eq!(snapshot.cells, vec![0; 12]);
        assert!(!store.is_dirty());
    }

    #[test]
    fn test_set_pixel_changes_only_that_cell() {
        let store = board();
        let before = store.snapshot();

        let delta = store.set_pixel(5, 7, 3).unwrap();
        assert_eq!(delta, Delta::new(5, 7, 3));

        let after = store.snapshot();
        assert_eq!(after.get(5, 7), Some(3));
        let changed: Vec<usize> = (0..after.cells.len())
            .filter(|&i| before.cells[i] != after.cells[i])
            .collect();
        assert_eq!(changed, vec![5 * 100 + 7]);
    }

    #[test]
    fn test_set_pixel_edges() {
        let store = board();
        assert!(store.set_pixel(0, 0, 9).is_ok());
        assert!(store.set_pixel(99, 99, 0).is_ok());
        assert_eq!(store.snapshot().get(0, 0), Some(9));
    }

    #[test]
    fn test_out_of_range_leaves_grid_unchanged() {
        let store = board();
        store.take_dirty();
        let before = store.snapshot();

        for (y, x) in [(-1, 0), (0, -1), (100, 0), (0, 100), (i64::MAX, 5), (i64::MIN, 5)] {
            let err = store.set_pixel(y, x, 1).unwrap_err();
            assert_eq!(err.code(), "out_of_range", "({y}, {x})");
        }

        assert_eq!(store.snapshot(), before);
        assert!(!store.is_dirty());
    }

    #[test]
    fn test_invalid_color_leaves_grid_unchanged() {
        let store = board();
        let before = store.snapshot();

        for color in [-1, 10, 255, 256, i64::MAX] {
            let err = store.set_pixel(1, 1, color).unwrap_err();
            assert_eq!(err.code(), "invalid_color", "color {color}");
        }

        assert_eq!(store.snapshot(), before);
        assert!(!store.is_dirty());
    }

    #[test]
    fn test_range_checked_before_color() {
        let store = board();
        let err = store.set_pixel(100, 0, 42).unwrap_err();
        assert!(matches!(err, Error::OutOfRange { .. }));
    }

    #[test]
    fn test_take_dirty_once_per_window() {
        let store = board();
        assert!(!store.take_dirty());

        store.set_pixel(1, 2, 3).unwrap();
        assert!(store.take_dirty());
        assert!(!store.take_dirty());

        store.set_pixel(1, 2, 4).unwrap();
        store.set_pixel(2, 2, 4).unwrap();
        assert!(store.take_dirty());
        assert!(!store.take_dirty());
    }

    #[test]
    fn test_restore() {
        let store = CanvasStore::new(2, 2, 10);
        store.restore(vec![1, 2, 3, 4]).unwrap();

        let snapshot = store.snapshot();
        assert_eq!(snapshot.get(1, 0), Some(3));
        assert!(!store.is_dirty());
    }

    #[test]
    fn test_restore_rejects_mismatch() {
        let store = CanvasStore::new(2, 2, 10);
        assert!(matches!(
            store.restore(vec![0; 3]),
            Err(Error::SnapshotMismatch {
                expected: 4,
                actual: 3
            })
        ));
        assert!(matches!(
            store.restore(vec![0, 0, 0, 10]),
            Err(Error::InvalidColor { color: 10, .. })
        ));
        assert_eq!(store.snapshot().cells, vec![0; 4]);
    }

    #[test]
    fn test_full_color_domain() {
        let store = CanvasStore::new(1, 1, 256);
        assert!(store.set_pixel(0, 0, 255).is_ok());
        assert!(store.set_pixel(0, 0, 256).is_err());
    }

    #[test]
    fn test_concurrent_writers() {
        let store = Arc::new(CanvasStore::new(10, 10, 10));
        let handles: Vec<_> = (0..10)
            .map(|y| {
                let store = store.clone();
                std::thread::spawn(move || {
                    for x in 0..10 {
                        store.set_pixel(y, x, y % 10).unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let snapshot = store.snapshot();
        for y in 0..10 {
            for x in 0..10 {
                assert_eq!(snapshot.get(y, x), Some(y as u8));
            }
        }
        assert!(store.take_dirty());
    }
}
