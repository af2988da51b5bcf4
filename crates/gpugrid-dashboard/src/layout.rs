//! Square grid geometry for the node map.

use serde::Serialize;

/// Side length of the smallest square grid holding `n` cells.
pub fn grid_size(n: usize) -> usize {
    let root = n.isqrt();
    if root * root < n { root + 1 } else { root }
}

/// Grid size used while focus mode is active. Same square layout as
/// [`grid_size`].
pub fn optimal_grid_size(n: usize) -> usize {
    grid_size(n)
}

/// Edge length of one cell once `grid + 1` gaps are taken out of the
/// container. Zero for an empty grid.
pub fn cell_size(container_size: u32, gap: u32, grid: usize) -> u32 {
    let Ok(grid) = u32::try_from(grid) else {
        return 0;
    };
    if grid == 0 {
        return 0;
    }
    let gaps = grid.saturating_add(1).saturating_mul(gap);
    container_size.saturating_sub(gaps) / grid
}

/// Geometry of the rendered grid. A zero `grid_size` means "no grid".
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct GridGeometry {
    pub grid_size: usize,
    pub cell_size: u32,
    pub total_slots: usize,
    /// Empty cells padding the grid after the last node.
    pub placeholder_slots: usize,
}

impl GridGeometry {
    pub fn compute(count: usize, container_size: u32, gap: u32, focus_mode: bool) -> Self {
        if count == 0 {
            return Self::default();
        }
        let grid_size = if focus_mode { optimal_grid_size(count) } else { grid_size(count) };
        let total_slots = grid_size * grid_size;
        Self {
            grid_size,
            cell_size: cell_size(container_size, gap, grid_size),
            total_slots,
            placeholder_slots: total_slots - count,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grid_size_is_ceil_sqrt() {
        assert_eq!(grid_size(0), 0);
        assert_eq!(grid_size(1), 1);
        assert_eq!(grid_size(2), 2);
        assert_eq!(grid_size(4), 2);
        assert_eq!(grid_size(5), 3);
        assert_eq!(grid_size(64), 8);
        assert_eq!(grid_size(71), 9);
    }

    #[test]
    fn optimal_matches_general() {
        for n in 0..200 {
            assert_eq!(optimal_grid_size(n), grid_size(n));
        }
    }

    #[test]
    fn cell_size_leaves_room_for_gaps() {
        // 700 - 10 * 2 = 680, / 9 = 75
        assert_eq!(cell_size(700, 2, 9), 75);
        assert_eq!(cell_size(700, 2, 1), 696);
        assert_eq!(cell_size(700, 2, 0), 0);
        assert_eq!(cell_size(10, 20, 3), 0);
    }

    #[test]
    fn geometry_pads_to_square() {
        let geometry = GridGeometry::compute(71, 700, 2, false);
        assert_eq!(geometry.grid_size, 9);
        assert_eq!(geometry.total_slots, 81);
        assert_eq!(geometry.placeholder_slots, 10);
        assert_eq!(geometry.cell_size, 75);
    }

    #[test]
    fn empty_grid_is_all_zero() {
        assert_eq!(GridGeometry::compute(0, 700, 2, true), GridGeometry::default());
    }
}
