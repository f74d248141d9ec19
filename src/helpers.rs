// helpers.rs - Static line geometry for the grid and axis visual aids
use crate::config::GridConfig;
use crate::math::Color;
use crate::mesh::{MeshData, Topology};

/// XZ-plane grid of `divisions + 1` lines per axis, centred on the origin
pub fn grid_helper(config: &GridConfig) -> MeshData {
    let divisions = config.divisions.max(1);
    let center = divisions / 2;
    let step = config.size / divisions as f32;
    let half = config.size / 2.0;

    let center_color = Color::from_hex(config.center_color).to_array();
    let line_color = Color::from_hex(config.line_color).to_array();

    let vertex_count = (divisions as usize + 1) * 4;
    let mut positions = Vec::with_capacity(vertex_count);
    let mut colors = Vec::with_capacity(vertex_count);

    for i in 0..=divisions {
        let k = -half + i as f32 * step;
        positions.extend_from_slice(&[[-half, 0.0, k], [half, 0.0, k], [k, 0.0, -half], [k, 0.0, half]]);

        let color = if i == center { center_color } else { line_color };
        colors.extend_from_slice(&[color; 4]);
    }

    MeshData::new(Topology::Lines, positions).with_colors(colors)
}

/// Three segments from the origin: X red, Y green, Z blue
pub fn axes_helper(size: f32) -> MeshData {
    let positions = vec![
        [0.0, 0.0, 0.0],
        [size, 0.0, 0.0],
        [0.0, 0.0, 0.0],
        [0.0, size, 0.0],
        [0.0, 0.0, 0.0],
        [0.0, 0.0, size],
    ];
    let colors = vec![
        [1.0, 0.0, 0.0],
        [1.0, 0.6, 0.0],
        [0.0, 1.0, 0.0],
        [0.6, 1.0, 0.0],
        [0.0, 0.0, 1.0],
        [0.0, 0.6, 1.0],
    ];
    MeshData::new(Topology::Lines, positions).with_colors(colors)
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;

    #[test]
    fn test_grid_line_count() {
        let grid = grid_helper(&GridConfig::default());
        // 11 lines along each axis, two vertices each
        assert_eq!(grid.vertex_count(), 44);
        assert_eq!(grid.colors.len(), 44);
        assert_eq!(grid.topology, Topology::Lines);
        assert!(grid.validate().is_ok());
    }

    #[test]
    fn test_grid_spans_size() {
        let bounds = grid_helper(&GridConfig::default()).bounds();
        assert_eq!(bounds.min, Vec3::new(-5.0, 0.0, -5.0));
        assert_eq!(bounds.max, Vec3::new(5.0, 0.0, 5.0));
    }

    #[test]
    fn test_grid_center_line_uses_center_color() {
        let config = GridConfig::default();
        let grid = grid_helper(&config);
        let center = Color::from_hex(config.center_color).to_array();
        let line = Color::from_hex(config.line_color).to_array();

        // line i = 5 sits on the origin
        assert_eq!(grid.positions[20], [-5.0, 0.0, 0.0]);
        assert_eq!(grid.colors[20], center);
        assert_eq!(grid.colors[0], line);
    }

    #[test]
    fn test_axes_length() {
        let axes = axes_helper(5.0);
        assert_eq!(axes.vertex_count(), 6);
        assert_eq!(axes.bounds().max, Vec3::splat(5.0));
        assert_eq!(axes.colors[0], [1.0, 0.0, 0.0]);
        assert_eq!(axes.colors[2], [0.0, 1.0, 0.0]);
        assert_eq!(axes.colors[4], [0.0, 0.0, 1.0]);
    }
}
