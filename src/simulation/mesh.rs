//! Ribbon mesh data for a renderer
//!
//! The simulation never draws anything itself; this builds plain vertex,
//! index and UV arrays that a rendering host can upload.

use glam::{Vec2, Vec3};

use super::road_point::RoadPoint;

/// Triangle strip geometry for one road
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RoadMesh {
    pub vertices: Vec<Vec3>,
    /// Vertex indices, three per triangle
    pub triangles: Vec<u32>,
    pub uvs: Vec<Vec2>,
}

impl RoadMesh {
    pub fn triangle_count(&self) -> usize {
        self.triangles.len() / 3
    }
}

/// Build a strip `width` wide following `points`
///
/// Each point contributes a left and right vertex. Consecutive points are
/// joined by two triangles, and a closed strip adds two more to seal the
/// loop. `u` is 0 on one edge and 1 on the other; `v` rises from 0 at the
/// start to 1 halfway along and falls back to 0 at the end.
pub fn build_strip(points: &[RoadPoint], width: f32, closed: bool) -> RoadMesh {
    let count = points.len();
    let vertex_count = count * 2;
    let span_count = if count < 2 {
        0
    } else if closed {
        count
    } else {
        count - 1
    };

    let mut vertices = Vec::with_capacity(vertex_count);
    let mut uvs = Vec::with_capacity(vertex_count);
    let mut triangles = Vec::with_capacity(span_count * 6);

    for (i, point) in points.iter().enumerate() {
        let half = point.right() * width * 0.5;
        vertices.push(point.position() + half);
        vertices.push(point.position() - half);

        let completion = if count > 1 {
            i as f32 / (count - 1) as f32
        } else {
            0.0
        };
        let v = 1.0 - (2.0 * completion - 1.0).abs();
        uvs.push(Vec2::new(0.0, v));
        uvs.push(Vec2::new(1.0, v));
    }

    for span in 0..span_count {
        let vert = (span * 2) as u32;
        let total = vertex_count as u32;
        triangles.extend_from_slice(&[
            vert,
            (vert + 2) % total,
            vert + 1,
            vert + 1,
            (vert + 2) % total,
            (vert + 3) % total,
        ]);
    }

    RoadMesh {
        vertices,
        triangles,
        uvs,
    }
}

/// Texture scale that tiles the road texture at a constant world length
pub fn texture_scale(texture_tiling: f32, point_count: usize, point_spacing: f32) -> Vec2 {
    Vec2::new(
        1.0,
        (texture_tiling * point_count as f32 * point_spacing).round(),
    )
}
