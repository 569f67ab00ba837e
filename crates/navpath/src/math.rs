//! Small geometric helpers shared by the zone builder and the queries.
//!
//! Everything assumes a Y-up world: "horizontal" means the xz-plane.

#[cfg(feature = "bevy_reflect")]
use bevy_reflect::prelude::*;
use glam::{UVec3, Vec3A};

/// An axis-aligned bounding box in world space.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "bevy_reflect", derive(Reflect))]
pub struct Aabb3d {
    /// The minimum corner.
    pub min: Vec3A,
    /// The maximum corner.
    pub max: Vec3A,
}

impl Aabb3d {
    /// Creates an AABB from its corners.
    #[inline]
    pub fn new(min: impl Into<Vec3A>, max: impl Into<Vec3A>) -> Self {
        Self {
            min: min.into(),
            max: max.into(),
        }
    }

    /// Returns the smallest AABB containing both `self` and `other`.
    #[inline]
    pub fn union(&self, other: &Self) -> Self {
        Self::new(self.min.min(other.min), self.max.max(other.max))
    }

    /// Whether `point` lies in the box grown by `margin` on every side.
    #[inline]
    pub fn contains_point(&self, point: Vec3A, margin: Vec3A) -> bool {
        point.cmpge(self.min - margin).all() && point.cmple(self.max + margin).all()
    }

    /// Whether the box overlaps the sphere at `center` with `radius`.
    #[inline]
    pub fn intersects_sphere(&self, center: Vec3A, radius: f32) -> bool {
        let closest = center.clamp(self.min, self.max);
        closest.distance_squared(center) <= radius * radius
    }
}

pub(crate) trait TriangleIndices {
    fn normal(&self, vertices: &[Vec3A]) -> Vec3A;
}

impl TriangleIndices for UVec3 {
    #[inline]
    fn normal(&self, vertices: &[Vec3A]) -> Vec3A {
        let a = vertices[self[0] as usize];
        let b = vertices[self[1] as usize];
        let c = vertices[self[2] as usize];
        let ab = b - a;
        let ac = c - a;
        ab.cross(ac).normalize_or_zero()
    }
}

pub(crate) trait TriangleVertices {
    fn aabb(&self) -> Aabb3d;
    fn area(&self) -> f32;
    fn closest_point(&self, point: Vec3A) -> Vec3A;
    fn barycentric_xz(&self, point: Vec3A) -> Option<Vec3A>;
    fn edge_distances_xz(&self, point: Vec3A) -> Option<[f32; 3]>;
}

impl TriangleVertices for [Vec3A; 3] {
    #[inline]
    fn aabb(&self) -> Aabb3d {
        let min = self[0].min(self[1]).min(self[2]);
        let max = self[0].max(self[1]).max(self[2]);
        Aabb3d::new(min, max)
    }

    #[inline]
    fn area(&self) -> f32 {
        (self[1] - self[0]).cross(self[2] - self[0]).length() * 0.5
    }

    /// Closest point on the (solid) triangle to `point`, by Voronoi region classification.
    fn closest_point(&self, point: Vec3A) -> Vec3A {
        let [a, b, c] = *self;
        let ab = b - a;
        let ac = c - a;
        let ap = point - a;

        let d1 = ab.dot(ap);
        let d2 = ac.dot(ap);
        if d1 <= 0.0 && d2 <= 0.0 {
            return a;
        }

        let bp = point - b;
        let d3 = ab.dot(bp);
        let d4 = ac.dot(bp);
        if d3 >= 0.0 && d4 <= d3 {
            return b;
        }

        let vc = d1 * d4 - d3 * d2;
        if vc <= 0.0 && d1 >= 0.0 && d3 <= 0.0 {
            let v = d1 / (d1 - d3);
            return a + ab * v;
        }

        let cp = point - c;
        let d5 = ab.dot(cp);
        let d6 = ac.dot(cp);
        if d6 >= 0.0 && d5 <= d6 {
            return c;
        }

        let vb = d5 * d2 - d1 * d6;
        if vb <= 0.0 && d2 >= 0.0 && d6 <= 0.0 {
            let w = d2 / (d2 - d6);
            return a + ac * w;
        }

        let va = d3 * d6 - d5 * d4;
        if va <= 0.0 && (d4 - d3) >= 0.0 && (d5 - d6) >= 0.0 {
            let w = (d4 - d3) / ((d4 - d3) + (d5 - d6));
            return b + (c - b) * w;
        }

        let denom = 1.0 / (va + vb + vc);
        let v = vb * denom;
        let w = vc * denom;
        a + ab * v + ac * w
    }

    /// Barycentric coordinates of `point` projected onto the xz-plane.
    /// `None` if the triangle is vertical, i.e. has no footprint on the xz-plane.
    fn barycentric_xz(&self, point: Vec3A) -> Option<Vec3A> {
        let [a, b, c] = *self;
        let area = tri_area_2d(a, b, c);
        if area.abs() <= f32::EPSILON {
            return None;
        }
        let u = tri_area_2d(b, c, point) / area;
        let v = tri_area_2d(c, a, point) / area;
        Some(Vec3A::new(u, v, 1.0 - u - v))
    }

    /// Signed distances of `point` to the three edges on the xz-plane.
    /// Positive values are on the inner side of the edge, regardless of winding.
    fn edge_distances_xz(&self, point: Vec3A) -> Option<[f32; 3]> {
        let area = tri_area_2d(self[0], self[1], self[2]);
        if area.abs() <= f32::EPSILON {
            return None;
        }
        let sign = area.signum();
        let mut distances = [0.0; 3];
        for (i, distance) in distances.iter_mut().enumerate() {
            let from = self[i];
            let to = self[(i + 1) % 3];
            let length = (to - from).with_y(0.0).length();
            if length <= f32::EPSILON {
                return None;
            }
            *distance = sign * tri_area_2d(from, to, point) / length;
        }
        Some(distances)
    }
}

/// Twice the signed area of the triangle `abc` on the xz-plane.
///
/// Positive when `c` lies to the left of `a -> b` as seen from above (+Y).
#[inline]
pub(crate) fn tri_area_2d(a: Vec3A, b: Vec3A, c: Vec3A) -> f32 {
    let ab = b - a;
    let ac = c - a;
    ab.z * ac.x - ab.x * ac.z
}
