//! Fragment shading: Blinn-Phong lighting and depth visualization.

use crate::math::{remap_clamped, Vec3};
use crate::object::{Light, Material};

use super::geometry::Fragment;

/// Blinn-Phong specular exponent.
const SHININESS: f32 = 300.0;

/// Per-frame Blinn-Phong shader state: material, camera position, and
/// the light set, all immutable over the frame.
pub struct PhongShader<'a> {
    material: &'a Material,
    camera_pos: Vec3,
    lights: &'a [Light],
    ambient_light: Vec3,
}

impl<'a> PhongShader<'a> {
    pub fn new(
        material: &'a Material,
        camera_pos: Vec3,
        lights: &'a [Light],
        ambient_light: Vec3,
    ) -> PhongShader<'a> {
        PhongShader {
            material,
            camera_pos,
            lights,
            ambient_light,
        }
    }

    /// Shades one fragment; the result is clamped componentwise to [0, 1].
    pub fn run(&self, f: &Fragment) -> Vec3 {
        let mut ambient = Vec3::zeros();
        let mut diffuse = Vec3::zeros();
        let mut specular = Vec3::zeros();

        // fragment to camera
        let v = (self.camera_pos - f.w_pos).normalize();

        for light in self.lights {
            // fragment to light source
            let l = light.w_pos - f.w_pos;
            let r2 = l.dot(&l);
            let l = l.normalize();
            let h = (l + v).normalize();

            ambient += self.material.ka.component_mul(&self.ambient_light);
            diffuse += self.material.kd.component_mul(&light.intensity)
                * (f.w_normal.dot(&l).max(0.0) / r2);
            specular += self.material.ks.component_mul(&light.intensity)
                * (f.w_normal.dot(&h).max(0.0).powf(SHININESS) / r2);
        }

        remap_clamped(diffuse + specular + ambient, 0.0, 1.0, 0.0, 1.0)
    }
}

/// Maps a view-space depth onto a gray level, `[-4, 0]` onto `[0, 1]`;
/// farther fragments come out darker.
pub fn depth_color(depth: f32) -> Vec3 {
    remap_clamped(Vec3::repeat(depth), -4.0, 0.0, 0.0, 1.0)
}
