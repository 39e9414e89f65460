//! Scene objects: pose state, camera, model, lights, material.

use std::fmt::Write;

use bitflags::bitflags;

use crate::math::{rodrigues, Mat4, Vec3};
use crate::mesh::Mesh;

bitflags! {
    /// Motion directives applied to an [`Object`] on the next pose update.
    ///
    /// The input loop owns the writes; the pose update only reads.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct Actions: u32 {
        const MOVE_FORWARD = 1 << 0;
        const MOVE_LEFT = 1 << 1;
        const MOVE_BACK = 1 << 2;
        const MOVE_RIGHT = 1 << 3;
        const MOVE_UP = 1 << 4;
        const MOVE_DOWN = 1 << 5;
        const TURN_UP = 1 << 6;
        const TURN_LEFT = 1 << 7;
        const TURN_DOWN = 1 << 8;
        const TURN_RIGHT = 1 << 9;
    }
}

/// Pose state shared by everything that can move: a world position, a
/// forward unit vector `g`, an up unit vector, and the pending actions.
#[derive(Debug, Clone)]
pub struct Object {
    pub w_pos: Vec3,
    pub g: Vec3,
    pub up: Vec3,
    pub actions: Actions,
    /// Linear speed in world units per second.
    pub speed: f32,
    /// Angular speed in radians per second.
    pub rspeed: f32,
}

impl Object {
    pub fn new(w_pos: Vec3, g: Vec3, up: Vec3, speed: f32, rspeed: f32) -> Object {
        Object {
            w_pos,
            g,
            up,
            actions: Actions::empty(),
            speed,
            rspeed,
        }
    }

    pub fn set_action(&mut self, action: Actions, active: bool) {
        self.actions.set(action, active);
    }

    /// Applies the pending actions over `dt` seconds.
    ///
    /// Translation happens along the horizontal projection of `g` (and its
    /// horizontal right vector), so looking up does not slow walking down.
    /// Pitch rotates about `g x up`, yaw about the world up axis; both
    /// orientation vectors are re-normalized by the rotation itself.
    pub fn update_attitude(&mut self, dt: f32) {
        if self.actions.is_empty() {
            return;
        }

        let step = self.speed * dt;
        let theta = self.rspeed * dt;

        let forward = Vec3::new(self.g.x, 0.0, self.g.z).normalize();
        let right = forward.cross(&Vec3::y());

        if self.actions.contains(Actions::MOVE_FORWARD) {
            self.w_pos += forward * step;
        }
        if self.actions.contains(Actions::MOVE_BACK) {
            self.w_pos -= forward * step;
        }
        if self.actions.contains(Actions::MOVE_LEFT) {
            self.w_pos -= right * step;
        }
        if self.actions.contains(Actions::MOVE_RIGHT) {
            self.w_pos += right * step;
        }
        if self.actions.contains(Actions::MOVE_UP) {
            self.w_pos += self.up * step;
        }
        if self.actions.contains(Actions::MOVE_DOWN) {
            self.w_pos -= self.up * step;
        }

        let pitch_axis = self.g.cross(&self.up);
        if self.actions.contains(Actions::TURN_UP) {
            self.g = rodrigues(&pitch_axis, &self.g, theta);
            self.up = rodrigues(&pitch_axis, &self.up, theta);
        }
        if self.actions.contains(Actions::TURN_DOWN) {
            self.g = rodrigues(&pitch_axis, &self.g, -theta);
            self.up = rodrigues(&pitch_axis, &self.up, -theta);
        }
        if self.actions.contains(Actions::TURN_LEFT) {
            self.g = rodrigues(&Vec3::y(), &self.g, theta);
            self.up = rodrigues(&Vec3::y(), &self.up, theta);
        }
        if self.actions.contains(Actions::TURN_RIGHT) {
            self.g = rodrigues(&Vec3::y(), &self.g, -theta);
            self.up = rodrigues(&Vec3::y(), &self.up, -theta);
        }
    }

    pub fn debug_info(&self) -> String {
        let mut s = String::new();
        let _ = writeln!(
            s,
            "pos: {:.2} {:.2} {:.2}",
            self.w_pos.x, self.w_pos.y, self.w_pos.z
        );
        let _ = writeln!(s, "face to: {:.2} {:.2} {:.2}", self.g.x, self.g.y, self.g.z);
        let _ = writeln!(s, "up: {:.2} {:.2} {:.2}", self.up.x, self.up.y, self.up.z);
        s
    }
}

/// A point light with an RGB radiant intensity.
#[derive(Debug, Clone, Copy)]
pub struct Light {
    pub w_pos: Vec3,
    pub intensity: Vec3,
}

/// Blinn-Phong reflection coefficients.
#[derive(Debug, Clone, Copy)]
pub struct Material {
    pub ka: Vec3,
    pub kd: Vec3,
    pub ks: Vec3,
}

/// The viewpoint: a pose plus a perspective frustum.
///
/// The camera looks toward `-z` in its own space, so both `z_near` and
/// `z_far` are negative.
#[derive(Debug, Clone)]
pub struct Camera {
    pub pose: Object,
    pub fov: f32,
    pub aspect: f32,
    pub z_near: f32,
    pub z_far: f32,
}

impl Camera {
    pub fn new(pose: Object, fov: f32, aspect: f32, z_near: f32, z_far: f32) -> Camera {
        debug_assert!(z_near < 0.0 && z_far < z_near);
        Camera {
            pose,
            fov,
            aspect,
            z_near,
            z_far,
        }
    }

    /// World-to-view matrix: translate by `-pos`, then rotate into the
    /// camera basis `(g x up, up, -g)` laid out as rows.
    pub fn matrix_v(&self) -> Mat4 {
        let Object { w_pos, g, up, .. } = self.pose;
        let gxup = g.cross(&up);
        Mat4::new(
            gxup.x, gxup.y, gxup.z, -w_pos.dot(&gxup), //
            up.x, up.y, up.z, -w_pos.dot(&up), //
            -g.x, -g.y, -g.z, w_pos.dot(&g), //
            0.0, 0.0, 0.0, 1.0,
        )
    }

    /// View-to-clip perspective matrix.
    ///
    /// Composed of squeeze, translate, and scale so that the fourth clip
    /// component carries the untouched view-space Z; the depth test and
    /// the perspective-correct interpolation both rely on that.
    pub fn matrix_p(&self) -> Mat4 {
        let n = self.z_near;
        let f = self.z_far;
        let t = n.abs() * (self.fov / 2.0).tan();
        let b = -t;
        let r = t * self.aspect;
        let l = -r;
        Mat4::new(
            2.0 * n / (r - l), 0.0, (l + r) / (l - r), 0.0, //
            0.0, 2.0 * n / (t - b), (b + t) / (b - t), 0.0, //
            0.0, 0.0, (n + f) / (n - f), 2.0 * n * f / (f - n), //
            0.0, 0.0, 1.0, 0.0,
        )
    }

    pub fn debug_info(&self) -> String {
        format!(
            "camera:\nFOV: {:.2}\naspect: {:.2}\nzNear: {:.2}\nzFar: {:.2}\n{}",
            self.fov,
            self.aspect,
            self.z_near,
            self.z_far,
            self.pose.debug_info()
        )
    }
}

/// A mesh instance with a pose and a material.
#[derive(Debug, Clone)]
pub struct Model {
    pub pose: Object,
    pub mesh: Mesh,
    pub material: Material,
}

impl Model {
    pub fn new(pose: Object, mesh: Mesh, material: Material) -> Model {
        Model {
            pose,
            mesh,
            material,
        }
    }

    /// Model-to-world matrix: rotation from the basis `(g x up, up, -g)`
    /// laid out as columns, then translation to `w_pos`.
    pub fn matrix_m(&self) -> Mat4 {
        let Object { w_pos, g, up, .. } = self.pose;
        let gxup = g.cross(&up);
        let rotation = Mat4::new(
            gxup.x, up.x, -g.x, 0.0, //
            gxup.y, up.y, -g.y, 0.0, //
            gxup.z, up.z, -g.z, 0.0, //
            0.0, 0.0, 0.0, 1.0,
        );
        Mat4::new_translation(&w_pos) * rotation
    }

    pub fn debug_info(&self) -> String {
        format!(
            "model:\nvertices: {}\nnormals: {}\ntriangles: {}\n{}",
            self.mesh.positions.len(),
            self.mesh.normals.len(),
            self.mesh.faces.len(),
            self.pose.debug_info()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::f32::consts::{FRAC_PI_2, PI};

    fn looking_down_z() -> Object {
        Object::new(
            Vec3::zeros(),
            Vec3::new(0.0, 0.0, -1.0),
            Vec3::y(),
            2.0,
            FRAC_PI_2,
        )
    }

    #[test]
    fn opposite_moves_cancel() {
        let mut object = looking_down_z();
        object.set_action(Actions::MOVE_FORWARD, true);
        object.set_action(Actions::MOVE_BACK, true);
        object.set_action(Actions::MOVE_UP, true);
        object.set_action(Actions::MOVE_DOWN, true);
        object.update_attitude(0.5);
        assert_relative_eq!(object.w_pos, Vec3::zeros(), epsilon = 1e-6);
    }

    #[test]
    fn forward_motion_follows_horizontal_heading() {
        let mut object = looking_down_z();
        // Pitch up 45 degrees; walking forward must stay horizontal.
        object.g = Vec3::new(0.0, 1.0, -1.0).normalize();
        object.set_action(Actions::MOVE_FORWARD, true);
        object.update_attitude(1.0);
        assert_relative_eq!(object.w_pos, Vec3::new(0.0, 0.0, -2.0), epsilon = 1e-5);
    }

    #[test]
    fn quarter_yaw_turns_heading() {
        let mut object = looking_down_z();
        object.set_action(Actions::TURN_LEFT, true);
        object.update_attitude(1.0); // rspeed is pi/2 per second

        assert_relative_eq!(object.g, Vec3::new(-1.0, 0.0, 0.0), epsilon = 1e-5);
        assert_relative_eq!(object.up, Vec3::y(), epsilon = 1e-5);
    }

    #[test]
    fn rotations_keep_orientation_unit_length() {
        let mut object = looking_down_z();
        object.set_action(Actions::TURN_UP, true);
        object.set_action(Actions::TURN_LEFT, true);
        for _ in 0..1000 {
            object.update_attitude(0.016);
        }
        assert_relative_eq!(object.g.norm(), 1.0, epsilon = 1e-4);
        assert_relative_eq!(object.up.norm(), 1.0, epsilon = 1e-4);
    }

    #[test]
    fn view_matrix_moves_camera_to_origin() {
        let mut pose = looking_down_z();
        pose.w_pos = Vec3::new(1.0, 2.0, 3.0);
        let camera = Camera::new(pose, FRAC_PI_2, 1.0, -0.1, -10.0);

        let v = camera.matrix_v();
        let eye = v * nalgebra::Vector4::new(1.0, 2.0, 3.0, 1.0);
        assert_relative_eq!(eye.xyz(), Vec3::zeros(), epsilon = 1e-5);

        // A point one unit ahead of the camera lands on the -z axis.
        let ahead = v * nalgebra::Vector4::new(1.0, 2.0, 2.0, 1.0);
        assert_relative_eq!(ahead.xyz(), Vec3::new(0.0, 0.0, -1.0), epsilon = 1e-5);
    }

    #[test]
    fn projection_w_carries_view_z() {
        let camera = Camera::new(looking_down_z(), FRAC_PI_2, 1.0, -0.1, -10.0);
        let p = camera.matrix_p();
        for z in [-0.5f32, -1.0, -7.3] {
            let clip = p * nalgebra::Vector4::new(0.3, -0.2, z, 1.0);
            assert_relative_eq!(clip.w, z, epsilon = 1e-6);
        }
    }

    #[test]
    fn model_matrix_is_identity_for_canonical_pose() {
        let model_pose = looking_down_z();
        let mesh = Mesh::default();
        let material = Material {
            ka: Vec3::zeros(),
            kd: Vec3::zeros(),
            ks: Vec3::zeros(),
        };
        let model = Model::new(model_pose, mesh, material);
        assert_relative_eq!(model.matrix_m(), Mat4::identity(), epsilon = 1e-6);
    }

    #[test]
    fn model_matrix_rotates_about_up_after_yaw() {
        let mut pose = looking_down_z();
        pose.set_action(Actions::TURN_LEFT, true);
        pose.rspeed = PI;
        pose.update_attitude(0.5); // half turn of pi: 90 degrees left

        let mesh = Mesh::default();
        let material = Material {
            ka: Vec3::zeros(),
            kd: Vec3::zeros(),
            ks: Vec3::zeros(),
        };
        let model = Model::new(pose, mesh, material);
        let m = model.matrix_m();

        // The local -z axis (model forward) now points toward -x.
        let forward = m * nalgebra::Vector4::new(0.0, 0.0, -1.0, 0.0);
        assert_relative_eq!(forward.xyz(), Vec3::new(-1.0, 0.0, 0.0), epsilon = 1e-5);
    }
}
