//! Rigid-body world: static walls and dynamic blocks, backed by rapier2d.
//!
//! Callers speak screen pixels. Internally one grid cell is one metre so the
//! solver's default tolerances fit the scale of the bodies.

use rapier2d::prelude::*;

use crate::consts::{CELL_SIZE, GRAVITY, MAX_SUBSTEPS, SIM_DT};

/// Handle of a body registered with the world.
pub type BodyHandle = RigidBodyHandle;

const PIXELS_PER_METRE: Real = CELL_SIZE;

const WALL_ELASTICITY: Real = 0.5;
const WALL_FRICTION: Real = 0.9;

#[inline]
fn to_world(px: Vector<Real>) -> Vector<Real> {
    px / PIXELS_PER_METRE
}

#[inline]
fn to_screen(m: Vector<Real>) -> Vector<Real> {
    m * PIXELS_PER_METRE
}

/// The simulation service. Owns every body and collider; nothing else holds
/// rapier state.
pub struct PhysicsWorld {
    gravity: Vector<Real>,
    params: IntegrationParameters,
    pipeline: PhysicsPipeline,
    islands: IslandManager,
    broad_phase: BroadPhase,
    narrow_phase: NarrowPhase,
    bodies: RigidBodySet,
    colliders: ColliderSet,
    impulse_joints: ImpulseJointSet,
    multibody_joints: MultibodyJointSet,
    ccd: CCDSolver,
}

impl Default for PhysicsWorld {
    fn default() -> Self {
        Self::new()
    }
}

impl PhysicsWorld {
    /// Empty world with the game's downward gravity.
    pub fn new() -> Self {
        Self::with_gravity(GRAVITY)
    }

    /// Empty world with a custom downward acceleration in px/s².
    pub fn with_gravity(gravity: f32) -> Self {
        Self {
            gravity: to_world(vector![0.0, gravity]),
            params: IntegrationParameters::default(),
            pipeline: PhysicsPipeline::new(),
            islands: IslandManager::new(),
            broad_phase: BroadPhase::new(),
            narrow_phase: NarrowPhase::new(),
            bodies: RigidBodySet::new(),
            colliders: ColliderSet::new(),
            impulse_joints: ImpulseJointSet::new(),
            multibody_joints: MultibodyJointSet::new(),
            ccd: CCDSolver::new(),
        }
    }

    /// Add a static box. `center` and `half_extents` are in pixels.
    pub fn add_wall(&mut self, center: Vector<Real>, half_extents: Vector<Real>) -> BodyHandle {
        let body = RigidBodyBuilder::fixed()
            .translation(to_world(center))
            .build();
        let he = to_world(half_extents);
        let collider = ColliderBuilder::cuboid(he.x, he.y)
            .restitution(WALL_ELASTICITY)
            .friction(WALL_FRICTION)
            .build();
        let handle = self.bodies.insert(body);
        self.colliders
            .insert_with_parent(collider, handle, &mut self.bodies);
        handle
    }

    /// Add a dynamic box body with one cuboid collider of the given mass.
    pub fn add_box(
        &mut self,
        center: Vector<Real>,
        half_extents: Vector<Real>,
        mass: f32,
        elasticity: f32,
        friction: f32,
    ) -> BodyHandle {
        let body = RigidBodyBuilder::dynamic()
            .translation(to_world(center))
            .ccd_enabled(true)
            .build();
        let he = to_world(half_extents);
        let area = 4.0 * he.x * he.y;
        let collider = ColliderBuilder::cuboid(he.x, he.y)
            .density(mass / area)
            .restitution(elasticity)
            .friction(friction)
            .build();
        let handle = self.bodies.insert(body);
        self.colliders
            .insert_with_parent(collider, handle, &mut self.bodies);
        handle
    }

    /// Remove a body together with its colliders. Unknown handles are ignored.
    pub fn remove_body(&mut self, handle: BodyHandle) {
        self.bodies.remove(
            handle,
            &mut self.islands,
            &mut self.colliders,
            &mut self.impulse_joints,
            &mut self.multibody_joints,
            true,
        );
    }

    /// Push on a body at its local origin for the duration of the next `step`.
    pub fn apply_force(&mut self, handle: BodyHandle, force: Vector<Real>) {
        if let Some(body) = self.bodies.get_mut(handle) {
            body.add_force(to_world(force), true);
        }
    }

    /// Teleport a body by `delta` pixels and wake it.
    pub fn translate(&mut self, handle: BodyHandle, delta: Vector<Real>) {
        if let Some(body) = self.bodies.get_mut(handle) {
            let moved = body.translation() + to_world(delta);
            body.set_translation(moved, true);
        }
    }

    /// Advance the world by `dt` seconds in fixed sub-steps.
    pub fn step(&mut self, dt: f32) {
        if dt <= 0.0 {
            return;
        }
        let mut remaining = dt;
        let mut substeps = 0;
        while remaining > f32::EPSILON && substeps < MAX_SUBSTEPS {
            let h = remaining.min(SIM_DT);
            self.params.dt = h;
            self.pipeline.step(
                &self.gravity,
                &self.params,
                &mut self.islands,
                &mut self.broad_phase,
                &mut self.narrow_phase,
                &mut self.bodies,
                &mut self.colliders,
                &mut self.impulse_joints,
                &mut self.multibody_joints,
                &mut self.ccd,
                None,
                &(),
                &(),
            );
            remaining -= h;
            substeps += 1;
        }
        // Forces are one-shot: they act over exactly one call.
        for (_, body) in self.bodies.iter_mut() {
            body.reset_forces(false);
        }
    }

    /// Body centre in pixels.
    pub fn position(&self, handle: BodyHandle) -> Option<Vector<Real>> {
        self.bodies
            .get(handle)
            .map(|body| to_screen(*body.translation()))
    }

    /// World-space corners of the body's box collider in pixels, in winding order.
    pub fn vertices(&self, handle: BodyHandle) -> Option<[Point<Real>; 4]> {
        let body = self.bodies.get(handle)?;
        let collider = self.colliders.get(*body.colliders().first()?)?;
        let he = collider.shape().as_cuboid()?.half_extents;
        let iso = body.position();
        let corner = |x: Real, y: Real| {
            let p = iso.transform_point(&point![x, y]);
            point![p.x * PIXELS_PER_METRE, p.y * PIXELS_PER_METRE]
        };
        Some([
            corner(-he.x, -he.y),
            corner(he.x, -he.y),
            corner(he.x, he.y),
            corner(-he.x, he.y),
        ])
    }

    pub fn body_count(&self) -> usize {
        self.bodies.len()
    }

    pub fn collider_count(&self) -> usize {
        self.colliders.len()
    }
}
