/// Gameplay tuning for the shared sphere.

#[derive(Debug, Clone, Copy)]
pub struct SphereTuning {
    /// World-space contact radius.
    pub radius: f32,

    /// Seconds between destruction and respawn.
    pub respawn_delay: f32,

    /// Seconds before a FadeAfterStart sphere fades out.
    pub fade_delay: f32,

    /// Minimum damage cooldown after an enemy hit, in seconds.
    pub damage_duration: f32,

    /// Displacement under which a tick does not count as movement.
    pub move_tolerance: f32,

    /// Life at level start when the level does not set one.
    pub starting_life: u32,
}

impl Default for SphereTuning {
    fn default() -> Self {
        Self {
            radius: 0.5,
            respawn_delay: 1.0,
            fade_delay: 5.0,
            damage_duration: 2.0,
            move_tolerance: 1e-5,
            starting_life: 3,
        }
    }
}
