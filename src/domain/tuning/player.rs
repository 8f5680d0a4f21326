/// Gameplay tuning for contributing players.
///
/// Keep this separate from runtime/server configuration (tick rates, buffer sizes, etc.).

#[derive(Debug, Clone, Copy)]
pub struct PlayerTuning {
    /// Mass given to players that join without one.
    pub default_mass: f32,

    /// Radius of the circle spawn points are laid out on.
    pub spawn_radius: f32,
}

impl Default for PlayerTuning {
    fn default() -> Self {
        Self {
            default_mass: 1.0,
            spawn_radius: 16.0,
        }
    }
}
