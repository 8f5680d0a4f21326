pub mod player;
pub mod sphere;

pub use player::PlayerTuning;
pub use sphere::SphereTuning;
