pub mod bounds;
pub mod line;
pub mod projection;
pub mod vector;

pub use bounds::Bounds;
pub use projection::Transform;
pub use vector::Vec2;
