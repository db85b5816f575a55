pub mod ac3d;
pub mod builder;
pub mod ribbon;
pub mod validation;

pub use ac3d::write_ac;
pub use builder::{AcFile, AcObject, Face, MAT_LIT, MAT_UNLIT};
pub use ribbon::{Ribbon, RibbonError, VertexHeights};
pub use validation::{ValidationResult, remove_bad_faces};
