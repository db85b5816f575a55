pub mod overpass;
pub mod parser;

pub use overpass::OverpassResponse;
pub use parser::{LINEAR_KEYS, OsmData};
