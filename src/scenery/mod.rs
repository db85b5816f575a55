//! Scenery tree layout and object placement.

pub mod bucket;
pub mod stg;

pub use bucket::{Bucket, bucket_span};
pub use stg::{SceneryKind, StgManager, StgRecord, StgWriter, rewrite_block};
