pub mod stage1_draft;
pub mod stage2_illustrate;

pub use stage1_draft::*;
pub use stage2_illustrate::*;
