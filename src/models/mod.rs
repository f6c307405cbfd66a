pub mod evidence;
pub mod proposal;
pub mod spend;

pub use evidence::*;
pub use proposal::*;
pub use spend::*;
