pub mod evidence;
pub mod input;

pub use evidence::*;
pub use input::*;
