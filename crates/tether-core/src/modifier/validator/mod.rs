pub mod len;
pub mod num;
pub mod text;

pub use len::*;
pub use num::*;
pub use text::*;
