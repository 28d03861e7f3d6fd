pub mod division;
pub mod file;
pub mod toc;

pub use division::*;
pub use file::*;
pub use toc::*;
