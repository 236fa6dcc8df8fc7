//! Request handlers.

pub mod files;
pub mod health;
pub mod preview;
pub mod process;
pub mod watermark;

pub use files::*;
pub use health::*;
pub use preview::*;
pub use process::*;
pub use watermark::*;
