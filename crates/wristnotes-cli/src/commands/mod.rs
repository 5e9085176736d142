pub mod common;
pub mod list;
pub mod show;
pub mod sync;
