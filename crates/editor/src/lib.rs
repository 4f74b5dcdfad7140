mod config;
mod core;
mod deferred;
mod editor;
mod error;
mod executor;
mod inspector;
mod list_editor;
mod normalize;
mod ops;
mod persistence;
mod plugin;
mod region;
mod toolbar;

pub mod edit;
pub mod html;
pub mod plugins;
pub mod style;

pub use crate::config::*;
pub use crate::core::*;
pub use crate::deferred::*;
pub use crate::editor::*;
pub use crate::error::*;
pub use crate::executor::*;
pub use crate::inspector::*;
pub use crate::list_editor::*;
pub use crate::normalize::*;
pub use crate::ops::*;
pub use crate::persistence::*;
pub use crate::plugin::*;
pub use crate::region::*;
pub use crate::toolbar::*;
