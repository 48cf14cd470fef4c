pub mod filter;
pub mod group;
pub mod hierarchy;
pub mod render;
pub mod reparent;
pub mod selection;
pub mod sort;

pub use hierarchy::TaskTree;
pub use render::{RenderedView, ViewNode, render};
pub use selection::{ClickMods, Selection};
