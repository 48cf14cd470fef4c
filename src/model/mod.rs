pub mod config;
pub mod project;
pub mod task;
pub mod template;
pub mod view;

pub use config::*;
pub use project::*;
pub use task::*;
pub use template::*;
pub use view::*;
