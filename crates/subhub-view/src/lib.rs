//! Turns `AppState` into markup: a declarative view model plus maud templates.

pub mod model;
pub mod render;

pub use model::{ShellView, actions, build_shell_view};
pub use render::{ROOT_ID, Region, render_page_document, render_regions, render_shell, stylesheet};
