#![forbid(unsafe_code)]

//! One pure planning function per supported intent. Each runs validation,
//! consults layout, and returns the minimal mutation list or a typed error.
//! Planners never execute anything and never touch storage.

mod container;
mod node;
mod reset;

pub use container::{
    activate_ghost, move_container, nest_container, resize_container, unnest_container,
};
pub use node::{create_manual_node, delete_node};
pub use reset::reset_layout;
