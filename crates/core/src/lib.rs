#![forbid(unsafe_code)]

pub mod adapter;
pub mod error;
pub mod ids;
pub mod layout;
pub mod model;
pub mod plan;
pub mod planners;
pub mod validate;
