//! Core traits.

mod component;

pub use component::{Component, ComponentFuture, ComponentInfo};
