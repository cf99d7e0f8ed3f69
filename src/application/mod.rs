//! Application services: the render workflow and its error surface.

pub mod backend;
pub mod error;
pub mod render;
