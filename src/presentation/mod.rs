//! Server-rendered pages and partials.

pub mod views;
