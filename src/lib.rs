//! Intro video generator: submits parameterised renders to a serverless
//! renderer and reports their progress over JSON and a live browser page.

pub mod application;
pub mod config;
pub mod domain;
pub mod infra;
pub mod presentation;
