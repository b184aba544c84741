//! CLI Commands

pub mod auth;
pub mod report;
pub mod run;
pub mod specs;
pub mod task;
