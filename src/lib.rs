//! Forgestat - contributor activity statistics for GitHub and GitLab.
//!
//! Queries a forge's REST API for per-user activity metrics (issues opened,
//! pull/merge requests opened and merged, commits, comments) over one
//! calendar year, with a disk cache so repeated runs never re-fetch and a
//! rate governor so the forge's abuse limits are respected.

pub mod aggregate;
pub mod backend;
pub mod cache;
pub mod cli;
pub mod client;
pub mod config;
pub mod models;
pub mod report;
