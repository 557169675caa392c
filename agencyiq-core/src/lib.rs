#![doc = "agencyiq-core: scheduling and content lifecycle logic for agencyiq."]

//! This crate holds every decision the agencyiq client makes about posts:
//! the 30-day calendar in the business timezone, quota-aware generation
//! sizing, the post approval state machine, schedule generation, the bounded
//! video approval workflow and batch auto-publishing.
//!
//! All remote work goes through the [`contract::ContentApi`] trait. The HTTP
//! implementation lives in the `agencyiq` crate; tests use `MockContentApi`.

pub mod calendar;
pub mod contract;
pub mod error;
pub mod lifecycle;
pub mod post;
pub mod publish;
pub mod quota;
pub mod render;
pub mod schedule;
pub mod store;
pub mod video;

pub use error::{SchedulerError, SchedulerResult};
