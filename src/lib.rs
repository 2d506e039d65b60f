pub mod ai;
pub mod app;
pub mod auth;
pub mod config;
pub mod content;
pub mod domain;
pub mod error;
pub mod generation;
pub mod graphql;
pub mod jobs;
pub mod logging;
pub mod metrics;
pub mod seed;
pub mod server;
pub mod storage;
pub mod wikimedia;
pub mod workflow;
