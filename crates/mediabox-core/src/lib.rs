pub mod config;
pub mod logging;

// Task control
pub mod aggregator;
pub mod controller;
pub mod error;
pub mod job;
pub mod registry;
pub mod request;
pub mod status;

// Worker side and the protocol between worker and server
pub mod event;
pub mod fetcher;
pub mod progress_line;
pub mod worker;

// Format selection and output folders
pub mod folders;
pub mod format_spec;
pub mod formats;
