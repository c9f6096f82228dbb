//! Commands module - service layer for running simulation test cases

mod report;
pub(crate) mod service;

pub use report::{Expectation, OutcomeReport, TestReport};
pub use service::{SimulationService, TestCase};
