//! Statement line-range lookup in raw policy file text

mod locator;

pub use locator::{BraceCountingLocator, StatementLocator};
