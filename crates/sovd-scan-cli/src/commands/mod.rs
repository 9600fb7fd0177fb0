//! Command implementations for sovd-scan

pub mod report;
pub mod scan;

pub use report::report;
pub use scan::scan;
