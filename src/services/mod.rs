pub mod aggregator;
pub mod catalog;
pub mod oracle;
pub mod recommendations;
pub mod scoring;
