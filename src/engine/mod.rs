pub mod analysis;
pub mod churn;
pub mod cochange;
pub mod complexity;
pub mod coupling;
pub mod filter;
pub mod history;
pub mod parser;
pub mod risk;
pub mod summary;
