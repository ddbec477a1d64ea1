pub mod audit;
pub mod config;
pub mod error;
pub mod fetch;
pub mod output;
pub mod parser;
pub mod publish;
pub mod report;
pub mod source;
