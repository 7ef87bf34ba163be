pub mod builder;
pub mod error;
pub mod inmet;
pub mod parse;
pub mod snapshot;
