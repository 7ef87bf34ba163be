pub mod classification;
pub mod dataset;
pub mod day_key;
pub mod forecast_row;
