pub mod csv_source;
pub mod source;

pub use csv_source::CsvBarSource;
pub use source::BarSource;
