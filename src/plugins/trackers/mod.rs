pub mod price;

pub use price::PriceParser;
