//! Change handler implementations.

mod copy;

pub use copy::CopyHandler;
