pub mod batch;
pub mod fractional;
pub mod integer;

pub use batch::BatchEncoder;
pub use fractional::FractionalEncoder;
pub use integer::IntegerEncoder;
