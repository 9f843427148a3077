pub mod artifacts;
pub mod bands;
pub mod ddr;
pub mod harness;
pub mod index;
pub mod series;
