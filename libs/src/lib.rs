pub mod field_structures;
pub mod merkle;
pub mod iotools;
pub mod backend;
pub mod utils;
