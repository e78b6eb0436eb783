pub mod expand;
pub mod outcome;
pub mod sample;
