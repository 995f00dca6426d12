pub mod fakes;
pub mod utils;
