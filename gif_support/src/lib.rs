#[macro_use]
extern crate log;
extern crate custom_error;

pub mod common;
pub mod quantizer;
pub mod writer;
