extern crate self as idnet_core;

pub mod log;
