//! nv-i2c - I2C port inspection over an nvif transport.

pub mod cli;
pub mod commands;
pub mod error;
pub mod logging;
pub mod output;
pub mod styles;
