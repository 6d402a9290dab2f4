pub mod devices;
pub mod locator;
pub mod parse;
pub mod runner;
pub mod scrcpy;
