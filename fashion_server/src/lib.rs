//! Fashion-MNIST image classification served to the browser.
pub mod classifier;
pub mod endpoints;
pub mod meter;
pub mod nn;
pub mod preproc;
pub mod preview;
pub mod utils;
