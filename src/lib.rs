//! # picam_daq
//!
//! Configure a scientific camera, then acquire readouts paired with sensor
//! temperature and capture timestamps, saving each to a raw file and a
//! metadata sidecar.
//!
//! ## Crate Structure
//!
//! - **`config`**: layered configuration (defaults, TOML, environment)
//! - **`logging`**: tracing subscriber setup
//! - **`cli`**: positional command-line surface of `picam_acquire`
//! - **`run`**: one configure-and-acquire run against a camera session
//!
//! The camera model lives in `daq-core`, the driver components in
//! `daq-driver-picam` and file output in `daq-storage`.

pub mod cli;
pub mod config;
pub mod logging;
pub mod run;
