pub mod acquisition;
pub mod commit;
pub mod constraints;
pub mod correlator;
#[cfg(feature = "demo")]
pub mod demo;
pub mod device;
pub mod thermal;
