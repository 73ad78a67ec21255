pub mod checksum;

pub use checksum::U16OnesComplement;
