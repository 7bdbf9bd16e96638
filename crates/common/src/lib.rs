// tnt-common: wire-level types shared by clients and the track-and-trace registry

pub mod encoding;
pub mod protocol;
pub mod types;
