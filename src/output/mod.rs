pub mod sink;
pub mod archive;
