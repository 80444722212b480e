pub mod csv;
pub mod pivot;
pub mod source;
pub mod storage;
