// Data pipeline: pure processing stages and the batch store

pub mod processing;
pub mod storage;
