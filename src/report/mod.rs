pub mod json;
pub mod qdist_txt;
pub mod summary_txt;
pub mod zip;
