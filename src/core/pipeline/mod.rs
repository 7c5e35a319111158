pub mod classifying;
pub mod cleanup;
pub mod compiling;
pub mod executing;
pub mod grading;
pub mod materializing;
