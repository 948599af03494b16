//! Internal test suite, organized by subject.


#[cfg(feature = "json")]
mod reader_tests;

#[cfg(all(feature = "json", feature = "plaintext"))]
mod concurrency_tests;
