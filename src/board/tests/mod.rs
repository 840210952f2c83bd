//! Board-level test suites.

mod make_unmake;
mod proptest;
