// Test entry point for end-to-end reconcile tests
// Runs full sync passes against an in-memory object store

mod failure_tests;
mod memory_store;
mod path_tests;
