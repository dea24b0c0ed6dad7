//! Integration tests for the odometer engine.
//!
//! This test file aggregates all engine component tests.

mod ingest_test;
