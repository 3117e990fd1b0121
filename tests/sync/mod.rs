// Test module entry point for sync tests
// End-to-end cycles against real temporary trees

mod cycle_tests;
mod property_tests;
mod scheduler_tests;
