//! Integration test driver for `tests/integration/`.
//!
//! Each `mod` below exercises the scheduler, the inputs and the state machine
//! together against mock hardware. Everything runs on the host.

mod car_tests;
mod mock_hw;
mod scheduler_tests;
