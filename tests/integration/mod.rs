//! Integration tests for the mbot agent

mod console;
mod dispatch;
mod health;
mod lifecycle;
mod mining;
mod preemption;
mod single_flight;
mod support;
