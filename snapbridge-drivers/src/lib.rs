//! Hardware driver implementations
//!
//! This crate provides concrete implementations of the collaborator
//! traits defined in snapbridge-core:
//!
//! - Alarm sequencer (pump relay pulses and PWM buzzer)

#![no_std]
#![deny(unsafe_code)]

pub mod alarm;
