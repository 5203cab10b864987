// Copyright (c) 2025 - Cowboy AI, Inc.
//! Property-Based Tests Entry Point
//!
//! proptest drives random allocate/release sequences and host enumeration
//! and checks the ledger invariants after every step.

mod fixtures;
mod property;
