// Copyright (c) 2025 - Cowboy AI, Inc.
//! Pure Decision Functions
//!
//! Every mutation follows the same shape:
//!
//! ```text
//! Snapshot + Command + now → Result<Change, IpamError>
//!    ↓                              ↓
//! read from store            committed by store (version-checked)
//! ```
//!
//! # Principles
//!
//! 1. **No I/O**: decisions only look at the snapshot they are handed
//! 2. **Time as Parameter**: `now` is passed in, never read here
//! 3. **Explicit versions**: every change names the versions it was decided
//!    against, so the store can reject stale decisions
//!
//! The service layer owns the read → decide → commit loop and retries it
//! when the store reports a conflict.

pub mod allocation;
pub mod placement;

pub use allocation::{
    apply_change, handle_allocate, handle_release, next_free_record, next_unused_address,
    release_time, BindingWrite, LedgerChange, RecordWrite,
};
pub use placement::{handle_install, handle_uninstall, InstallCommand, PlacementChange, RackWrite};
