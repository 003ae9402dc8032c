// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Shared memory slots and the alliance mechanism.
//!
//! A [`MemSlot`] is the mutable half of an external-memory entry: the
//! place a buffer binding (fd + length) lands once a caller supplies an
//! I/O buffer or the runtime allocates an intermediate one. Slots can be
//! *allied* — pointed at one shared interior — so that a DMA-out in one
//! task and the DMA-in of the next task observe the same allocation with
//! a single `bind` call.

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::MemError;

/// A bound device buffer reference: file descriptor plus byte length.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct Binding {
    pub fd: i32,
    pub len: usize,
}

impl fmt::Display for Binding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "fd {} ({} bytes)", self.fd, self.len)
    }
}

#[derive(Debug, Default)]
struct SlotCore {
    binding: Option<Binding>,
}

/// A memory slot backing one external-memory entry.
///
/// Cloning a slot shares its interior (a clone *is* an ally); fresh
/// independent slots come from [`MemSlot::new`].
///
/// # Example
/// ```
/// use device_mem::MemSlot;
///
/// let producer = MemSlot::new();
/// let mut consumer = MemSlot::new();
/// consumer.ally_with(&producer).unwrap();
///
/// producer.bind(7, 4096).unwrap();
/// assert_eq!(consumer.binding().unwrap().fd, 7);
/// assert_eq!(consumer.binding().unwrap().len, 4096);
/// ```
#[derive(Debug, Clone, Default)]
pub struct MemSlot {
    core: Arc<Mutex<SlotCore>>,
}

impl MemSlot {
    /// Creates an unbound, unallied slot.
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds a buffer to this slot (and every allied slot).
    ///
    /// Binding is write-once: re-binding the identical buffer is a no-op,
    /// a differing rebind fails with [`MemError::RebindMismatch`].
    pub fn bind(&self, fd: i32, len: usize) -> Result<(), MemError> {
        let requested = Binding { fd, len };
        let mut core = self.lock();
        match core.binding {
            None => {
                core.binding = Some(requested);
                tracing::debug!(fd, len, "slot bound");
                Ok(())
            }
            Some(current) if current == requested => Ok(()),
            Some(current) => Err(MemError::RebindMismatch { current, requested }),
        }
    }

    /// The current binding, if any.
    pub fn binding(&self) -> Option<Binding> {
        self.lock().binding
    }

    pub fn is_bound(&self) -> bool {
        self.binding().is_some()
    }

    /// Allies this slot with `lead`: both now share one interior, so a
    /// bind through either is observed through both.
    ///
    /// If this slot already carries a binding it is carried over to the
    /// shared interior; conflicting pre-existing bindings fail with
    /// [`MemError::AllianceConflict`] and leave both slots untouched.
    pub fn ally_with(&mut self, lead: &MemSlot) -> Result<(), MemError> {
        if self.is_allied_with(lead) {
            return Ok(());
        }
        let ours = self.lock().binding;
        if let Some(ours) = ours {
            let mut lead_core = lead.lock();
            match lead_core.binding {
                None => lead_core.binding = Some(ours),
                Some(theirs) if theirs == ours => {}
                Some(theirs) => return Err(MemError::AllianceConflict { ours, theirs }),
            }
        }
        self.core = Arc::clone(&lead.core);
        Ok(())
    }

    /// `true` if both slots share one interior.
    pub fn is_allied_with(&self, other: &MemSlot) -> bool {
        Arc::ptr_eq(&self.core, &other.core)
    }

    /// A slot mutex only guards plain data; a poisoned lock still holds a
    /// consistent value.
    fn lock(&self) -> MutexGuard<'_, SlotCore> {
        match self.core.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}
