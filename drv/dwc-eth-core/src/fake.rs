// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Simulated register window and platform for host tests.
//!
//! `FakeIo` backs the register window with a map and records every access,
//! so tests can assert not just results but exactly which registers were
//! touched, how many times, and in what order. Bits that real hardware
//! clears on its own are modeled with `clear_mask_after`, and registers
//! whose reads return a sequence of latched values (the indirect GCL data
//! register) with `queue_reads`.

use std::cell::RefCell;
use std::collections::{BTreeMap, VecDeque};

use crate::{LogTag, Platform, RegisterIo, Severity};

#[derive(Default)]
pub(crate) struct FakeIo {
    mem: RefCell<BTreeMap<u32, u32>>,
    /// Every write, in order.
    pub writes: RefCell<Vec<(u32, u32)>>,
    read_counts: RefCell<BTreeMap<u32, usize>>,
    /// offset -> (mask, k): reads of `offset` report `mask` set until the
    /// k-th read of that offset, which (and all later reads) report it
    /// clear. k == 0 means the mask always reads clear.
    clear_after: RefCell<BTreeMap<u32, (u32, usize)>>,
    /// offset -> queued read values, consumed front-first before `mem` is
    /// consulted.
    queued: RefCell<BTreeMap<u32, VecDeque<u32>>>,
}

impl FakeIo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, offset: u32, value: u32) {
        self.mem.borrow_mut().insert(offset, value);
    }

    pub fn get(&self, offset: u32) -> u32 {
        self.mem.borrow().get(&offset).copied().unwrap_or(0)
    }

    pub fn clear_mask_after(&self, offset: u32, mask: u32, k: usize) {
        self.clear_after.borrow_mut().insert(offset, (mask, k));
    }

    pub fn queue_reads(&self, offset: u32, values: &[u32]) {
        self.queued
            .borrow_mut()
            .entry(offset)
            .or_default()
            .extend(values.iter().copied());
    }

    pub fn reads_of(&self, offset: u32) -> usize {
        self.read_counts.borrow().get(&offset).copied().unwrap_or(0)
    }

    pub fn total_writes(&self) -> usize {
        self.writes.borrow().len()
    }
}

impl RegisterIo for FakeIo {
    fn read_reg(&self, offset: u32) -> u32 {
        let n = {
            let mut counts = self.read_counts.borrow_mut();
            let n = counts.entry(offset).or_insert(0);
            *n += 1;
            *n
        };

        if let Some(q) = self.queued.borrow_mut().get_mut(&offset) {
            if let Some(v) = q.pop_front() {
                return v;
            }
        }

        let mut value = self.get(offset);
        if let Some(&(mask, k)) = self.clear_after.borrow().get(&offset) {
            if n >= k {
                value &= !mask;
            } else {
                value |= mask;
            }
        }
        value
    }

    fn write_reg(&self, offset: u32, value: u32) {
        self.mem.borrow_mut().insert(offset, value);
        self.writes.borrow_mut().push((offset, value));
    }
}

#[derive(Default)]
pub(crate) struct FakePlatform {
    pub delays: RefCell<Vec<u32>>,
    pub reports: RefCell<Vec<(Severity, LogTag, &'static str, u64)>>,
}

impl FakePlatform {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Platform for FakePlatform {
    fn delay_us(&self, us: u32) {
        self.delays.borrow_mut().push(us);
    }

    fn report(&self, severity: Severity, tag: LogTag, msg: &'static str, value: u64) {
        self.reports.borrow_mut().push((severity, tag, msg, value));
    }
}
