// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Enhanced Scheduled Traffic: gate-control-list validation.
//!
//! Before a schedule is committed, it has to be checked against two sets
//! of constraints. The first is geometric and purely software: the list
//! must fit the hardware depth, every entry must fit the entry width, and
//! no entry may be cut by the cycle boundary closer than the gate state
//! machine's minimum granularity (eight PTP clock cycles). The second only
//! applies while a schedule is already running: the new base time must not
//! land inside that same granularity window relative to the running
//! cycle's phase, which requires reading the live schedule back out of
//! whichever double-buffer bunk the hardware currently owns.
//!
//! The schedule memory is not memory-mapped; it is reached through an
//! indirect control register, one 32-bit word per transaction.

use crate::ptp::NSEC_PER_SEC;
use crate::regs::{
    EST_ADDR_BTR_HIGH, EST_ADDR_BTR_LOW, EST_ADDR_CTR_HIGH, EST_ADDR_CTR_LOW, EST_CONTROL_EEST,
    EST_DBGB, EST_DBGM, EST_ERR0, EST_GCRR, EST_R1W0, EST_SRWO, EST_STATUS_SWOL,
};
use crate::{Controller, EthError, LogTag, Platform, RegisterIo, Severity};

/// Retry budget for one indirect GCL read.
const GCL_READ_RETRY_COUNT: u32 = 1000;
/// Delay between polls of the start bit, in microseconds.
const GCL_READ_DELAY_US: u32 = 1;

/// A (seconds, nanoseconds) pair as the schedule registers carry them.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct TimePair {
    pub sec: u32,
    pub nsec: u32,
}

/// A caller-supplied gate-control schedule. Borrowed for the duration of
/// one validation call; never retained.
#[derive(Clone, Debug)]
pub struct EstConfig<'a> {
    /// Gate-control entries (gate bits plus time interval), in order.
    pub gcl: &'a [u32],
    /// Offset added to the base time before comparison with the live
    /// schedule.
    pub base_time_offset: TimePair,
    /// Cycle (repeat) time of the schedule.
    pub cycle_time: TimePair,
}

impl<R: RegisterIo, P: Platform> Controller<R, P> {
    /// Validates `est` against the variant's limits and, if a schedule is
    /// currently running, against its phase. Does not commit anything;
    /// a successful return means the separate commit path may proceed.
    pub fn est_validate(&self, est: &EstConfig<'_>, btr: TimePair) -> Result<(), EthError> {
        let t = self.table;
        let cycle8 = u64::from(t.ptp_cycle_8);

        if est.gcl.len() as u64 > u64::from(t.gcl_depth) {
            self.platform.report(
                Severity::Error,
                LogTag::Invalid,
                "est: schedule deeper than GCL",
                est.gcl.len() as u64,
            );
            return Err(EthError::GclTooDeep);
        }

        let ctr =
            u64::from(est.cycle_time.sec) * NSEC_PER_SEC + u64::from(est.cycle_time.nsec);
        let btr_new = (u64::from(btr.sec) + u64::from(est.base_time_offset.sec)) * NSEC_PER_SEC
            + u64::from(btr.nsec)
            + u64::from(est.base_time_offset.nsec);

        let mut sum_ti = 0u64;
        let mut sum_tin = 0u64;
        for (i, &entry) in est.gcl.iter().enumerate() {
            if entry > t.gcl_width {
                self.platform.report(
                    Severity::Error,
                    LogTag::Invalid,
                    "est: entry wider than hardware",
                    i as u64,
                );
                return Err(EthError::GclEntryTooWide);
            }

            sum_ti += u64::from(entry & t.ti_mask);
            // An entry running past the cycle boundary is fine as long as
            // the prefix before it left at least the minimum granularity.
            if sum_ti > ctr && ctr.wrapping_sub(sum_tin) >= cycle8 {
                continue;
            }
            let slack = ctr.wrapping_sub(sum_ti);
            if slack != 0 && slack < cycle8 {
                self.platform.report(
                    Severity::Error,
                    LogTag::Invalid,
                    "est: entry truncated by cycle boundary",
                    i as u64,
                );
                return Err(EthError::GclTruncation);
            }
            sum_tin = sum_ti;
        }

        // Phase check against the running schedule, if there is one.
        let control = self.io.read_reg(t.est_control);
        if control & EST_CONTROL_EEST == 0 {
            return Ok(());
        }

        // The hardware owns one bunk; read the schedule from the other.
        let status = self.io.read_reg(t.est_status);
        let bunk = if status & EST_STATUS_SWOL == 0 {
            EST_DBGB
        } else {
            0
        };

        let addrs = [
            EST_ADDR_BTR_LOW,
            EST_ADDR_BTR_HIGH,
            EST_ADDR_CTR_LOW,
            EST_ADDR_CTR_HIGH,
        ];
        let mut words = [0u32; 4];
        for (slot, &addr) in words.iter_mut().zip(&addrs) {
            *slot = self.est_read(addr, bunk)?;
        }
        let [btr_l, btr_h, ctr_l, ctr_h] = words;

        let old_btr = u64::from(btr_l) + u64::from(btr_h) * NSEC_PER_SEC;
        let old_ctr = u64::from(ctr_l) + u64::from(ctr_h) * NSEC_PER_SEC;

        if old_btr != btr_new {
            // A zero live cycle time admits no phase constraint.
            let rem = old_btr
                .abs_diff(btr_new)
                .checked_rem(old_ctr)
                .unwrap_or(0);
            if rem != 0 && rem < cycle8 {
                self.platform.report(
                    Severity::Error,
                    LogTag::Invalid,
                    "est: base time conflicts with running cycle",
                    rem,
                );
                return Err(EthError::InvalidBaseTime);
            }
        }

        Ok(())
    }

    /// One word of the indirect GCL read protocol: start a read of a
    /// gate-control register in `bunk`, wait for the start bit to
    /// self-clear, check the error bit, and fetch the data register.
    fn est_read(&self, addr: u32, bunk: u32) -> Result<u32, EthError> {
        let t = self.table;
        self.io.write_reg(
            t.est_gcl_control,
            EST_SRWO | EST_R1W0 | EST_GCRR | EST_DBGM | bunk | addr,
        );

        let mut retry = GCL_READ_RETRY_COUNT;
        let value = loop {
            let value = self.io.read_reg(t.est_gcl_control);
            if value & EST_SRWO == 0 {
                break value;
            }
            if retry == 0 {
                self.platform.report(
                    Severity::Error,
                    LogTag::HwFail,
                    "est: indirect read timed out",
                    u64::from(addr),
                );
                return Err(EthError::HwTimeout);
            }
            retry -= 1;
            self.platform.delay_us(GCL_READ_DELAY_US);
        };

        if value & EST_ERR0 != 0 {
            self.platform.report(
                Severity::Error,
                LogTag::HwFail,
                "est: indirect read error",
                u64::from(addr),
            );
            return Err(EthError::GclReadFailed);
        }

        Ok(self.io.read_reg(t.est_data))
    }
}
