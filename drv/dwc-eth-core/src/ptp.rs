// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! PTP hardware clock adjustment.
//!
//! The MAC clock is a fixed-point accumulator: every cycle of the
//! reference clock adds the *addend* to a 32-bit fraction register, and
//! each overflow advances system time by the sub-second increment.
//! Frequency steering therefore means scaling the addend, and time
//! stepping means a one-shot signed offset applied through the update
//! registers. All command bits are self-clearing and polled.

use bitflags::bitflags;

use crate::regs::{
    PtpRegs, EQOS_MAC_CORE_4_10, MAC_SSIR_SSINC_SHIFT, MAC_STNUR_ADDSUB, MAC_TCR_TSADDREG,
    MAC_TCR_TSINIT, MAC_TCR_TSUPDT,
};
use crate::{poll_for_clear, Controller, EthError, LogTag, Platform, RegisterIo, Severity};

pub(crate) const NSEC_PER_SEC: u64 = 1_000_000_000;

/// Sub-second increment in nanoseconds, selected by MAC core revision.
const SSINC_16: u32 = 16;
const SSINC_4: u32 = 4;

bitflags! {
    /// Timestamp-control filter bits programmed at PTP enable. These share
    /// a register with the self-clearing command bits, which are not
    /// expressible here.
    #[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
    pub struct PtpFilter: u32 {
        /// Enable timestamping.
        const TSENA = 1 << 0;
        /// Fine correction method (addend-based).
        const TSCFUPDT = 1 << 1;
        /// Timestamp all received frames.
        const TSENALL = 1 << 8;
        /// Digital rollover (nanosecond field counts to 10^9).
        const TSCTRLSSR = 1 << 9;
        /// PTPv2 packet processing.
        const TSVER2ENA = 1 << 10;
        /// PTP over IP.
        const TSIPENA = 1 << 11;
        const TSIPV6ENA = 1 << 12;
        const TSIPV4ENA = 1 << 13;
        /// Timestamp event messages only.
        const TSEVNTENA = 1 << 14;
        /// Timestamp master messages.
        const TSMSTRENA = 1 << 15;
        const SNAPTYPSEL_1 = 1 << 16;
        /// 802.1AS gPTP operation.
        const AV8021ASMEN = 1 << 28;
    }
}

/// Caller-supplied PTP configuration, captured at construction and read
/// by `ptp_configuration`.
#[derive(Copy, Clone, Debug, Default)]
pub struct PtpConfig {
    /// Filter bits to program on enable.
    pub filter: PtpFilter,
    /// Initial wall time.
    pub sec: u32,
    pub nsec: u32,
    /// Reference clock feeding the timestamp accumulator, in Hz.
    pub ref_clk_rate_hz: u32,
    /// Nanosecond update registers carry full 10^9 range rather than
    /// binary fractions.
    pub one_nsec_accuracy: bool,
}

/// Splits a signed nanosecond delta into (negative, seconds, nanoseconds).
///
/// Quotients past `u32::MAX` seconds cannot be represented in the update
/// registers; the seconds component collapses to zero as the hardware
/// interface does not admit them.
pub(crate) fn split_time_delta(nsec_delta: i64) -> (bool, u32, u32) {
    let neg = nsec_delta < 0;
    let udelta = nsec_delta.unsigned_abs();
    let quotient = udelta / NSEC_PER_SEC;
    let remainder = udelta % NSEC_PER_SEC;

    let sec = if quotient <= u64::from(u32::MAX) {
        quotient as u32
    } else {
        0
    };
    (neg, sec, remainder as u32)
}

impl<R: RegisterIo, P: Platform> Controller<R, P> {
    fn ptp_regs(&self, msg: &'static str) -> Result<&'static PtpRegs, EthError> {
        match &self.table.ptp {
            Some(regs) => Ok(regs),
            None => {
                self.platform
                    .report(Severity::Info, LogTag::OpInvalid, msg, 0);
                Err(EthError::NotSupported)
            }
        }
    }

    /// Writes `addend` and latches it into the accumulator, waiting for
    /// the latch bit to self-clear.
    fn config_addend(&self, regs: &PtpRegs, addend: u32) -> Result<(), EthError> {
        self.io.write_reg(regs.tar, addend);
        let tcr = self.io.read_reg(regs.tcr);
        self.io.write_reg(regs.tcr, tcr | MAC_TCR_TSADDREG);
        poll_for_clear(&self.io, &self.platform, regs.tcr, MAC_TCR_TSADDREG).map(|_| ())
    }

    fn init_systime(&self, regs: &PtpRegs, sec: u32, nsec: u32) -> Result<(), EthError> {
        self.io.write_reg(regs.stsur, sec);
        self.io.write_reg(regs.stnur, nsec);
        let tcr = self.io.read_reg(regs.tcr);
        self.io.write_reg(regs.tcr, tcr | MAC_TCR_TSINIT);
        poll_for_clear(&self.io, &self.platform, regs.tcr, MAC_TCR_TSINIT).map(|_| ())
    }

    /// One-shot signed time offset through the update registers. Negative
    /// offsets use the hardware's complement convention: two's complement
    /// seconds, 10^9-complement (or 2^31-complement in binary-rollover
    /// mode) nanoseconds with the ADDSUB bit.
    fn adjust_mactime(
        &self,
        regs: &PtpRegs,
        sec: u32,
        nsec: u32,
        neg: bool,
    ) -> Result<(), EthError> {
        let (sec, nsec) = if neg {
            let nsec_field = if self.ptp.one_nsec_accuracy {
                (NSEC_PER_SEC as u32).wrapping_sub(nsec)
            } else {
                (1u32 << 31).wrapping_sub(nsec)
            };
            (sec.wrapping_neg(), nsec_field | MAC_STNUR_ADDSUB)
        } else {
            (sec, nsec)
        };

        self.io.write_reg(regs.stsur, sec);
        self.io.write_reg(regs.stnur, nsec);
        let tcr = self.io.read_reg(regs.tcr);
        self.io.write_reg(regs.tcr, tcr | MAC_TCR_TSUPDT);
        poll_for_clear(&self.io, &self.platform, regs.tcr, MAC_TCR_TSUPDT).map(|_| ())
    }

    /// Sets the hardware clock's wall time.
    pub fn set_systime_to_mac(&self, sec: u32, nsec: u32) -> Result<(), EthError> {
        let regs = self.ptp_regs("set_systime: no PTP registers")?;
        self.init_systime(regs, sec, nsec)
    }

    /// Steers the clock frequency by `ppb` parts per billion, relative to
    /// the default addend computed at bring-up.
    pub fn adjust_freq(&self, ppb: i32) -> Result<(), EthError> {
        let regs = self.ptp_regs("adjust_freq: no PTP registers")?;

        let neg = ppb < 0;
        let adj = u64::from(self.default_addend) * u64::from(ppb.unsigned_abs());
        let quotient = adj / NSEC_PER_SEC;
        let diff = if quotient < u64::from(u32::MAX) {
            quotient as u32
        } else {
            0
        };

        let mut addend = self.default_addend;
        if !neg {
            if addend <= u32::MAX - diff {
                addend += diff;
            }
        } else if addend > diff {
            addend -= diff;
        } else if addend < diff {
            // The hardware takes the magnitude here, not a wrapped
            // difference. Matches the controller's signed-magnitude
            // convention; confirm against silicon before relying on it.
            addend = diff - addend;
        }

        self.config_addend(regs, addend)
    }

    /// Steps the clock by a signed nanosecond offset.
    pub fn adjust_time(&self, nsec_delta: i64) -> Result<(), EthError> {
        let regs = self.ptp_regs("adjust_time: no PTP registers")?;
        let (neg, sec, nsec) = split_time_delta(nsec_delta);
        self.adjust_mactime(regs, sec, nsec, neg)
    }

    /// Enables or disables hardware timestamping.
    ///
    /// Disable clears the timestamp control register. Enable programs the
    /// filter, the sub-second increment, the default addend derived from
    /// the reference clock, and the initial wall time, in that order. The
    /// variant must expose the whole PTP cluster or nothing is written.
    pub fn ptp_configuration(&mut self, enable: bool) -> Result<(), EthError> {
        let regs = self.ptp_regs("ptp_configuration: no PTP registers")?;

        if !enable {
            self.io.write_reg(regs.tcr, 0);
            return Ok(());
        }

        self.io.write_reg(regs.tcr, self.ptp.filter.bits());

        let ssinc = if self.mac_ver <= EQOS_MAC_CORE_4_10 {
            SSINC_16
        } else {
            SSINC_4
        };
        self.io.write_reg(regs.ssir, ssinc << MAC_SSIR_SSINC_SHIFT);

        // addend = (2^32 * 10^9) / (ref_clk_hz * ssinc), all in 64-bit
        // arithmetic: (1000 << 32) * 10^6 keeps the intermediate inside
        // u64 range.
        let temp = (1000u64 << 32) * 1_000_000;
        let temp = temp / u64::from(self.ptp.ref_clk_rate_hz.max(1));
        let temp = temp / u64::from(ssinc);
        if temp < u64::from(u32::MAX) {
            self.default_addend = temp as u32;
        }

        self.config_addend(regs, self.default_addend)?;
        self.init_systime(regs, self.ptp.sec, self.ptp.nsec)
    }
}
