// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! OS-independent core for the DesignWare dual-variant Ethernet MAC.
//!
//! The same upper-level driver has to cope with two incompatible register
//! layouts: the legacy single-gigabit EQOS controller and the multi-gigabit
//! MGBE controller. This crate hides the per-variant offsets, bit layouts,
//! and timing quirks behind one `Controller` surface, leaving bus
//! enumeration, interrupts, and DMA ring management to the surrounding
//! platform layer.
//!
//! The platform layer hands us two capabilities and never hears about them
//! again:
//!
//! - a [`RegisterIo`] implementation for each memory-mapped register window
//!   (the MAC window, plus the XPCS window on MGBE), and
//! - a [`Platform`] implementation providing a blocking microsecond delay
//!   and a structured diagnostic sink.
//!
//! Everything in here is synchronous and non-reentrant per `Controller`;
//! callers serialize access with whatever lock already guards the rest of
//! their driver. Nothing allocates.

#![cfg_attr(not(test), no_std)]

use num_derive::FromPrimitive;

mod est;
mod mac;
mod ptp;
mod regs;
mod xpcs;

#[cfg(test)]
pub(crate) mod fake;

pub use est::{EstConfig, TimePair};
pub use ptp::{PtpConfig, PtpFilter};
pub use regs::{PtpRegs, VendorTable};

/// Errors returned by the MAC core. The numbering is part of the surface so
/// upper layers can ferry these across an IPC boundary if they want to.
#[derive(Copy, Clone, Debug, Eq, PartialEq, FromPrimitive)]
#[repr(u32)]
pub enum EthError {
    /// Requested speed is outside the set the selected variant supports.
    UnsupportedSpeed = 1,
    /// A polled hardware condition did not settle within its retry budget.
    /// The hardware may be in a partial state; re-initialize to recover.
    HwTimeout = 2,
    /// The variant's dispatch table lacks the register cluster this
    /// operation needs. Nothing was written.
    NotSupported = 3,
    /// Gate-control schedule has more entries than the hardware list depth.
    GclTooDeep = 4,
    /// A gate-control entry is wider than the hardware entry width.
    GclEntryTooWide = 5,
    /// A gate-control entry would be truncated by the cycle boundary
    /// inside the minimum enforceable granularity.
    GclTruncation = 6,
    /// The new base time lands within the minimum phase-change granularity
    /// of the schedule currently running in hardware.
    InvalidBaseTime = 7,
    /// The indirect GCL read protocol reported an error.
    GclReadFailed = 8,
}

/// Severity attached to a diagnostic report.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Severity {
    Info,
    Error,
}

/// Coarse classification of what a diagnostic report is complaining about.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum LogTag {
    /// Caller-supplied argument was out of domain.
    Invalid,
    /// Hardware misbehaved (timeout, error bit).
    HwFail,
    /// Operation is not available on this variant.
    OpInvalid,
}

/// Capabilities the surrounding platform layer must supply.
pub trait Platform {
    /// Blocks for at least `us` microseconds.
    fn delay_us(&self, us: u32);

    /// Delivers a structured diagnostic record. Implementations typically
    /// feed a trace ring or the OS log; they must not fail.
    fn report(&self, severity: Severity, tag: LogTag, msg: &'static str, value: u64);
}

/// A single 32-bit memory-mapped register window.
///
/// One aligned access per call, no retry, no validation. Accesses must not
/// be reordered relative to other accesses through the same window; if the
/// platform needs explicit fencing, the implementation supplies it.
pub trait RegisterIo {
    fn read_reg(&self, offset: u32) -> u32;
    fn write_reg(&self, offset: u32, value: u32);
}

/// `RegisterIo` over a raw pointer, for real hardware.
pub struct Mmio {
    base: *mut u8,
}

impl Mmio {
    /// Wraps a register window starting at `base`.
    ///
    /// # Safety
    ///
    /// `base` must point at a mapped, device-memory register window that
    /// stays valid for the life of this value, and nothing else may access
    /// the window concurrently.
    pub unsafe fn new(base: *mut u8) -> Self {
        Self { base }
    }
}

impl RegisterIo for Mmio {
    fn read_reg(&self, offset: u32) -> u32 {
        unsafe { core::ptr::read_volatile(self.base.add(offset as usize).cast::<u32>()) }
    }

    fn write_reg(&self, offset: u32, value: u32) {
        unsafe {
            core::ptr::write_volatile(self.base.add(offset as usize).cast::<u32>(), value)
        }
    }
}

/// The two register layouts this core knows about. Selected once per
/// controller at construction and never changed.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum MacVariant {
    /// Legacy single-gigabit controller.
    Eqos,
    /// Multi-gigabit controller.
    Mgbe,
}

/// Duplex settings accepted by [`Controller::set_mode`]. Out-of-domain
/// integers are rejected at the `from_u32` conversion boundary.
#[derive(Copy, Clone, Debug, Eq, PartialEq, FromPrimitive)]
#[repr(u32)]
pub enum Duplex {
    Half = 0,
    Full = 1,
}

/// Link speeds the hardware family can express. Which subset is legal
/// depends on the variant; `set_speed` checks that.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Speed {
    Mbps10,
    Mbps100,
    Mbps1000,
    Mbps2500,
    Mbps5000,
    Mbps10000,
}

impl Speed {
    /// Maps a raw megabit-per-second value into the closed speed set.
    pub fn from_mbps(mbps: u32) -> Option<Self> {
        match mbps {
            10 => Some(Self::Mbps10),
            100 => Some(Self::Mbps100),
            1000 => Some(Self::Mbps1000),
            2500 => Some(Self::Mbps2500),
            5000 => Some(Self::Mbps5000),
            10000 => Some(Self::Mbps10000),
            _ => None,
        }
    }

    pub fn mbps(self) -> u32 {
        match self {
            Self::Mbps10 => 10,
            Self::Mbps100 => 100,
            Self::Mbps1000 => 1000,
            Self::Mbps2500 => 2500,
            Self::Mbps5000 => 5000,
            Self::Mbps10000 => 10000,
        }
    }
}

/// Per-controller context. Exclusively owned by the caller for the life of
/// the controller; the core never allocates or frees one.
pub struct Controller<R, P> {
    io: R,
    /// Second register window for the XPCS lane. Present on MGBE only.
    xpcs: Option<R>,
    platform: P,
    variant: MacVariant,
    table: &'static VendorTable,
    mac_ver: u32,
    ptp: PtpConfig,
    default_addend: u32,
}

impl<R: RegisterIo, P: Platform> Controller<R, P> {
    /// Builds a controller context for `variant`, resolving its dispatch
    /// table. `xpcs` is the secondary PCS window and is only consulted on
    /// MGBE; pass `None` on EQOS.
    pub fn new(
        variant: MacVariant,
        io: R,
        xpcs: Option<R>,
        platform: P,
        mac_ver: u32,
        ptp: PtpConfig,
    ) -> Self {
        Self {
            io,
            xpcs,
            platform,
            variant,
            table: regs::for_variant(variant),
            mac_ver,
            ptp,
            default_addend: 0,
        }
    }

    /// Test seam: same as `new` but with a caller-supplied dispatch table,
    /// so the missing-capability paths can be exercised.
    #[cfg(test)]
    pub(crate) fn with_table(
        variant: MacVariant,
        io: R,
        platform: P,
        table: &'static VendorTable,
    ) -> Self {
        Self {
            io,
            xpcs: None,
            platform,
            variant,
            table,
            mac_ver: 0,
            ptp: PtpConfig::default(),
            default_addend: 0,
        }
    }

    pub fn variant(&self) -> MacVariant {
        self.variant
    }

    pub fn table(&self) -> &'static VendorTable {
        self.table
    }

    /// Addend value programmed at PTP bring-up; frequency adjustments are
    /// computed relative to this, not to the last adjusted value.
    pub fn default_addend(&self) -> u32 {
        self.default_addend
    }

    /// Waits for the DMA-mode software-reset bit to self-clear after a
    /// reset request. On timeout the MAC is in an unknown state and needs
    /// to be reset again before use.
    pub fn poll_for_swr(&self) -> Result<(), EthError> {
        poll_for_clear(
            &self.io,
            &self.platform,
            self.table.dma_mode,
            regs::DMA_MODE_SWR,
        )
        .map(|_| ())
    }
}

/// Retry budget for [`poll_for_clear`].
pub(crate) const POLL_RETRY_COUNT: u32 = 1000;
/// Delay between unsuccessful polls, in microseconds.
pub(crate) const POLL_DELAY_US: u32 = 1000;

/// Reads `offset` until `(value & mask) == 0`, sleeping [`POLL_DELAY_US`]
/// between unsuccessful reads, giving up after [`POLL_RETRY_COUNT`]
/// retries. This is the one mechanism the core uses to notice that the
/// hardware finished an asynchronous operation.
///
/// Returns the final register value on success.
pub(crate) fn poll_for_clear<R: RegisterIo, P: Platform>(
    io: &R,
    platform: &P,
    offset: u32,
    mask: u32,
) -> Result<u32, EthError> {
    let mut count = 0;
    loop {
        if count > POLL_RETRY_COUNT {
            platform.report(
                Severity::Error,
                LogTag::HwFail,
                "poll_for_clear: timeout",
                u64::from(offset),
            );
            return Err(EthError::HwTimeout);
        }
        count += 1;

        let value = io.read_reg(offset);
        if value & mask == 0 {
            return Ok(value);
        }
        platform.delay_us(POLL_DELAY_US);
    }
}
