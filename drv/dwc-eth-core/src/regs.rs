// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Per-variant register layout tables.
//!
//! The two controllers expose the same functional registers at different
//! offsets and, in a few places, with different bit encodings. Everything
//! variant-specific lives in a [`VendorTable`] so the rest of the core can
//! be written once. The tables are immutable statics; a controller resolves
//! its table exactly once, at construction.
//!
//! The offsets and bit positions below must match the documented silicon
//! layouts bit-for-bit.

use crate::MacVariant;

/// Offsets of the timestamping register cluster. Absent from a table when
/// the variant (or an integration of it) has no PTP block, in which case
/// every PTP operation fails before touching hardware.
pub struct PtpRegs {
    /// Timestamp control.
    pub tcr: u32,
    /// Sub-second increment.
    pub ssir: u32,
    /// System time seconds update.
    pub stsur: u32,
    /// System time nanoseconds update.
    pub stnur: u32,
    /// Timestamp addend.
    pub tar: u32,
}

/// Register offsets, bit masks, and schedule limits for one MAC variant.
pub struct VendorTable {
    /// DMA mode register, holding the software-reset bit.
    pub dma_mode: u32,
    /// Control register carrying the transmit-enable bit.
    pub tx_ctrl: u32,
    /// Control register carrying the receive-enable bit. On EQOS this is
    /// the same register as `tx_ctrl`.
    pub rx_ctrl: u32,
    pub tx_enable: u32,
    pub rx_enable: u32,

    pub est_control: u32,
    pub est_status: u32,
    pub est_gcl_control: u32,
    pub est_data: u32,

    /// Maximum number of gate-control list entries.
    pub gcl_depth: u32,
    /// Maximum value of a single gate-control entry (gates + interval).
    pub gcl_width: u32,
    /// Mask selecting the time-interval bits of an entry.
    pub ti_mask: u32,
    /// Eight PTP clock cycles in nanoseconds; the minimum granularity the
    /// gate state machine can enforce.
    pub ptp_cycle_8: u32,

    pub ptp: Option<PtpRegs>,
}

/// Resolves the dispatch table for a variant.
pub(crate) const fn for_variant(variant: MacVariant) -> &'static VendorTable {
    match variant {
        MacVariant::Eqos => &EQOS_TABLE,
        MacVariant::Mgbe => &MGBE_TABLE,
    }
}

// Bits shared by both variants.

/// DMA mode: software reset, self-clearing.
pub(crate) const DMA_MODE_SWR: u32 = 1 << 0;

// EQOS MAC configuration register bits.
pub(crate) const EQOS_MCR_RE: u32 = 1 << 0;
pub(crate) const EQOS_MCR_TE: u32 = 1 << 1;
/// Disable receive-own while transmitting (half-duplex behavior).
pub(crate) const EQOS_MCR_DO: u32 = 1 << 10;
/// Duplex mode.
pub(crate) const EQOS_MCR_DM: u32 = 1 << 13;
/// Fast Ethernet speed select (10/100 split).
pub(crate) const EQOS_MCR_FES: u32 = 1 << 14;
/// Port select: MII (10/100) vs GMII (1000).
pub(crate) const EQOS_MCR_PS: u32 = 1 << 15;

// MGBE TX configuration register bits.
pub(crate) const MGBE_TMCR_TE: u32 = 1 << 0;
pub(crate) const MGBE_RMCR_RE: u32 = 1 << 0;
/// Speed-select field, bits 31:29. The all-clear encoding is 10G; the
/// lower rates are reached by setting bits into the field.
pub(crate) const MGBE_TMCR_SS_2_5G: u32 = 0x2 << 29;
pub(crate) const MGBE_TMCR_SS_5G: u32 = 0x3 << 29;
pub(crate) const MGBE_TMCR_SS_10G: u32 = 0x7 << 29;

// Timestamp control register bits common to both layouts. The filter bits
// live in `PtpFilter`; these are the self-clearing command bits.
pub(crate) const MAC_TCR_TSINIT: u32 = 1 << 2;
pub(crate) const MAC_TCR_TSUPDT: u32 = 1 << 3;
pub(crate) const MAC_TCR_TSADDREG: u32 = 1 << 5;

/// Sub-second increment value field position in SSIR.
pub(crate) const MAC_SSIR_SSINC_SHIFT: u32 = 16;

/// Sign bit of the nanoseconds update register: subtract instead of add.
pub(crate) const MAC_STNUR_ADDSUB: u32 = 1 << 31;

/// MAC core revision at or below which the sub-second increment is 16ns.
pub(crate) const EQOS_MAC_CORE_4_10: u32 = 0x41;

// EST GCL control register bits, common to both layouts.

/// Start read/write operation, self-clearing.
pub(crate) const EST_SRWO: u32 = 1 << 0;
/// Read (1) rather than write (0).
pub(crate) const EST_R1W0: u32 = 1 << 1;
/// Address the gate-control register space rather than GCL memory.
pub(crate) const EST_GCRR: u32 = 1 << 2;
/// Debug mode: software chooses the bunk explicitly.
pub(crate) const EST_DBGM: u32 = 1 << 4;
/// Bunk select while in debug mode.
pub(crate) const EST_DBGB: u32 = 1 << 5;
/// Error latched by the previous indirect operation.
pub(crate) const EST_ERR0: u32 = 1 << 20;

/// EST control: enable scheduled traffic.
pub(crate) const EST_CONTROL_EEST: u32 = 1 << 0;
/// EST status: which bunk software currently owns.
pub(crate) const EST_STATUS_SWOL: u32 = 1 << 7;

// Logical gate-control register addresses, pre-shifted into the address
// field (bits 8..19) of the GCL control word.
pub(crate) const EST_ADDR_BTR_LOW: u32 = 0x0 << 8;
pub(crate) const EST_ADDR_BTR_HIGH: u32 = 0x1 << 8;
pub(crate) const EST_ADDR_CTR_LOW: u32 = 0x2 << 8;
pub(crate) const EST_ADDR_CTR_HIGH: u32 = 0x3 << 8;

static EQOS_TABLE: VendorTable = VendorTable {
    dma_mode: 0x1000,
    tx_ctrl: 0x0000,
    rx_ctrl: 0x0000,
    tx_enable: EQOS_MCR_TE,
    rx_enable: EQOS_MCR_RE,
    est_control: 0x0c50,
    est_status: 0x0c58,
    est_gcl_control: 0x0c80,
    est_data: 0x0c84,
    gcl_depth: 512,
    gcl_width: 0x00ff_ffff,
    ti_mask: 0x000f_ffff,
    ptp_cycle_8: 40,
    ptp: Some(PtpRegs {
        tcr: 0x0b00,
        ssir: 0x0b04,
        stsur: 0x0b10,
        stnur: 0x0b14,
        tar: 0x0b18,
    }),
};

static MGBE_TABLE: VendorTable = VendorTable {
    dma_mode: 0x3000,
    tx_ctrl: 0x0000,
    rx_ctrl: 0x0004,
    tx_enable: MGBE_TMCR_TE,
    rx_enable: MGBE_RMCR_RE,
    est_control: 0x1050,
    est_status: 0x1058,
    est_gcl_control: 0x1080,
    est_data: 0x1084,
    gcl_depth: 1024,
    gcl_width: 0x0fff_ffff,
    ti_mask: 0x00ff_ffff,
    ptp_cycle_8: 26,
    ptp: Some(PtpRegs {
        tcr: 0x0d00,
        ssir: 0x0d04,
        stsur: 0x0d10,
        stnur: 0x0d14,
        tar: 0x0d18,
    }),
};
