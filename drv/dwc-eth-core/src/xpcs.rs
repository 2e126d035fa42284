// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Secondary physical-coding-sublayer (XPCS) bring-up for MGBE.
//!
//! The XPCS sits behind its own register window and uses paged access:
//! registers carry MDIO-style logical addresses, the upper bits of which
//! are latched into a page register before the low bits select an offset
//! within the window.
//!
//! Only the minimum needed by `set_speed` lives here: re-initialize the
//! lane and restart it, each bounded by a retry budget.

use crate::{poll_for_clear, EthError, LogTag, Platform, RegisterIo, Severity};

/// Page latch register, at a fixed offset within the window.
const XPCS_ADDRESS: u32 = 0x03fc;
/// Low bits of a logical address select the in-page offset.
const XPCS_OFFSET_MASK: u32 = 0x03ff;

pub(crate) const SR_XS_PCS_STS1: u32 = 0x3_0001;
pub(crate) const VR_XS_PCS_DIG_CTRL1: u32 = 0x3_8000;

/// Lane soft reset, self-clearing.
const DIG_CTRL1_VR_RST: u32 = 1 << 15;
/// USXGMII lane enable.
const DIG_CTRL1_USXG_EN: u32 = 1 << 9;
/// Receive link up.
const STS1_RLU: u32 = 1 << 2;

/// Retry budget for the link-settle wait.
const LANE_RETRY_COUNT: u32 = 1000;
const LANE_DELAY_US: u32 = 1000;

fn page(io: &impl RegisterIo, addr: u32) -> u32 {
    io.write_reg(XPCS_ADDRESS, addr >> 10);
    addr & XPCS_OFFSET_MASK
}

fn read(io: &impl RegisterIo, addr: u32) -> u32 {
    let offset = page(io, addr);
    io.read_reg(offset)
}

fn write(io: &impl RegisterIo, addr: u32, value: u32) {
    let offset = page(io, addr);
    io.write_reg(offset, value);
}

/// Re-initializes the lane: enable the USXGMII path, soft-reset the lane,
/// and wait for the reset to self-clear.
pub(crate) fn lane_init<R: RegisterIo, P: Platform>(io: &R, platform: &P) -> Result<(), EthError> {
    let ctrl = read(io, VR_XS_PCS_DIG_CTRL1);
    write(
        io,
        VR_XS_PCS_DIG_CTRL1,
        ctrl | DIG_CTRL1_USXG_EN | DIG_CTRL1_VR_RST,
    );

    let offset = page(io, VR_XS_PCS_DIG_CTRL1);
    poll_for_clear(io, platform, offset, DIG_CTRL1_VR_RST).map(|_| ())
}

/// Restarts the lane and waits for the receive link to come back up.
pub(crate) fn lane_start<R: RegisterIo, P: Platform>(io: &R, platform: &P) -> Result<(), EthError> {
    let mut retry = 0;
    loop {
        if read(io, SR_XS_PCS_STS1) & STS1_RLU != 0 {
            return Ok(());
        }
        if retry >= LANE_RETRY_COUNT {
            platform.report(
                Severity::Error,
                LogTag::HwFail,
                "xpcs: link did not settle",
                u64::from(SR_XS_PCS_STS1),
            );
            return Err(EthError::HwTimeout);
        }
        retry += 1;
        platform.delay_us(LANE_DELAY_US);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fake::{FakeIo, FakePlatform};

    #[test]
    fn lane_init_latches_page_and_resets() {
        let io = FakeIo::new();
        let plat = FakePlatform::new();
        io.clear_mask_after(VR_XS_PCS_DIG_CTRL1 & XPCS_OFFSET_MASK, DIG_CTRL1_VR_RST, 0);

        lane_init(&io, &plat).unwrap();

        // Page register saw the upper logical address bits.
        assert_eq!(io.get(XPCS_ADDRESS), VR_XS_PCS_DIG_CTRL1 >> 10);
        // Control write carried the enable and the (self-clearing) reset.
        let ctrl = io
            .writes
            .borrow()
            .iter()
            .find(|&&(o, _)| o == (VR_XS_PCS_DIG_CTRL1 & XPCS_OFFSET_MASK))
            .map(|&(_, v)| v)
            .unwrap();
        assert_eq!(ctrl & (DIG_CTRL1_USXG_EN | DIG_CTRL1_VR_RST), DIG_CTRL1_USXG_EN | DIG_CTRL1_VR_RST);
    }

    #[test]
    fn lane_start_waits_for_link() {
        let io = FakeIo::new();
        let plat = FakePlatform::new();
        let sts = SR_XS_PCS_STS1 & XPCS_OFFSET_MASK;
        io.queue_reads(sts, &[0, 0, STS1_RLU]);

        lane_start(&io, &plat).unwrap();
        assert_eq!(plat.delays.borrow().len(), 2);
    }

    #[test]
    fn lane_start_times_out_when_link_stays_down() {
        let io = FakeIo::new();
        let plat = FakePlatform::new();

        assert_eq!(lane_start(&io, &plat), Err(EthError::HwTimeout));
    }
}
