// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! MAC line control: start/stop, duplex, and link speed.

use crate::regs::{
    EQOS_MCR_DM, EQOS_MCR_DO, EQOS_MCR_FES, EQOS_MCR_PS, MGBE_TMCR_SS_10G, MGBE_TMCR_SS_2_5G,
    MGBE_TMCR_SS_5G,
};
use crate::{
    xpcs, Controller, Duplex, EthError, LogTag, MacVariant, Platform, RegisterIo, Severity, Speed,
};

impl<R: RegisterIo, P: Platform> Controller<R, P> {
    /// Enables the transmit and receive paths. A pure read-modify-write
    /// pair; the link itself is brought up separately via `set_speed`.
    pub fn start_mac(&self) {
        let t = self.table;

        let value = self.io.read_reg(t.tx_ctrl);
        self.io.write_reg(t.tx_ctrl, value | t.tx_enable);

        let value = self.io.read_reg(t.rx_ctrl);
        self.io.write_reg(t.rx_ctrl, value | t.rx_enable);
    }

    /// Disables the transmit and receive paths. Frames already handed to
    /// the hardware may still drain.
    pub fn stop_mac(&self) {
        let t = self.table;

        let value = self.io.read_reg(t.tx_ctrl);
        self.io.write_reg(t.tx_ctrl, value & !t.tx_enable);

        let value = self.io.read_reg(t.rx_ctrl);
        self.io.write_reg(t.rx_ctrl, value & !t.rx_enable);
    }

    /// Sets the duplex mode. Only EQOS has configurable duplex; on MGBE
    /// this reports success without touching hardware.
    pub fn set_mode(&self, mode: Duplex) -> Result<(), EthError> {
        if self.variant == MacVariant::Eqos {
            let mut mcr = self.io.read_reg(self.table.tx_ctrl);
            match mode {
                Duplex::Full => {
                    mcr |= EQOS_MCR_DM;
                    mcr &= !EQOS_MCR_DO;
                }
                Duplex::Half => {
                    mcr |= EQOS_MCR_DO;
                    mcr &= !EQOS_MCR_DM;
                }
            }
            self.io.write_reg(self.table.tx_ctrl, mcr);
        }
        Ok(())
    }

    /// Programs the link speed, validating it against the variant first:
    /// EQOS takes 10/100/1000, MGBE takes 2500/5000/10000. On MGBE the
    /// XPCS lane is re-initialized and restarted afterwards, and its
    /// failure fails the whole call.
    pub fn set_speed(&self, speed: Speed) -> Result<(), EthError> {
        let supported = match self.variant {
            MacVariant::Eqos => {
                matches!(speed, Speed::Mbps10 | Speed::Mbps100 | Speed::Mbps1000)
            }
            MacVariant::Mgbe => {
                matches!(speed, Speed::Mbps2500 | Speed::Mbps5000 | Speed::Mbps10000)
            }
        };
        if !supported {
            self.platform.report(
                Severity::Error,
                LogTag::Invalid,
                "set_speed: unsupported speed",
                u64::from(speed.mbps()),
            );
            return Err(EthError::UnsupportedSpeed);
        }

        let mut value = self.io.read_reg(self.table.tx_ctrl);
        match speed {
            Speed::Mbps10 => {
                value |= EQOS_MCR_PS;
                value &= !EQOS_MCR_FES;
            }
            Speed::Mbps100 => {
                value |= EQOS_MCR_PS;
                value |= EQOS_MCR_FES;
            }
            Speed::Mbps1000 => {
                value &= !EQOS_MCR_PS;
                value &= !EQOS_MCR_FES;
            }
            Speed::Mbps2500 => value |= MGBE_TMCR_SS_2_5G,
            Speed::Mbps5000 => value |= MGBE_TMCR_SS_5G,
            Speed::Mbps10000 => value &= !MGBE_TMCR_SS_10G,
        }
        self.io.write_reg(self.table.tx_ctrl, value);

        if self.variant == MacVariant::Mgbe {
            let Some(pcs) = &self.xpcs else {
                self.platform.report(
                    Severity::Error,
                    LogTag::OpInvalid,
                    "set_speed: no XPCS window",
                    0,
                );
                return Err(EthError::NotSupported);
            };
            xpcs::lane_init(pcs, &self.platform)?;
            xpcs::lane_start(pcs, &self.platform)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fake::{FakeIo, FakePlatform};
    use crate::PtpConfig;

    fn eqos() -> Controller<FakeIo, FakePlatform> {
        Controller::new(
            MacVariant::Eqos,
            FakeIo::new(),
            None,
            FakePlatform::new(),
            0x51,
            PtpConfig::default(),
        )
    }

    fn mgbe(xpcs: Option<FakeIo>) -> Controller<FakeIo, FakePlatform> {
        Controller::new(
            MacVariant::Mgbe,
            FakeIo::new(),
            xpcs,
            FakePlatform::new(),
            0x10,
            PtpConfig::default(),
        )
    }

    #[test]
    fn start_sets_te_then_re() {
        let c = eqos();
        c.start_mac();
        // EQOS keeps both bits in MCR at offset 0; two RMW writes land
        // there, the second carrying both enables.
        let writes = c.io.writes.borrow().clone();
        assert_eq!(writes, vec![(0, 1 << 1), (0, (1 << 1) | (1 << 0))]);
    }

    #[test]
    fn stop_clears_enables() {
        let c = eqos();
        c.io.set(0, (1 << 1) | (1 << 0) | EQOS_MCR_DM);
        c.stop_mac();
        assert_eq!(c.io.get(0), EQOS_MCR_DM);
    }

    #[test]
    fn mgbe_start_touches_both_control_registers() {
        let c = mgbe(None);
        c.start_mac();
        let writes = c.io.writes.borrow().clone();
        assert_eq!(writes, vec![(0x0, 1 << 0), (0x4, 1 << 0)]);
    }

    #[test]
    fn full_duplex_sets_dm_clears_do() {
        let c = eqos();
        c.io.set(0, EQOS_MCR_DO);
        c.set_mode(Duplex::Full).unwrap();
        assert_eq!(c.io.get(0), EQOS_MCR_DM);
    }

    #[test]
    fn half_duplex_sets_do_clears_dm() {
        let c = eqos();
        c.io.set(0, EQOS_MCR_DM);
        c.set_mode(Duplex::Half).unwrap();
        assert_eq!(c.io.get(0), EQOS_MCR_DO);
    }

    #[test]
    fn duplex_is_a_noop_on_mgbe_but_succeeds() {
        let c = mgbe(None);
        c.set_mode(Duplex::Half).unwrap();
        assert_eq!(c.io.total_writes(), 0);
    }

    #[test]
    fn eqos_rejects_multi_gig_speeds_without_touching_hw() {
        let c = eqos();
        for mbps in [2500, 5000, 10000] {
            let speed = Speed::from_mbps(mbps).unwrap();
            assert_eq!(c.set_speed(speed), Err(EthError::UnsupportedSpeed));
        }
        assert_eq!(c.io.total_writes(), 0);
        assert_eq!(c.io.reads_of(0), 0);
    }

    #[test]
    fn mgbe_rejects_single_gig_speeds_without_touching_hw() {
        let c = mgbe(None);
        for mbps in [10, 100, 1000] {
            let speed = Speed::from_mbps(mbps).unwrap();
            assert_eq!(c.set_speed(speed), Err(EthError::UnsupportedSpeed));
        }
        assert_eq!(c.io.total_writes(), 0);
    }

    #[test]
    fn eqos_speed_bits() {
        let c = eqos();
        c.set_speed(Speed::Mbps100).unwrap();
        assert_eq!(c.io.get(0), EQOS_MCR_PS | EQOS_MCR_FES);
        c.set_speed(Speed::Mbps1000).unwrap();
        assert_eq!(c.io.get(0), 0);
        c.set_speed(Speed::Mbps10).unwrap();
        assert_eq!(c.io.get(0), EQOS_MCR_PS);
    }

    #[test]
    fn mgbe_speed_restarts_xpcs_lane() {
        let pcs = FakeIo::new();
        // Lane reset self-clears immediately; link comes up on first poll.
        pcs.clear_mask_after(xpcs::VR_XS_PCS_DIG_CTRL1 & 0x3ff, 1 << 15, 0);
        pcs.set(xpcs::SR_XS_PCS_STS1 & 0x3ff, 1 << 2);
        let c = mgbe(Some(pcs));

        c.set_speed(Speed::Mbps10000).unwrap();
        assert!(c.xpcs.as_ref().unwrap().total_writes() > 0);
    }

    #[test]
    fn mgbe_speed_propagates_xpcs_timeout() {
        let pcs = FakeIo::new();
        // Lane reset bit never clears.
        pcs.set(xpcs::VR_XS_PCS_DIG_CTRL1 & 0x3ff, 1 << 15);
        let c = mgbe(Some(pcs));

        assert_eq!(c.set_speed(Speed::Mbps5000), Err(EthError::HwTimeout));
    }

    #[test]
    fn mgbe_speed_without_xpcs_window_fails() {
        let c = mgbe(None);
        assert_eq!(c.set_speed(Speed::Mbps10000), Err(EthError::NotSupported));
    }
}
