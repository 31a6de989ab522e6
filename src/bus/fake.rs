use crate::{
    bus::{DisplayBus, FrameKind, TouchBus, DEFAULT_MAX_TRANSFER},
    Error, Result,
};
use std::collections::VecDeque;

/// One observable action on the fake display bus.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BusOp {
    Select,
    Deselect,
    Command(u8),
    Data(Vec<u8>),
    Reset(bool),
    Backlight(bool),
}

/// Display bus that records every transaction instead of touching hardware.
#[derive(Debug)]
pub struct FakeDisplayBus {
    ops: Vec<BusOp>,
    kind: FrameKind,
    selected: bool,
    max_transfer: usize,
    fail_writes: usize,
}

impl Default for FakeDisplayBus {
    fn default() -> Self {
        Self::with_max_transfer(DEFAULT_MAX_TRANSFER)
    }
}

impl FakeDisplayBus {
    pub fn with_max_transfer(max_transfer: usize) -> Self {
        Self {
            ops: Vec::new(),
            kind: FrameKind::Data,
            selected: false,
            max_transfer,
            fail_writes: 0,
        }
    }

    pub fn ops(&self) -> &[BusOp] {
        &self.ops
    }

    pub fn clear_ops(&mut self) {
        self.ops.clear();
    }

    /// Every command opcode written so far, in order.
    pub fn commands(&self) -> Vec<u8> {
        self.ops
            .iter()
            .filter_map(|op| match op {
                BusOp::Command(cmd) => Some(*cmd),
                _ => None,
            })
            .collect()
    }

    pub fn count_command(&self, opcode: u8) -> usize {
        self.commands().iter().filter(|&&c| c == opcode).count()
    }

    /// Total payload bytes written in data mode.
    pub fn data_len(&self) -> usize {
        self.ops
            .iter()
            .map(|op| match op {
                BusOp::Data(bytes) => bytes.len(),
                _ => 0,
            })
            .sum()
    }

    pub fn is_selected(&self) -> bool {
        self.selected
    }

    /// Make the next `count` writes fail with a transient bus error.
    pub fn fail_next_writes(&mut self, count: usize) {
        self.fail_writes = count;
    }
}

impl DisplayBus for FakeDisplayBus {
    fn select(&mut self) -> Result<()> {
        self.selected = true;
        self.ops.push(BusOp::Select);
        Ok(())
    }

    fn deselect(&mut self) -> Result<()> {
        self.selected = false;
        self.ops.push(BusOp::Deselect);
        Ok(())
    }

    fn set_frame_kind(&mut self, kind: FrameKind) -> Result<()> {
        self.kind = kind;
        Ok(())
    }

    fn write(&mut self, bytes: &[u8]) -> Result<()> {
        if self.fail_writes > 0 {
            self.fail_writes -= 1;
            return Err(Error::TransientBus("fake spi write failed".into()));
        }
        match self.kind {
            FrameKind::Command => self.ops.extend(bytes.iter().map(|&b| BusOp::Command(b))),
            FrameKind::Data => self.ops.push(BusOp::Data(bytes.to_vec())),
        }
        Ok(())
    }

    fn set_reset(&mut self, high: bool) -> Result<()> {
        self.ops.push(BusOp::Reset(high));
        Ok(())
    }

    fn set_backlight(&mut self, on: bool) -> Result<()> {
        self.ops.push(BusOp::Backlight(on));
        Ok(())
    }

    fn max_transfer(&self) -> usize {
        self.max_transfer
    }
}

/// Bytes returned for one burst read from TD_STATUS (0x02) through P1_MISC.
pub type TouchRegisters = [u8; 7];

/// Encode a single-point report the way the FT6336U lays out its registers.
pub fn touch_report(raw_x: u16, raw_y: u16, event: u8) -> TouchRegisters {
    [
        1,
        ((event & 0x03) << 6) | ((raw_x >> 8) as u8 & 0x0f),
        (raw_x & 0xff) as u8,
        (raw_y >> 8) as u8 & 0x0f,
        (raw_y & 0xff) as u8,
        0x10,
        0x00,
    ]
}

/// Touch bus that replays scripted register reads; an empty script reads as "no touch".
#[derive(Debug, Default)]
pub struct FakeTouchBus {
    script: VecDeque<Result<TouchRegisters>>,
    reads: Vec<(u8, u8, usize)>,
    reset_levels: Vec<bool>,
}

impl FakeTouchBus {
    pub fn new(script: Vec<Result<TouchRegisters>>) -> Self {
        Self {
            script: script.into(),
            ..Self::default()
        }
    }

    pub fn push(&mut self, report: Result<TouchRegisters>) {
        self.script.push_back(report);
    }

    /// Queue the same pressed report for `polls` consecutive reads.
    pub fn hold(&mut self, raw_x: u16, raw_y: u16, polls: usize) {
        for _ in 0..polls {
            self.script.push_back(Ok(touch_report(raw_x, raw_y, 2)));
        }
    }

    /// `(addr, reg, len)` of every read issued.
    pub fn reads(&self) -> &[(u8, u8, usize)] {
        &self.reads
    }

    pub fn reset_levels(&self) -> &[bool] {
        &self.reset_levels
    }
}

impl TouchBus for FakeTouchBus {
    fn write_read(&mut self, addr: u8, reg: u8, buf: &mut [u8]) -> Result<()> {
        self.reads.push((addr, reg, buf.len()));
        let regs = match self.script.pop_front() {
            Some(Ok(regs)) => regs,
            Some(Err(err)) => return Err(err),
            None => [0; 7],
        };
        let len = buf.len().min(regs.len());
        buf[..len].copy_from_slice(&regs[..len]);
        Ok(())
    }

    fn set_reset(&mut self, high: bool) -> Result<()> {
        self.reset_levels.push(high);
        Ok(())
    }

    fn has_reset(&self) -> bool {
        true
    }
}

/// Delay that returns immediately so driver timing does not slow tests.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopDelay;

impl embedded_hal::delay::DelayNs for NoopDelay {
    fn delay_ns(&mut self, _ns: u32) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fake_display_records_commands_and_data() {
        let mut bus = FakeDisplayBus::default();
        bus.select().unwrap();
        bus.set_frame_kind(FrameKind::Command).unwrap();
        bus.write(&[0x2c]).unwrap();
        bus.set_frame_kind(FrameKind::Data).unwrap();
        bus.write(&[0xaa, 0xbb]).unwrap();
        bus.deselect().unwrap();
        assert_eq!(bus.commands(), vec![0x2c]);
        assert_eq!(bus.data_len(), 2);
        assert!(!bus.is_selected());
    }

    #[test]
    fn fake_display_fails_scripted_writes() {
        let mut bus = FakeDisplayBus::default();
        bus.fail_next_writes(1);
        assert!(bus.write(&[1]).is_err());
        assert!(bus.write(&[1]).is_ok());
    }

    #[test]
    fn fake_touch_reads_idle_when_script_empty() {
        let mut bus = FakeTouchBus::default();
        let mut buf = [0xffu8; 7];
        bus.write_read(0x38, 0x02, &mut buf).unwrap();
        assert_eq!(buf, [0; 7]);
        assert_eq!(bus.reads(), &[(0x38, 0x02, 7)]);
    }
}
