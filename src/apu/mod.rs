//! Register-level APU. Channel registers are latched and the enable bits are
//! tracked so that software polling 0x4015 behaves; no audio is synthesised.

use bitflags::bitflags;

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct ApuStatus: u8 {
        const PULSE1 = 0x01;
        const PULSE2 = 0x02;
        const TRIANGLE = 0x04;
        const NOISE = 0x08;
        const DMC = 0x10;
        const FRAME_INTERRUPT = 0x40;
        const DMC_INTERRUPT = 0x80;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelKind {
    Pulse1,
    Pulse2,
    Triangle,
    Noise,
    Dmc,
}

impl ChannelKind {
    pub const ALL: [ChannelKind; 5] = [
        ChannelKind::Pulse1,
        ChannelKind::Pulse2,
        ChannelKind::Triangle,
        ChannelKind::Noise,
        ChannelKind::Dmc,
    ];

    /// Channel owning a register in 0x4000..=0x4013.
    pub fn for_register(address: u16) -> Option<ChannelKind> {
        match address {
            0x4000..=0x4003 => Some(ChannelKind::Pulse1),
            0x4004..=0x4007 => Some(ChannelKind::Pulse2),
            0x4008..=0x400B => Some(ChannelKind::Triangle),
            0x400C..=0x400F => Some(ChannelKind::Noise),
            0x4010..=0x4013 => Some(ChannelKind::Dmc),
            _ => None,
        }
    }

    pub fn status_bit(self) -> ApuStatus {
        match self {
            ChannelKind::Pulse1 => ApuStatus::PULSE1,
            ChannelKind::Pulse2 => ApuStatus::PULSE2,
            ChannelKind::Triangle => ApuStatus::TRIANGLE,
            ChannelKind::Noise => ApuStatus::NOISE,
            ChannelKind::Dmc => ApuStatus::DMC,
        }
    }

    fn index(self) -> usize {
        self as usize
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Channel {
    pub registers: [u8; 4],
    pub enabled: bool,
}

pub struct Apu {
    channels: [Channel; 5],
    frame_counter: u8,
    cycles: u64,
}

impl Apu {
    pub fn new() -> Self {
        Apu {
            channels: [Channel::default(); 5],
            frame_counter: 0,
            cycles: 0,
        }
    }

    pub fn reset(&mut self) {
        for channel in &mut self.channels {
            channel.enabled = false;
        }
        self.frame_counter = 0;
        self.cycles = 0;
    }

    pub fn channel(&self, kind: ChannelKind) -> &Channel {
        &self.channels[kind.index()]
    }

    pub fn frame_counter(&self) -> u8 {
        self.frame_counter
    }

    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    /// Only 0x4015 is readable.
    pub fn read_register(&mut self, address: u16) -> u8 {
        if address != 0x4015 {
            return 0;
        }
        ChannelKind::ALL
            .iter()
            .filter(|kind| self.channels[kind.index()].enabled)
            .fold(ApuStatus::empty(), |status, kind| status | kind.status_bit())
            .bits()
    }

    pub fn write_register(&mut self, address: u16, value: u8) {
        match address {
            0x4015 => {
                let status = ApuStatus::from_bits_truncate(value);
                for kind in ChannelKind::ALL {
                    self.channels[kind.index()].enabled = status.contains(kind.status_bit());
                }
            }
            0x4017 => self.frame_counter = value,
            _ => match ChannelKind::for_register(address) {
                Some(kind) => {
                    self.channels[kind.index()].registers[(address & 3) as usize] = value;
                }
                None => log::trace!("ignored APU write {:04X} = {:02X}", address, value),
            },
        }
    }

    pub fn step(&mut self, cycles: u8) {
        self.cycles += cycles as u64;
    }
}

impl Default for Apu {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_reflects_enable_writes() {
        let mut apu = Apu::new();
        apu.write_register(0x4015, 0x15);
        assert_eq!(apu.read_register(0x4015), 0x15);
        assert!(apu.channel(ChannelKind::Pulse1).enabled);
        assert!(!apu.channel(ChannelKind::Pulse2).enabled);
        assert!(apu.channel(ChannelKind::Dmc).enabled);

        apu.write_register(0x4015, 0x00);
        assert_eq!(apu.read_register(0x4015), 0x00);
    }

    #[test]
    fn channel_registers_are_latched() {
        let mut apu = Apu::new();
        apu.write_register(0x4006, 0xAB);
        apu.write_register(0x400B, 0xCD);
        apu.write_register(0x4017, 0x40);
        assert_eq!(apu.channel(ChannelKind::Pulse2).registers[2], 0xAB);
        assert_eq!(apu.channel(ChannelKind::Triangle).registers[3], 0xCD);
        assert_eq!(apu.frame_counter(), 0x40);
    }

    #[test]
    fn write_only_registers_read_zero() {
        let mut apu = Apu::new();
        apu.write_register(0x4000, 0xFF);
        assert_eq!(apu.read_register(0x4000), 0);
    }

    #[test]
    fn step_counts_cycles_and_reset_clears() {
        let mut apu = Apu::new();
        apu.write_register(0x4015, 0x1F);
        apu.step(7);
        apu.step(2);
        assert_eq!(apu.cycles(), 9);

        apu.reset();
        assert_eq!(apu.cycles(), 0);
        assert_eq!(apu.read_register(0x4015), 0);
    }
}
