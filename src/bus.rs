/// Interrupt lines the CPU services between instructions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interrupt {
    Nmi,
    Reset,
    Irq,
}

impl Interrupt {
    pub fn vector(self) -> u16 {
        match self {
            Interrupt::Nmi => 0xFFFA,
            Interrupt::Reset => 0xFFFC,
            Interrupt::Irq => 0xFFFE,
        }
    }

    fn priority(self) -> u8 {
        match self {
            Interrupt::Reset => 2,
            Interrupt::Nmi => 1,
            Interrupt::Irq => 0,
        }
    }

    /// Keeps whichever of the two requests the CPU would service first.
    pub fn merge(current: Option<Interrupt>, incoming: Interrupt) -> Interrupt {
        match current {
            Some(pending) if pending.priority() >= incoming.priority() => pending,
            _ => incoming,
        }
    }
}

/// CPU-side view of the system. The implementor decides which component owns
/// an address; the CPU only ever sees bytes.
pub trait Bus {
    fn read_byte(&mut self, address: u16) -> u8;
    fn write_byte(&mut self, address: u16, data: u8);

    /// Request an interrupt on the next CPU step.
    fn trigger_interrupt(&mut self, kind: Interrupt);

    /// Stall the CPU for `cycles` (OAM DMA).
    fn block(&mut self, cycles: u16);

    fn read_word(&mut self, address: u16) -> u16 {
        let lo = self.read_byte(address) as u16;
        let hi = self.read_byte(address.wrapping_add(1)) as u16;
        (hi << 8) | lo
    }

    fn write_word(&mut self, address: u16, data: u16) {
        self.write_byte(address, data as u8);
        self.write_byte(address.wrapping_add(1), (data >> 8) as u8);
    }

    /// Word read with the 6502 page-wrap defect: the high byte never carries
    /// into the next page, so $xxFF pairs with $xx00.
    fn read_word_glitched(&mut self, address: u16) -> u16 {
        let hi_address = if address & 0x00FF == 0x00FF {
            address & 0xFF00
        } else {
            address.wrapping_add(1)
        };
        let lo = self.read_byte(address) as u16;
        let hi = self.read_byte(hi_address) as u16;
        (hi << 8) | lo
    }
}

/// Side-channel requests raised while routing an access, drained by the
/// console into the CPU after each step.
#[derive(Debug, Default, Clone, Copy)]
pub struct Signals {
    pub interrupt: Option<Interrupt>,
    pub stall: u16,
}

impl Signals {
    pub fn raise(&mut self, kind: Interrupt) {
        self.interrupt = Some(Interrupt::merge(self.interrupt, kind));
    }

    pub fn block(&mut self, cycles: u16) {
        self.stall = self.stall.saturating_add(cycles);
    }

    pub fn take(&mut self) -> Signals {
        std::mem::take(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FlatBus {
        mem: Vec<u8>,
    }

    impl Bus for FlatBus {
        fn read_byte(&mut self, address: u16) -> u8 {
            self.mem[address as usize]
        }

        fn write_byte(&mut self, address: u16, data: u8) {
            self.mem[address as usize] = data;
        }

        fn trigger_interrupt(&mut self, _kind: Interrupt) {}

        fn block(&mut self, _cycles: u16) {}
    }

    fn flat() -> FlatBus {
        FlatBus { mem: vec![0; 0x10000] }
    }

    #[test]
    fn words_are_little_endian() {
        let mut bus = flat();
        bus.write_word(0x0200, 0xBEEF);
        assert_eq!(bus.read_byte(0x0200), 0xEF);
        assert_eq!(bus.read_byte(0x0201), 0xBE);
        assert_eq!(bus.read_word(0x0200), 0xBEEF);
    }

    #[test]
    fn glitched_read_wraps_within_page() {
        let mut bus = flat();
        bus.write_byte(0x02FF, 0x34);
        bus.write_byte(0x0300, 0x12);
        bus.write_byte(0x0200, 0x56);

        assert_eq!(bus.read_word(0x02FF), 0x1234);
        assert_eq!(bus.read_word_glitched(0x02FF), 0x5634);
    }

    #[test]
    fn glitched_read_matches_plain_read_off_the_boundary() {
        let mut bus = flat();
        bus.write_word(0x0410, 0xCAFE);
        assert_eq!(bus.read_word_glitched(0x0410), 0xCAFE);
    }

    #[test]
    fn signals_keep_highest_priority_interrupt() {
        let mut signals = Signals::default();
        signals.raise(Interrupt::Irq);
        signals.raise(Interrupt::Nmi);
        signals.raise(Interrupt::Irq);
        assert_eq!(signals.interrupt, Some(Interrupt::Nmi));

        signals.block(513);
        let taken = signals.take();
        assert_eq!(taken.stall, 513);
        assert_eq!(signals.interrupt, None);
        assert_eq!(signals.stall, 0);
    }
}
