pub const RAM_SIZE: usize = 0x0800;

/// Console work RAM. Only 2 KB exist; the CPU sees them four times over
/// $0000-$1FFF.
pub struct Ram {
    data: [u8; RAM_SIZE],
}

impl Ram {
    pub fn new() -> Self {
        Ram { data: [0; RAM_SIZE] }
    }

    pub fn read(&self, address: u16) -> u8 {
        self.data[Self::mirror(address)]
    }

    pub fn write(&mut self, address: u16, value: u8) {
        self.data[Self::mirror(address)] = value;
    }

    fn mirror(address: u16) -> usize {
        (address as usize) & (RAM_SIZE - 1)
    }
}

impl Default for Ram {
    fn default() -> Self {
        Self::new()
    }
}
