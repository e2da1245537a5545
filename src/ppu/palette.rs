use super::PpuMask;

/// 2C02 master palette as RGB triples, indexed by the 6-bit colour number
/// stored in palette RAM.
pub const NES_PALETTE: [(u8, u8, u8); 64] = [
    (0x7C, 0x7C, 0x7C), (0x00, 0x00, 0xFC), (0x00, 0x00, 0xBC), (0x44, 0x28, 0xBC),
    (0x8F, 0x00, 0x77), (0xAB, 0x00, 0x13), (0xA7, 0x00, 0x00), (0x7F, 0x0B, 0x00),
    (0x43, 0x2F, 0x00), (0x00, 0x47, 0x00), (0x00, 0x51, 0x00), (0x00, 0x3F, 0x17),
    (0x1B, 0x3F, 0x5F), (0x00, 0x00, 0x00), (0x05, 0x05, 0x05), (0x05, 0x05, 0x05),

    (0xBC, 0xBC, 0xBC), (0x00, 0x73, 0xEF), (0x23, 0x3B, 0xEF), (0x83, 0x00, 0xF3),
    (0xBF, 0x00, 0xBF), (0xE7, 0x00, 0x5B), (0xDB, 0x2B, 0x00), (0xCB, 0x4F, 0x0F),
    (0x8B, 0x73, 0x00), (0x00, 0x97, 0x00), (0x00, 0xAB, 0x00), (0x00, 0x93, 0x3B),
    (0x00, 0x83, 0x8B), (0x11, 0x11, 0x11), (0x09, 0x09, 0x09), (0x09, 0x09, 0x09),

    (0xFF, 0xFF, 0xFF), (0x3F, 0xBF, 0xFF), (0x5F, 0x97, 0xFF), (0xA7, 0x8B, 0xFD),
    (0xF7, 0x7B, 0xFF), (0xFF, 0x77, 0xB7), (0xFF, 0x77, 0x63), (0xFF, 0x9B, 0x3B),
    (0xF3, 0xBF, 0x3F), (0x83, 0xD3, 0x13), (0x4F, 0xDF, 0x4B), (0x58, 0xF8, 0x98),
    (0x00, 0xEB, 0xDB), (0x66, 0x66, 0x66), (0x0D, 0x0D, 0x0D), (0x0D, 0x0D, 0x0D),

    (0xFF, 0xFF, 0xFF), (0xAB, 0xE7, 0xFF), (0xC7, 0xD7, 0xFF), (0xD7, 0xCB, 0xFF),
    (0xFF, 0xC7, 0xFF), (0xFF, 0xC7, 0xDB), (0xFF, 0xBF, 0xB3), (0xFF, 0xDB, 0xAB),
    (0xFF, 0xE7, 0xA3), (0xE3, 0xFF, 0xA3), (0xAB, 0xF3, 0xBF), (0xB3, 0xFF, 0xCF),
    (0x9F, 0xFF, 0xF3), (0xDD, 0xDD, 0xDD), (0x11, 0x11, 0x11), (0x11, 0x11, 0x11),
];

/// Converts a palette RAM entry to RGB under the given mask. Greyscale keeps
/// only the luma column; each emphasis bit dims the two other channels.
pub fn rgb(index: u8, mask: PpuMask) -> (u8, u8, u8) {
    let index = if mask.contains(PpuMask::GRAYSCALE) {
        index & 0x30
    } else {
        index & 0x3F
    };
    let (mut r, mut g, mut b) = NES_PALETTE[index as usize];

    let emphasis = mask & (PpuMask::EMPHASIZE_RED | PpuMask::EMPHASIZE_GREEN | PpuMask::EMPHASIZE_BLUE);
    if !emphasis.is_empty() {
        if !emphasis.contains(PpuMask::EMPHASIZE_RED) {
            r = dim(r);
        }
        if !emphasis.contains(PpuMask::EMPHASIZE_GREEN) {
            g = dim(g);
        }
        if !emphasis.contains(PpuMask::EMPHASIZE_BLUE) {
            b = dim(b);
        }
    }
    (r, g, b)
}

fn dim(channel: u8) -> u8 {
    (channel as u16 * 3 / 4) as u8
}
