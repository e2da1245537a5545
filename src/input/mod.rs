use bitflags::bitflags;

bitflags! {
    /// Button bits in the order the shift register reports them.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct ControllerButton: u8 {
        const A = 0x01;
        const B = 0x02;
        const SELECT = 0x04;
        const START = 0x08;
        const UP = 0x10;
        const DOWN = 0x20;
        const LEFT = 0x40;
        const RIGHT = 0x80;
    }
}

pub struct Controller {
    buttons: ControllerButton,
    index: u8,
}

impl Controller {
    pub fn new() -> Self {
        Controller {
            buttons: ControllerButton::empty(),
            index: 0,
        }
    }

    pub fn reset(&mut self) {
        self.buttons = ControllerButton::empty();
        self.index = 0;
    }

    pub fn set_buttons(&mut self, value: u8) {
        self.buttons = ControllerButton::from_bits_retain(value);
    }

    pub fn buttons(&self) -> ControllerButton {
        self.buttons
    }

    pub fn write(&mut self, value: u8) {
        if value & 0x01 != 0 {
            self.index = 0;
            log::trace!("Controller strobe, buttons={:08b}", self.buttons.bits());
        }
    }

    pub fn read(&mut self) -> u8 {
        let result = (self.buttons.bits() >> self.index) & 0x01;
        self.index = (self.index + 1) % 8;
        result
    }

    pub fn press(&mut self, button: ControllerButton) {
        self.buttons.insert(button);
        log::debug!("Button pressed: {:?}, state: {:08b}", button, self.buttons.bits());
    }

    pub fn release(&mut self, button: ControllerButton) {
        self.buttons.remove(button);
        log::debug!("Button released: {:?}, state: {:08b}", button, self.buttons.bits());
    }

    pub fn is_pressed(&self, button: ControllerButton) -> bool {
        self.buttons.contains(button)
    }
}

impl Default for Controller {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn read_all(controller: &mut Controller) -> Vec<u8> {
        (0..8).map(|_| controller.read()).collect()
    }

    #[test]
    fn reports_buttons_in_hardware_order() {
        let mut controller = Controller::new();
        controller.press(ControllerButton::A);
        controller.press(ControllerButton::START);
        controller.press(ControllerButton::RIGHT);
        controller.write(1);
        controller.write(0);

        assert_eq!(read_all(&mut controller), vec![1, 0, 0, 1, 0, 0, 0, 1]);
    }

    #[test]
    fn index_wraps_after_eight_reads() {
        let mut controller = Controller::new();
        controller.set_buttons(0b0000_0010);
        controller.write(1);

        assert_eq!(read_all(&mut controller), vec![0, 1, 0, 0, 0, 0, 0, 0]);
        assert_eq!(controller.read(), 0);
        assert_eq!(controller.read(), 1);
    }

    #[test]
    fn strobe_restarts_sequence() {
        let mut controller = Controller::new();
        controller.set_buttons(0b0000_0001);
        controller.write(1);
        assert_eq!(controller.read(), 1);
        assert_eq!(controller.read(), 0);

        controller.write(1);
        assert_eq!(controller.read(), 1);
    }

    #[test]
    fn write_without_bit0_keeps_position() {
        let mut controller = Controller::new();
        controller.set_buttons(0b0000_0101);
        controller.write(1);
        assert_eq!(controller.read(), 1);
        controller.write(0);
        assert_eq!(controller.read(), 0);
        assert_eq!(controller.read(), 1);
    }

    #[test]
    fn release_clears_button() {
        let mut controller = Controller::new();
        controller.press(ControllerButton::B);
        assert!(controller.is_pressed(ControllerButton::B));
        controller.release(ControllerButton::B);
        assert!(!controller.is_pressed(ControllerButton::B));
        assert_eq!(controller.buttons(), ControllerButton::empty());
    }
}
