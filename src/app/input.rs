//! Input events from pads and the key

/// A touch pad or key event. The index is the pad number (always 0 for the
/// single key); `Held` carries the raw pressure reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputEvent {
    Pressed(usize),
    Released(usize),
    Held(usize, u16),
}

impl InputEvent {
    pub fn index(&self) -> usize {
        match *self {
            InputEvent::Pressed(i) | InputEvent::Released(i) | InputEvent::Held(i, _) => i,
        }
    }
}

/// Pressure reading as a 0.0-1.0 level
pub fn pressure_level(raw: u16, max: u16) -> f64 {
    if max == 0 {
        return 1.0;
    }
    (f64::from(raw) / f64::from(max)).min(1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_index() {
        assert_eq!(InputEvent::Pressed(2).index(), 2);
        assert_eq!(InputEvent::Released(0).index(), 0);
        assert_eq!(InputEvent::Held(3, 900).index(), 3);
    }

    #[test]
    fn test_pressure_level() {
        assert_eq!(pressure_level(500, 1000), 0.5);
        assert_eq!(pressure_level(4000, 1000), 1.0);
        assert_eq!(pressure_level(10, 0), 1.0);
    }
}
