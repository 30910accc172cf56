//! Address counter arithmetic.
//!
//! Everything here is pure: the controller calls these after every load,
//! increment or decrement so the stored counter always names a valid slot.

use serde::{Deserialize, Serialize};

use crate::instruction::DisplayFunction;
use crate::{LINE_LENGTH, SECOND_LINE_START};

/// Width of the address counter
pub const ADDRESS_MASK: u8 = 0x7F;
/// Width of a CGRAM address
pub const CGRAM_ADDRESS_MASK: u8 = 0x3F;

/// Direction the counter moves after a data access, or the direction of a
/// pending adjustment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    Increment,
    Decrement,
}

impl Direction {
    pub fn from_increment(increment: bool) -> Self {
        if increment { Direction::Increment } else { Direction::Decrement }
    }
}

/// Move a raw counter one step. The result still needs normalizing.
pub fn step(address: u8, direction: Direction) -> u8 {
    match direction {
        Direction::Increment => address.wrapping_add(1),
        Direction::Decrement => address.wrapping_sub(1),
    }
}

/// Bring a raw DDRAM counter value back into the valid range.
///
/// - `0x7F` (a decrement past zero) wraps to the highest valid address.
/// - Anything above the highest valid address wraps to 0.
/// - In 2-line mode, values in the gap `40..64` move to 64 when travelling
///   upward and 39 when travelling downward.
pub fn normalize_ddram(value: u8, function: DisplayFunction, direction: Direction) -> u8 {
    let value = value & ADDRESS_MASK;
    let top = function.max_address();
    if value == ADDRESS_MASK {
        return top;
    }
    if value > top {
        return 0;
    }
    if function.is_two_line() && (LINE_LENGTH..SECOND_LINE_START).contains(&value) {
        return match direction {
            Direction::Increment => SECOND_LINE_START,
            Direction::Decrement => LINE_LENGTH - 1,
        };
    }
    value
}

pub fn normalize_cgram(value: u8) -> u8 {
    value & CGRAM_ADDRESS_MASK
}

/// Apply a display shift adjustment. A shift whose magnitude reaches the
/// line width is equivalent to no shift and resets to 0.
pub fn wrap_shift(shift: i8, function: DisplayFunction) -> i8 {
    let width = function.line_width() as i16;
    if (shift as i16).abs() >= width { 0 } else { shift }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const TWO: DisplayFunction = DisplayFunction::TwoLine5x8;
    const ONE: DisplayFunction = DisplayFunction::OneLine5x8;

    #[test]
    fn test_wrap_around_two_line() {
        assert_eq!(normalize_ddram(step(103, Direction::Increment), TWO, Direction::Increment), 0);
        assert_eq!(normalize_ddram(step(0, Direction::Decrement), TWO, Direction::Decrement), 103);
    }

    #[test]
    fn test_wrap_around_one_line() {
        assert_eq!(normalize_ddram(step(79, Direction::Increment), ONE, Direction::Increment), 0);
        assert_eq!(normalize_ddram(step(0, Direction::Decrement), ONE, Direction::Decrement), 79);
        // past the 1-line top address
        assert_eq!(normalize_ddram(0x50, ONE, Direction::Increment), 0);
        // no gap in 1-line mode
        assert_eq!(normalize_ddram(0x45, ONE, Direction::Increment), 0x45);
    }

    #[test]
    fn test_gap_deflection() {
        assert_eq!(normalize_ddram(50, TWO, Direction::Increment), 64);
        assert_eq!(normalize_ddram(50, TWO, Direction::Decrement), 39);
        assert_eq!(normalize_ddram(step(39, Direction::Increment), TWO, Direction::Increment), 64);
        assert_eq!(normalize_ddram(step(64, Direction::Decrement), TWO, Direction::Decrement), 39);
        // the gap is ordinary memory in 1-line mode
        assert_eq!(normalize_ddram(50, ONE, Direction::Increment), 50);
    }

    #[test]
    fn test_cgram_mask() {
        assert_eq!(normalize_cgram(0x40), 0);
        assert_eq!(normalize_cgram(0x3F), 0x3F);
        assert_eq!(normalize_cgram(step(0, Direction::Decrement)), 0x3F);
    }

    #[test]
    fn test_shift_wrap() {
        assert_eq!(wrap_shift(39, TWO), 39);
        assert_eq!(wrap_shift(40, TWO), 0);
        assert_eq!(wrap_shift(-40, TWO), 0);
        assert_eq!(wrap_shift(-79, ONE), -79);
        assert_eq!(wrap_shift(-80, ONE), 0);
    }

    fn function_strategy() -> impl Strategy<Value = DisplayFunction> {
        prop_oneof![
            Just(DisplayFunction::OneLine5x8),
            Just(DisplayFunction::OneLine5x11),
            Just(DisplayFunction::TwoLine5x8),
        ]
    }

    fn is_valid(address: u8, function: DisplayFunction) -> bool {
        if function.is_two_line() {
            address < LINE_LENGTH || (SECOND_LINE_START..=function.max_address()).contains(&address)
        } else {
            address <= function.max_address()
        }
    }

    proptest! {
        #[test]
        fn prop_normalized_address_is_valid(value in any::<u8>(), function in function_strategy(), inc in any::<bool>()) {
            let out = normalize_ddram(value, function, Direction::from_increment(inc));
            prop_assert!(is_valid(out, function), "{} -> {}", value, out);
        }

        #[test]
        fn prop_valid_address_is_fixed_point(value in 0u8..0x7F, function in function_strategy(), inc in any::<bool>()) {
            prop_assume!(is_valid(value, function));
            prop_assert_eq!(normalize_ddram(value, function, Direction::from_increment(inc)), value);
        }

        #[test]
        fn prop_stepping_visits_every_slot(function in function_strategy(), inc in any::<bool>()) {
            let dir = Direction::from_increment(inc);
            let mut seen = std::collections::HashSet::new();
            let mut address = 0u8;
            for _ in 0..crate::DDRAM_SIZE {
                seen.insert(address);
                address = normalize_ddram(step(address, dir), function, dir);
            }
            prop_assert_eq!(seen.len(), crate::DDRAM_SIZE);
            prop_assert_eq!(address, 0);
        }
    }
}
