//! Stable colours for lesson subjects and facilities.

use std::{collections::HashMap, fmt};

const SEQUENCE_1: [u32; 5] = [0x8AE234, 0xFCE94F, 0x729FCF, 0xE9B96E, 0xAD7FA8];
const SEQUENCE_2: [u32; 5] = [0x73D216, 0xEDD400, 0x3465A4, 0xC17D11, 0x75507B];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const fn from_u32(value: u32) -> Self {
        Self {
            r: ((value >> 16) & 0xFF) as u8,
            g: ((value >> 8) & 0xFF) as u8,
            b: (value & 0xFF) as u8,
        }
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

/// The first five colours come from the light sequence, the next five from
/// the dark one, and every later round blends the two at a bisected shade
/// (1/2, 1/4, 3/4, 1/8, 3/8, ...).
pub fn color_for_index(index: usize) -> Rgb {
    let column = index % SEQUENCE_1.len();
    match index / SEQUENCE_1.len() {
        0 => Rgb::from_u32(SEQUENCE_1[column]),
        1 => Rgb::from_u32(SEQUENCE_2[column]),
        shade => blend(
            Rgb::from_u32(SEQUENCE_2[column]),
            Rgb::from_u32(SEQUENCE_1[column]),
            shade_fraction(shade - 2),
        ),
    }
}

fn shade_fraction(step: usize) -> f64 {
    let base = step + 1;
    let mut divisor = 2;
    while base >= divisor {
        divisor *= 2;
    }
    (base * 2 - divisor + 1) as f64 / divisor as f64
}

fn blend(floor: Rgb, ceil: Rgb, fraction: f64) -> Rgb {
    let channel = |low: u8, high: u8| -> u8 {
        let delta = (f64::from(high) - f64::from(low)) * fraction;
        (f64::from(low) + delta.floor()).clamp(0.0, 255.0) as u8
    };
    Rgb {
        r: channel(floor.r, ceil.r),
        g: channel(floor.g, ceil.g),
        b: channel(floor.b, ceil.b),
    }
}

/// Hands out colours in first-seen order and remembers them per key.
#[derive(Debug, Default)]
pub struct ColorPicker {
    assigned: HashMap<String, Rgb>,
}

impl ColorPicker {
    pub fn pick(&mut self, key: &str) -> Rgb {
        if let Some(color) = self.assigned.get(key) {
            return *color;
        }
        let color = color_for_index(self.assigned.len());
        self.assigned.insert(key.to_string(), color);
        color
    }

    pub fn len(&self) -> usize {
        self.assigned.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assigned.is_empty()
    }
}

#[cfg(test)]
#[path = "tests/color_tests.rs"]
mod tests;
