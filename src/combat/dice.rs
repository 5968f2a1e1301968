//! Dice notation value type. Every damage source is described as a `DiceRoll`
//! until the moment it is rolled.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

use crate::combat::rng::DiceRoller;

/// `count`d`sides` + `flat`. Immutable once built.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct DiceRoll {
    pub count: u32,
    pub sides: u32,
    pub flat: i32,
}

impl DiceRoll {
    pub const fn new(count: u32, sides: u32, flat: i32) -> Self {
        Self { count, sides, flat }
    }

    /// Flat bonus with no dice.
    pub const fn flat(value: i32) -> Self {
        Self::new(0, 0, value)
    }

    pub const fn dice(count: u32, sides: u32) -> Self {
        Self::new(count, sides, 0)
    }

    pub fn has_dice(&self) -> bool {
        self.count > 0 && self.sides > 0
    }

    /// Expected value: `count * (1 + sides) / 2 + flat`.
    pub fn average(&self) -> f64 {
        if !self.has_dice() {
            return f64::from(self.flat);
        }
        f64::from(self.count) * (1.0 + f64::from(self.sides)) / 2.0 + f64::from(self.flat)
    }

    /// Sum of `count` independent draws in `[1, sides]` plus `flat`.
    /// Zero count or zero sides draws nothing from the roller.
    pub fn roll<R: DiceRoller + ?Sized>(&self, roller: &mut R) -> i64 {
        let mut total = i64::from(self.flat);
        if self.has_dice() {
            for _ in 0..self.count {
                total += i64::from(roller.roll_die(self.sides));
            }
        }
        total
    }

    pub fn min(&self) -> i64 {
        let dice = if self.has_dice() { i64::from(self.count) } else { 0 };
        dice + i64::from(self.flat)
    }

    pub fn max(&self) -> i64 {
        let dice = if self.has_dice() {
            i64::from(self.count) * i64::from(self.sides)
        } else {
            0
        };
        dice + i64::from(self.flat)
    }
}

impl fmt::Display for DiceRoll {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.has_dice() {
            return write!(f, "{}", self.flat);
        }
        write!(f, "{}d{}", self.count, self.sides)?;
        match self.flat {
            0 => Ok(()),
            flat if flat > 0 => write!(f, "+{flat}"),
            flat => write!(f, "{flat}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid dice notation '{input}'")]
pub struct ParseDiceError {
    pub input: String,
}

/// Accepts `"2d6"`, `"2d6+3"`, `"1d8-1"`, `"d20"` and bare integers like `"10"` or `"-2"`.
impl FromStr for DiceRoll {
    type Err = ParseDiceError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let err = || ParseDiceError {
            input: raw.to_string(),
        };
        let compact: String = raw.chars().filter(|c| !c.is_whitespace()).collect();
        if compact.is_empty() {
            return Err(err());
        }

        let Some(d_index) = compact.find(['d', 'D']) else {
            return compact.parse::<i32>().map(DiceRoll::flat).map_err(|_| err());
        };

        let (count_part, rest) = compact.split_at(d_index);
        let rest = &rest[1..];
        let count = if count_part.is_empty() {
            1
        } else {
            count_part.parse::<u32>().map_err(|_| err())?
        };

        let (sides_part, flat) = match rest.find(['+', '-']) {
            Some(sign_index) => {
                let (sides, flat) = rest.split_at(sign_index);
                let flat = flat
                    .trim_start_matches('+')
                    .parse::<i32>()
                    .map_err(|_| err())?;
                (sides, flat)
            }
            None => (rest, 0),
        };
        let sides = sides_part.parse::<u32>().map_err(|_| err())?;
        Ok(DiceRoll::new(count, sides, flat))
    }
}

impl Serialize for DiceRoll {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum DiceRollRepr {
    Notation(String),
    Flat(i32),
    Parts {
        #[serde(default)]
        count: u32,
        #[serde(default)]
        sides: u32,
        #[serde(default)]
        flat: i32,
    },
}

impl<'de> Deserialize<'de> for DiceRoll {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        match DiceRollRepr::deserialize(deserializer)? {
            DiceRollRepr::Notation(raw) => raw.parse().map_err(serde::de::Error::custom),
            DiceRollRepr::Flat(flat) => Ok(DiceRoll::flat(flat)),
            DiceRollRepr::Parts { count, sides, flat } => Ok(DiceRoll::new(count, sides, flat)),
        }
    }
}
