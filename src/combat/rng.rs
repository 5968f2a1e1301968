//! Fast PRNG for combat simulation. Uses SplitMix64 for throughput and good statistical quality.
//! Deterministic: same seed produces the same sequence. Not cryptographically secure.

const SPLITMIX64_GOLDEN: u64 = 0x9e3779b97f4a7c15;
const SPLITMIX64_M1: u64 = 0xbf58476d1ce4e5b9;
const SPLITMIX64_M2: u64 = 0x94d049bb133111eb;

/// Source of dice draws. The engine only ever talks to this trait so tests can
/// replay a fixed sequence of rolls.
pub trait DiceRoller {
    /// Uniform draw in `[1, sides]`. `sides` is never zero.
    fn roll_die(&mut self, sides: u32) -> u32;

    /// Uniform draw in `[0, 1)`.
    fn unit(&mut self) -> f64;

    fn d20(&mut self) -> u32 {
        self.roll_die(20)
    }

    /// True with probability `percent / 100`.
    fn chance(&mut self, percent: f64) -> bool {
        if percent <= 0.0 {
            return false;
        }
        if percent >= 100.0 {
            return true;
        }
        self.unit() * 100.0 < percent
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Rng {
    state: u64,
}

impl Rng {
    pub fn new(seed: u64) -> Self {
        Self { state: seed }
    }

    #[inline]
    pub fn next_u64(&mut self) -> u64 {
        self.state = self.state.wrapping_add(SPLITMIX64_GOLDEN);
        let mut z = self.state;
        z = (z ^ (z >> 30)).wrapping_mul(SPLITMIX64_M1);
        z = (z ^ (z >> 27)).wrapping_mul(SPLITMIX64_M2);
        z ^ (z >> 31)
    }
}

impl DiceRoller for Rng {
    #[inline]
    fn roll_die(&mut self, sides: u32) -> u32 {
        // Lemire multiply-shift: maps 64 random bits onto [0, sides).
        let scaled = (u128::from(self.next_u64()) * u128::from(sides)) >> 64;
        scaled as u32 + 1
    }

    #[inline]
    fn unit(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 * (1.0 / (1u64 << 53) as f64)
    }
}

/// Replays a fixed list of die faces (and optional unit draws), cycling when exhausted.
/// Faces larger than the requested die are clamped to `sides`.
#[derive(Debug, Clone, Default)]
pub struct ScriptedRoller {
    faces: Vec<u32>,
    units: Vec<f64>,
    next_face: usize,
    next_unit: usize,
    drawn: usize,
}

impl ScriptedRoller {
    pub fn new(faces: Vec<u32>) -> Self {
        Self {
            faces,
            ..Self::default()
        }
    }

    pub fn with_units(mut self, units: Vec<f64>) -> Self {
        self.units = units;
        self
    }

    /// Number of die faces handed out so far.
    pub fn dice_drawn(&self) -> usize {
        self.drawn
    }
}

impl DiceRoller for ScriptedRoller {
    fn roll_die(&mut self, sides: u32) -> u32 {
        self.drawn += 1;
        if self.faces.is_empty() {
            return 1;
        }
        let face = self.faces[self.next_face % self.faces.len()];
        self.next_face += 1;
        face.clamp(1, sides)
    }

    /// Empty unit script never procs anything.
    fn unit(&mut self) -> f64 {
        if self.units.is_empty() {
            return 0.999_999;
        }
        let value = self.units[self.next_unit % self.units.len()];
        self.next_unit += 1;
        value
    }
}
