//! Randomized value changes for primitive statements.

use rand::{Rng, RngCore};
use smartseed_types::Value;

use crate::config::{MutationStrategy, SensitivityConfig};

const ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Printable ASCII bounds for character mutation.
const CHAR_MIN: i128 = 0x20;
const CHAR_MAX: i128 = 0x7e;

/// Produces a changed copy of a primitive value.
#[derive(Clone, Debug)]
pub struct ValueMutator {
    strategy: MutationStrategy,
    max_delta: i64,
    max_int: i64,
}

impl ValueMutator {
    pub fn new(strategy: MutationStrategy, max_delta: i64, max_int: i64) -> Self {
        Self {
            strategy,
            max_delta: max_delta.max(1),
            max_int: max_int.max(1),
        }
    }

    pub fn from_config(config: &SensitivityConfig) -> Self {
        Self::new(config.mutation_strategy, config.max_delta, config.max_int)
    }

    pub fn strategy(&self) -> MutationStrategy {
        self.strategy
    }

    /// Whether [`mutate`](Self::mutate) can change this kind of value.
    pub fn can_mutate(value: &Value) -> bool {
        !matches!(value, Value::Null | Value::Object(_))
    }

    /// A value of the same kind that differs from `value`, or `None` for nulls and objects.
    pub fn mutate(&self, value: &Value, rng: &mut dyn RngCore) -> Option<Value> {
        let replace = match self.strategy {
            MutationStrategy::Delta => false,
            MutationStrategy::RandomReplace => true,
            MutationStrategy::Mixed => rng.gen_ratio(1, 3),
        };

        let mutated = match value {
            Value::Null | Value::Object(_) => return None,
            Value::Bool(b) => Value::Bool(!b),
            Value::Char(c) => {
                let code = (*c as i128).clamp(CHAR_MIN, CHAR_MAX);
                let next = self.next_integer(*c as i128, code, CHAR_MIN, CHAR_MAX, replace, rng);
                Value::Char(char::from_u32(next as u32).unwrap_or('a'))
            }
            Value::Byte(v) => {
                let (min, max) = (i8::MIN as i128, i8::MAX as i128);
                Value::Byte(self.next_integer(*v as i128, *v as i128, min, max, replace, rng) as i8)
            }
            Value::Short(v) => {
                let (min, max) = (i16::MIN as i128, i16::MAX as i128);
                Value::Short(self.next_integer(*v as i128, *v as i128, min, max, replace, rng) as i16)
            }
            Value::Int(v) => {
                let (min, max) = (i32::MIN as i128, i32::MAX as i128);
                Value::Int(self.next_integer(*v as i128, *v as i128, min, max, replace, rng) as i32)
            }
            Value::Long(v) => {
                let (min, max) = (i64::MIN as i128, i64::MAX as i128);
                Value::Long(self.next_integer(*v as i128, *v as i128, min, max, replace, rng) as i64)
            }
            Value::Float(v) => Value::Float(self.next_float(*v as f64, replace, rng) as f32),
            Value::Double(v) => Value::Double(self.next_float(*v, replace, rng)),
            Value::Str(s) => Value::Str(self.next_string(s, replace, rng)),
        };

        // rounding can swallow a small delta on large floats
        let mutated = match (&mutated, value) {
            (Value::Float(a), Value::Float(b)) if a == b => {
                Value::Float(if *b == 0.0 { 1.0 } else { -b })
            }
            (Value::Double(a), Value::Double(b)) if a == b => {
                Value::Double(if *b == 0.0 { 1.0 } else { -b })
            }
            _ => mutated,
        };
        Some(mutated)
    }

    /// `original` is the stored value, `current` its clamp into `min..=max`.
    fn next_integer(
        &self,
        original: i128,
        current: i128,
        min: i128,
        max: i128,
        replace: bool,
        rng: &mut dyn RngCore,
    ) -> i128 {
        if replace {
            let mut lo = (-(self.max_int as i128)).max(min);
            let mut hi = (self.max_int as i128).min(max);
            // the bound may not overlap a narrow type range (chars start at 0x20)
            if lo >= hi {
                (lo, hi) = (min, max);
            }
            let next = rng.gen_range(lo..=hi);
            if next != original {
                return next;
            }
            return if next < hi { next + 1 } else { next - 1 };
        }

        let delta = self.delta(rng) as i128;
        let next = (current + delta).clamp(min, max);
        if next != original {
            return next;
        }
        (current - delta).clamp(min, max)
    }

    fn next_float(&self, current: f64, replace: bool, rng: &mut dyn RngCore) -> f64 {
        if replace {
            let bound = self.max_int as f64;
            let next = rng.gen_range(-bound..bound);
            return if next == current { next + 1.0 } else { next };
        }
        let delta = self.delta(rng) as f64;
        if current.is_finite() {
            current + delta
        } else {
            delta
        }
    }

    fn next_string(&self, current: &str, replace: bool, rng: &mut dyn RngCore) -> String {
        if replace {
            let len = rng.gen_range(1..=10);
            let mut next: String = (0..len).map(|_| random_char(rng)).collect();
            if next == current {
                next.push(random_char(rng));
            }
            return next;
        }

        let mut chars: Vec<char> = current.chars().collect();
        if chars.is_empty() {
            return random_char(rng).to_string();
        }
        let at = rng.gen_range(0..chars.len());
        match rng.gen_range(0..3) {
            0 => chars.insert(at, random_char(rng)),
            1 => {
                chars.remove(at);
            }
            _ => {
                let old = chars[at];
                let mut ch = random_char(rng);
                while ch == old {
                    ch = random_char(rng);
                }
                chars[at] = ch;
            }
        }
        chars.into_iter().collect()
    }

    /// Non-zero delta in `-max_delta..=max_delta`.
    fn delta(&self, rng: &mut dyn RngCore) -> i64 {
        let magnitude = rng.gen_range(1..=self.max_delta);
        if rng.gen_bool(0.5) {
            -magnitude
        } else {
            magnitude
        }
    }
}

fn random_char(rng: &mut dyn RngCore) -> char {
    ALPHABET[rng.gen_range(0..ALPHABET.len())] as char
}
