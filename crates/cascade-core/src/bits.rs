//! Arbitrary-width two-state bit vectors.
//!
//! [`Bits`] is the value type shared by the elaborator, the software engines
//! and the data plane. Values are stored little-endian in 64-bit words and the
//! bits above `width` are kept at zero. Binary operators assume both operands
//! have already been extended to the width of the result; callers (the
//! expression evaluator) are responsible for Verilog's sizing rules.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

const WORD: usize = 64;

/// Errors produced when reading a value from text.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum BitsError {
    #[error("invalid digit '{digit}' for radix {radix}")]
    InvalidDigit { digit: char, radix: u32 },

    #[error("unsupported radix {0}")]
    UnsupportedRadix(u32),

    #[error("empty number")]
    Empty,

    #[error("malformed value literal '{0}'")]
    Malformed(String),
}

/// A two-state, arbitrary-width integer.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Bits {
    width: usize,
    signed: bool,
    words: Vec<u64>,
}

fn words_for(width: usize) -> usize {
    width.div_ceil(WORD).max(1)
}

impl Bits {
    /// Widest value the front end accepts for a literal, declaration or
    /// replication.
    pub const MAX_WIDTH: usize = 1 << 20;

    /// An unsigned zero of the given width (minimum one bit).
    pub fn new(width: usize) -> Self {
        let width = width.max(1);
        Self {
            width,
            signed: false,
            words: vec![0; words_for(width)],
        }
    }

    /// An unsigned value of the given width, truncating `val` as needed.
    pub fn from_u64(width: usize, val: u64) -> Self {
        let mut b = Self::new(width);
        b.words[0] = val;
        b.trim();
        b
    }

    /// A signed value of the given width, sign-extending `val`.
    pub fn from_i64(width: usize, val: i64) -> Self {
        let mut b = Self::new(width);
        let fill = if val < 0 { u64::MAX } else { 0 };
        for (i, w) in b.words.iter_mut().enumerate() {
            *w = if i == 0 { val as u64 } else { fill };
        }
        b.signed = true;
        b.trim();
        b
    }

    /// A single bit.
    pub fn from_bool(b: bool) -> Self {
        Self::from_u64(1, b as u64)
    }

    /// Read an unsized number in the given radix. The result is exactly as
    /// wide as the value requires (at least one bit). `_` separators are ignored.
    pub fn parse_radix(text: &str, radix: u32) -> Result<Self, BitsError> {
        if !matches!(radix, 2 | 8 | 10 | 16) {
            return Err(BitsError::UnsupportedRadix(radix));
        }
        let mut words: Vec<u64> = vec![0];
        let mut seen = false;
        for c in text.chars() {
            if c == '_' {
                continue;
            }
            let digit = c
                .to_digit(radix)
                .ok_or(BitsError::InvalidDigit { digit: c, radix })?;
            seen = true;
            let mut carry = digit as u128;
            for w in words.iter_mut() {
                let v = (*w as u128) * (radix as u128) + carry;
                *w = v as u64;
                carry = v >> WORD;
            }
            if carry != 0 {
                words.push(carry as u64);
            }
        }
        if !seen {
            return Err(BitsError::Empty);
        }
        let mut width = WORD * words.len();
        while width > 1 && !bit_of(&words, width - 1) {
            width -= 1;
        }
        let mut b = Self {
            width,
            signed: false,
            words,
        };
        b.words.truncate(words_for(width));
        b.trim();
        Ok(b)
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn is_signed(&self) -> bool {
        self.signed
    }

    pub fn set_signed(&mut self, signed: bool) {
        self.signed = signed;
    }

    /// Builder form of [`Bits::set_signed`].
    pub fn with_signed(mut self, signed: bool) -> Self {
        self.signed = signed;
        self
    }

    pub fn words(&self) -> &[u64] {
        &self.words
    }

    fn trim(&mut self) {
        let n = words_for(self.width);
        self.words.resize(n, 0);
        let rem = self.width % WORD;
        if rem != 0 {
            self.words[n - 1] &= (1u64 << rem) - 1;
        }
    }

    /// Bit `i`; reads past the width return `false`.
    pub fn get(&self, i: usize) -> bool {
        i < self.width && bit_of(&self.words, i)
    }

    /// Set bit `i`; writes past the width are ignored.
    pub fn set(&mut self, i: usize, val: bool) {
        if i >= self.width {
            return;
        }
        let mask = 1u64 << (i % WORD);
        if val {
            self.words[i / WORD] |= mask;
        } else {
            self.words[i / WORD] &= !mask;
        }
    }

    /// Flip bit `i`.
    pub fn flip(&mut self, i: usize) {
        let v = self.get(i);
        self.set(i, !v);
    }

    /// True for signed values with the top bit set.
    pub fn is_negative(&self) -> bool {
        self.signed && self.get(self.width - 1)
    }

    pub fn is_zero(&self) -> bool {
        self.words.iter().all(|w| *w == 0)
    }

    /// Any bit set.
    pub fn to_bool(&self) -> bool {
        !self.is_zero()
    }

    /// The low 64 bits.
    pub fn to_u64(&self) -> u64 {
        self.words[0]
    }

    /// The value as an `i64`, sign-extended when the value is signed.
    pub fn to_i64(&self) -> i64 {
        if self.width < WORD && self.is_negative() {
            (self.words[0] | (u64::MAX << self.width)) as i64
        } else {
            self.words[0] as i64
        }
    }

    /// The value as an index, saturating when upper words are set.
    pub fn to_usize(&self) -> usize {
        if self.words[1..].iter().any(|w| *w != 0) {
            return usize::MAX;
        }
        usize::try_from(self.words[0]).unwrap_or(usize::MAX)
    }

    /// Change the width, zero-extending or truncating.
    pub fn resize(&mut self, width: usize) {
        self.width = width.max(1);
        self.trim();
    }

    /// Change the width, sign-extending when the value is signed.
    pub fn extend(&mut self, width: usize) {
        let negative = self.is_negative();
        let old = self.width;
        self.resize(width);
        if negative {
            for i in old..self.width {
                self.set(i, true);
            }
        }
    }

    /// Copy of this value at a new width (sign-extending signed values).
    pub fn extended(&self, width: usize) -> Self {
        let mut b = self.clone();
        b.extend(width);
        b
    }

    /// Copy of this value at a new width, zero-extending.
    pub fn resized(&self, width: usize) -> Self {
        let mut b = self.clone();
        b.resize(width);
        b
    }

    /// Bits `msb` down to `lsb` as a new unsigned value.
    pub fn slice(&self, msb: usize, lsb: usize) -> Self {
        let (msb, lsb) = if msb >= lsb { (msb, lsb) } else { (lsb, msb) };
        let mut res = Self::new(msb - lsb + 1);
        for i in 0..res.width {
            res.set(i, self.get(lsb + i));
        }
        res
    }

    /// Overwrite bits `msb` down to `lsb` with the low bits of `val`.
    pub fn assign_slice(&mut self, msb: usize, lsb: usize, val: &Bits) {
        let (msb, lsb) = if msb >= lsb { (msb, lsb) } else { (lsb, msb) };
        for i in 0..=(msb - lsb) {
            self.set(lsb + i, val.get(i));
        }
    }

    /// Overwrite this value with `val`, keeping this value's width and sign.
    pub fn assign(&mut self, val: &Bits) {
        let ext = val.extended(self.width);
        self.words.copy_from_slice(&ext.words);
    }

    /// `{self, lower}`: a new unsigned value with `self` in the high bits.
    pub fn concat(&self, lower: &Bits) -> Self {
        let mut res = Self::new(self.width + lower.width);
        for i in 0..lower.width {
            res.set(i, lower.get(i));
        }
        for i in 0..self.width {
            res.set(lower.width + i, self.get(i));
        }
        res
    }

    /// Same numeric value ignoring width and sign.
    pub fn value_eq(&self, other: &Bits) -> bool {
        let n = self.words.len().max(other.words.len());
        (0..n).all(|i| {
            self.words.get(i).copied().unwrap_or(0) == other.words.get(i).copied().unwrap_or(0)
        })
    }

    fn same_shape(&self) -> Self {
        Self {
            width: self.width,
            signed: self.signed,
            words: vec![0; self.words.len()],
        }
    }

    fn word(&self, i: usize) -> u64 {
        self.words.get(i).copied().unwrap_or(0)
    }

    // Bitwise operators

    pub fn not(&self) -> Self {
        let mut res = self.clone();
        for w in res.words.iter_mut() {
            *w = !*w;
        }
        res.trim();
        res
    }

    pub fn and(&self, rhs: &Bits) -> Self {
        self.zip(rhs, |a, b| a & b)
    }

    pub fn or(&self, rhs: &Bits) -> Self {
        self.zip(rhs, |a, b| a | b)
    }

    pub fn xor(&self, rhs: &Bits) -> Self {
        self.zip(rhs, |a, b| a ^ b)
    }

    pub fn xnor(&self, rhs: &Bits) -> Self {
        self.zip(rhs, |a, b| !(a ^ b))
    }

    fn zip(&self, rhs: &Bits, f: impl Fn(u64, u64) -> u64) -> Self {
        let mut res = self.same_shape();
        for (i, w) in res.words.iter_mut().enumerate() {
            *w = f(self.word(i), rhs.word(i));
        }
        res.trim();
        res
    }

    /// Logical shift left by `n` bits.
    pub fn shl(&self, n: usize) -> Self {
        let mut res = self.same_shape();
        if n >= self.width {
            return res;
        }
        let (ws, bs) = (n / WORD, n % WORD);
        for i in (ws..res.words.len()).rev() {
            let lo = self.word(i - ws);
            let carry = if bs != 0 && i > ws {
                self.word(i - ws - 1) >> (WORD - bs)
            } else {
                0
            };
            res.words[i] = (lo << bs) | carry;
        }
        res.trim();
        res
    }

    /// Logical shift right by `n` bits.
    pub fn lshr(&self, n: usize) -> Self {
        let mut res = self.same_shape();
        if n >= self.width {
            return res;
        }
        let (ws, bs) = (n / WORD, n % WORD);
        for i in 0..res.words.len() {
            let hi = self.word(i + ws);
            let carry = if bs != 0 {
                self.word(i + ws + 1) << (WORD - bs)
            } else {
                0
            };
            res.words[i] = (hi >> bs) | carry;
        }
        res.trim();
        res
    }

    /// Arithmetic shift right: fills with the sign bit when the value is signed.
    pub fn ashr(&self, n: usize) -> Self {
        if !self.is_negative() {
            return self.lshr(n);
        }
        let mut res = self.lshr(n);
        let start = self.width.saturating_sub(n);
        for i in start..self.width {
            res.set(i, true);
        }
        res
    }

    // Arithmetic operators

    pub fn add(&self, rhs: &Bits) -> Self {
        let mut res = self.same_shape();
        let mut carry = 0u128;
        for (i, w) in res.words.iter_mut().enumerate() {
            let v = self.word(i) as u128 + rhs.word(i) as u128 + carry;
            *w = v as u64;
            carry = v >> WORD;
        }
        res.trim();
        res
    }

    pub fn neg(&self) -> Self {
        let one = Self::from_u64(self.width, 1).with_signed(self.signed);
        self.not().add(&one)
    }

    pub fn sub(&self, rhs: &Bits) -> Self {
        let mut rhs = rhs.resized(self.width);
        rhs.signed = self.signed;
        self.add(&rhs.neg())
    }

    pub fn mul(&self, rhs: &Bits) -> Self {
        let n = self.words.len();
        let mut acc = vec![0u64; n];
        for i in 0..n {
            let a = self.word(i) as u128;
            if a == 0 {
                continue;
            }
            let mut carry = 0u128;
            for j in 0..(n - i) {
                let v = acc[i + j] as u128 + a * rhs.word(j) as u128 + carry;
                acc[i + j] = v as u64;
                carry = v >> WORD;
            }
        }
        let mut res = self.same_shape();
        res.words = acc;
        res.trim();
        res
    }

    /// Unsigned division and remainder. Division by zero yields zeros.
    fn udivrem(&self, rhs: &Bits) -> (Self, Self) {
        let mut q = self.same_shape();
        let mut r = self.same_shape();
        if rhs.is_zero() {
            return (q, r);
        }
        if self.width <= WORD {
            if rhs.words[1..].iter().any(|w| *w != 0) || rhs.word(0) == 0 {
                r.words[0] = self.words[0];
                return (q, r);
            }
            q.words[0] = self.words[0] / rhs.word(0);
            r.words[0] = self.words[0] % rhs.word(0);
            return (q, r);
        }
        let d = rhs.resized(self.width).with_signed(false);
        r.signed = false;
        for i in (0..self.width).rev() {
            r = r.shl(1);
            r.set(0, self.get(i));
            if r.ucmp(&d) != Ordering::Less {
                r = r.sub(&d);
                q.set(i, true);
            }
        }
        r.signed = self.signed;
        (q, r)
    }

    /// Division, signed when both operands are signed. Division by zero yields zero.
    pub fn div(&self, rhs: &Bits) -> Self {
        if self.signed && rhs.signed {
            let (a, b) = (self.abs(), rhs.abs());
            let (q, _) = a.udivrem(&b);
            if self.is_negative() != rhs.is_negative() {
                q.neg()
            } else {
                q
            }
        } else {
            self.udivrem(rhs).0
        }
    }

    /// Remainder with the sign of the dividend when signed.
    pub fn rem(&self, rhs: &Bits) -> Self {
        if self.signed && rhs.signed {
            let (a, b) = (self.abs(), rhs.abs());
            let (_, r) = a.udivrem(&b);
            if self.is_negative() {
                r.neg()
            } else {
                r
            }
        } else {
            self.udivrem(rhs).1
        }
    }

    fn abs(&self) -> Self {
        if self.is_negative() {
            self.neg()
        } else {
            self.clone()
        }
    }

    /// `self ** exp` at the width of `self`. Negative exponents give zero
    /// except for bases of one.
    pub fn pow(&self, exp: &Bits) -> Self {
        let one = Self::from_u64(self.width, 1).with_signed(self.signed);
        if exp.is_negative() {
            return if self.value_eq(&one) {
                one
            } else {
                self.same_shape()
            };
        }
        let mut res = one;
        let mut base = self.clone();
        for i in 0..exp.width {
            if exp.get(i) {
                res = res.mul(&base);
            }
            base = base.mul(&base);
        }
        res
    }

    // Comparison

    /// Unsigned comparison of the numeric values.
    pub fn ucmp(&self, rhs: &Bits) -> Ordering {
        let n = self.words.len().max(rhs.words.len());
        for i in (0..n).rev() {
            match self.word(i).cmp(&rhs.word(i)) {
                Ordering::Equal => continue,
                o => return o,
            }
        }
        Ordering::Equal
    }

    /// Comparison honouring signedness when both operands are signed.
    pub fn compare(&self, rhs: &Bits) -> Ordering {
        if self.signed && rhs.signed {
            match (self.is_negative(), rhs.is_negative()) {
                (true, false) => return Ordering::Less,
                (false, true) => return Ordering::Greater,
                _ => {}
            }
        }
        self.ucmp(rhs)
    }

    // Reductions

    pub fn reduce_and(&self) -> bool {
        (0..self.width).all(|i| self.get(i))
    }

    pub fn reduce_or(&self) -> bool {
        self.to_bool()
    }

    pub fn reduce_xor(&self) -> bool {
        self.words.iter().map(|w| w.count_ones()).sum::<u32>() % 2 == 1
    }

    // Formatting

    /// Render in radix 2, 8, 10 or 16 without leading zeros. Radix 10 prints
    /// a leading `-` for negative signed values.
    pub fn to_string_radix(&self, radix: u32) -> String {
        match radix {
            10 => self.to_decimal(),
            2 | 8 | 16 => {
                let step = match radix {
                    2 => 1,
                    8 => 3,
                    _ => 4,
                };
                let mut digits = Vec::new();
                let mut i = 0;
                while i < self.width {
                    let mut d = 0u32;
                    for k in 0..step {
                        if self.get(i + k) {
                            d |= 1 << k;
                        }
                    }
                    digits.push(std::char::from_digit(d, radix).unwrap_or('0'));
                    i += step;
                }
                while digits.len() > 1 && digits.last() == Some(&'0') {
                    digits.pop();
                }
                digits.iter().rev().collect()
            }
            _ => self.to_decimal(),
        }
    }

    fn to_decimal(&self) -> String {
        let negative = self.is_negative();
        let mut val = if negative { self.neg() } else { self.clone() };
        val.signed = false;
        if val.is_zero() {
            return "0".to_string();
        }
        const CHUNK: u64 = 10_000_000_000_000_000_000;
        let mut chunks = Vec::new();
        while !val.is_zero() {
            let (q, r) = val.div_small(CHUNK);
            chunks.push(r);
            val = q;
        }
        let mut out = String::new();
        if negative {
            out.push('-');
        }
        let mut iter = chunks.iter().rev();
        if let Some(first) = iter.next() {
            out.push_str(&first.to_string());
        }
        for c in iter {
            out.push_str(&format!("{c:019}"));
        }
        out
    }

    fn div_small(&self, d: u64) -> (Self, u64) {
        let mut q = self.same_shape();
        let mut rem = 0u128;
        for i in (0..self.words.len()).rev() {
            let cur = (rem << WORD) | self.words[i] as u128;
            q.words[i] = (cur / d as u128) as u64;
            rem = cur % d as u128;
        }
        (q, rem as u64)
    }

    /// Interpret the value as a string of 8-bit characters, most significant first.
    /// Leading NUL bytes are dropped.
    pub fn to_ascii(&self) -> String {
        let bytes = self.width.div_ceil(8);
        let mut out = String::new();
        for b in (0..bytes).rev() {
            let c = self.slice(b * 8 + 7, b * 8).to_u64() as u8;
            if c != 0 || !out.is_empty() {
                out.push(c as char);
            }
        }
        out
    }

    /// `<width>'<s?>h<hex>`: the literal used by save files.
    pub fn to_literal(&self) -> String {
        format!(
            "{}'{}h{}",
            self.width,
            if self.signed { "s" } else { "" },
            self.to_string_radix(16)
        )
    }
}

fn bit_of(words: &[u64], i: usize) -> bool {
    words
        .get(i / WORD)
        .is_some_and(|w| (w >> (i % WORD)) & 1 == 1)
}

impl Default for Bits {
    fn default() -> Self {
        Self::new(1)
    }
}

impl fmt::Display for Bits {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_decimal())
    }
}

impl fmt::Debug for Bits {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_literal())
    }
}

impl FromStr for Bits {
    type Err = BitsError;

    /// Parse the `<width>'<s?>h<hex>` form produced by [`Bits::to_literal`].
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let malformed = || BitsError::Malformed(s.to_string());
        let (width, rest) = s.split_once('\'').ok_or_else(malformed)?;
        let width: usize = width.trim().parse().map_err(|_| malformed())?;
        let (signed, rest) = match rest.strip_prefix('s') {
            Some(r) => (true, r),
            None => (false, rest),
        };
        let digits = rest.strip_prefix('h').ok_or_else(malformed)?;
        let mut val = Bits::parse_radix(digits, 16)?;
        val.resize(width);
        val.signed = signed;
        Ok(val)
    }
}

impl Serialize for Bits {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_literal())
    }
}

impl<'de> Deserialize<'de> for Bits {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
