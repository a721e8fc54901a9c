use bytemuck::Pod;
use static_assertions::const_assert;
use std::fmt::{Debug, Display};

const_assert!(std::mem::size_of::<usize>() >= std::mem::size_of::<u64>());

/// Token scan strategy for a weight type.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WeightKind {
    UnsignedInt,
    SignedInt,
    Float,
}

/// Integer scalar usable for coordinate labels and edge counts.
///
/// The byte width is part of the on-disk contract: binary files record it
/// and loading verifies it against the instantiated type.
pub trait Index:
    Pod + Default + Copy + Ord + Eq + Debug + Display + Send + Sync + 'static
{
    /// Byte width as stored in binary width prefixes.
    const WIDTH: u8;

    fn from_u64(v: u64) -> Self;
    fn to_u64(self) -> u64;
    fn from_usize(v: usize) -> Self;
    fn to_usize(self) -> usize;

    /// Emission width of the decimal rendering, sign included.
    fn ascii_len(self) -> usize;
    /// Render the decimal form at the start of `out`; returns bytes written.
    fn write_ascii(self, out: &mut [u8]) -> usize;
}

/// Scalar usable for edge weights.
///
/// `KIND` selects the token scan used by the text reader; the integer kinds
/// parse sign and magnitude separately, the float kind goes through the
/// relaxed decimal scanner.
pub trait Weight:
    Pod + Default + Copy + PartialEq + Debug + Display + Send + Sync + 'static
{
    const KIND: WeightKind;
    const WIDTH: u8;

    fn from_parts(sign: i64, magnitude: u64) -> Self;
    fn from_f64(v: f64) -> Self;

    fn ascii_len(self) -> usize;
    fn write_ascii(self, out: &mut [u8]) -> usize;
}

fn unsigned_digits(mut v: u64) -> usize {
    let mut n = 1usize;
    while v >= 10 {
        v /= 10;
        n += 1;
    }
    n
}

fn write_unsigned(mut v: u64, out: &mut [u8]) -> usize {
    let n = unsigned_digits(v);
    let mut pos = n;
    loop {
        pos -= 1;
        out[pos] = (v % 10) as u8 + b'0';
        v /= 10;
        if v == 0 {
            break;
        }
    }
    n
}

macro_rules! index_unsigned {
    ($($t:ty),*) => {$(
        impl Index for $t {
            const WIDTH: u8 = std::mem::size_of::<$t>() as u8;

            #[inline(always)]
            fn from_u64(v: u64) -> Self { v as $t }
            #[inline(always)]
            fn to_u64(self) -> u64 { self as u64 }
            #[inline(always)]
            fn from_usize(v: usize) -> Self { v as $t }
            #[inline(always)]
            fn to_usize(self) -> usize { self as usize }

            fn ascii_len(self) -> usize { unsigned_digits(self as u64) }
            fn write_ascii(self, out: &mut [u8]) -> usize {
                write_unsigned(self as u64, out)
            }
        }
    )*};
}

macro_rules! index_signed {
    ($($t:ty),*) => {$(
        impl Index for $t {
            const WIDTH: u8 = std::mem::size_of::<$t>() as u8;

            #[inline(always)]
            fn from_u64(v: u64) -> Self { v as $t }
            #[inline(always)]
            fn to_u64(self) -> u64 { self as u64 }
            #[inline(always)]
            fn from_usize(v: usize) -> Self { v as $t }
            #[inline(always)]
            fn to_usize(self) -> usize { self as usize }

            fn ascii_len(self) -> usize {
                let neg = (self < 0) as usize;
                neg + unsigned_digits(self.unsigned_abs() as u64)
            }
            fn write_ascii(self, out: &mut [u8]) -> usize {
                let mut at = 0usize;
                if self < 0 {
                    out[0] = b'-';
                    at = 1;
                }
                at + write_unsigned(self.unsigned_abs() as u64, &mut out[at..])
            }
        }
    )*};
}

index_unsigned!(u8, u16, u32, u64, usize);
index_signed!(i32, i64);

macro_rules! weight_unsigned {
    ($($t:ty),*) => {$(
        impl Weight for $t {
            const KIND: WeightKind = WeightKind::UnsignedInt;
            const WIDTH: u8 = std::mem::size_of::<$t>() as u8;

            #[inline(always)]
            fn from_parts(_sign: i64, magnitude: u64) -> Self { magnitude as $t }
            #[inline(always)]
            fn from_f64(v: f64) -> Self { v as $t }

            fn ascii_len(self) -> usize { unsigned_digits(self as u64) }
            fn write_ascii(self, out: &mut [u8]) -> usize {
                write_unsigned(self as u64, out)
            }
        }
    )*};
}

macro_rules! weight_signed {
    ($($t:ty),*) => {$(
        impl Weight for $t {
            const KIND: WeightKind = WeightKind::SignedInt;
            const WIDTH: u8 = std::mem::size_of::<$t>() as u8;

            #[inline(always)]
            fn from_parts(sign: i64, magnitude: u64) -> Self {
                sign as $t * magnitude as $t
            }
            #[inline(always)]
            fn from_f64(v: f64) -> Self { v as $t }

            fn ascii_len(self) -> usize {
                let neg = (self < 0) as usize;
                neg + unsigned_digits(self.unsigned_abs() as u64)
            }
            fn write_ascii(self, out: &mut [u8]) -> usize {
                let mut at = 0usize;
                if self < 0 {
                    out[0] = b'-';
                    at = 1;
                }
                at + write_unsigned(self.unsigned_abs() as u64, &mut out[at..])
            }
        }
    )*};
}

// Floats render through the standard shortest-roundtrip formatter; both
// writer passes format the same value, so sizing and emission agree.
macro_rules! weight_float {
    ($($t:ty),*) => {$(
        impl Weight for $t {
            const KIND: WeightKind = WeightKind::Float;
            const WIDTH: u8 = std::mem::size_of::<$t>() as u8;

            #[inline(always)]
            fn from_parts(sign: i64, magnitude: u64) -> Self {
                (sign as $t) * (magnitude as $t)
            }
            #[inline(always)]
            fn from_f64(v: f64) -> Self { v as $t }

            fn ascii_len(self) -> usize { format!("{}", self).len() }
            fn write_ascii(self, out: &mut [u8]) -> usize {
                let s = format!("{}", self);
                let b = s.as_bytes();
                out[..b.len()].copy_from_slice(b);
                b.len()
            }
        }
    )*};
}

weight_unsigned!(u8, u16, u32, u64);
weight_signed!(i8, i16, i32, i64);
weight_float!(f32, f64);
