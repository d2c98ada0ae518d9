//! Compile-time constant values (spec.md §3 Expression "Constant").

use crate::ast::ty::TypeId;

/// A compile-time constant value. Carries its own type rather than relying
/// on the enclosing expression's type so that constant-folding coercions
/// (spec.md §4.2 "Constant-to-constant coercion") can inspect the concrete
/// representation without a type lookup.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub enum Constant {
    Integer { value: i64, ty: TypeId },
    Bool(bool),
    Double(f64),
    String(String),
    Bytes(Vec<u8>),
    Address(std::net::IpAddr),
    Network { addr: std::net::IpAddr, prefix_len: u8 },
    Port(u16),
    Interval { secs: i64, nanos: u32 },
    Time { secs: i64, nanos: u32 },
    /// An elementwise-constant tuple; coercion recurses per element
    /// (spec.md §4.2).
    Tuple(Vec<Constant>),
    Enum { ty: TypeId, label: crate::intern::StringId, value: i64 },
    Bitset { ty: TypeId, bits: u64 },
    None,
}

impl Constant {
    /// Width-narrowing integer coercion used by constant folding: succeeds
    /// only when `value` fits in `width` bits with the requested
    /// signedness (spec.md §4.2, §8 scenario 1).
    #[must_use]
    pub fn fits_integer_width(value: i64, width: u8, signed: bool) -> bool {
        if signed {
            let (lo, hi): (i128, i128) = match width {
                8 => (i128::from(i8::MIN), i128::from(i8::MAX)),
                16 => (i128::from(i16::MIN), i128::from(i16::MAX)),
                32 => (i128::from(i32::MIN), i128::from(i32::MAX)),
                64 => (i128::from(i64::MIN), i128::from(i64::MAX)),
                _ => return false,
            };
            let value = i128::from(value);
            value >= lo && value <= hi
        } else {
            if value < 0 {
                return false;
            }
            let hi: u128 = match width {
                8 => u128::from(u8::MAX),
                16 => u128::from(u16::MAX),
                32 => u128::from(u32::MAX),
                64 => u128::from(u64::MAX),
                _ => return false,
            };
            u128::try_from(value).is_ok_and(|v| v <= hi)
        }
    }
}
