//! Packed decimal float arithmetic for the hook API.
//!
//! A float is carried across the guest boundary as an `i64` "enclosing
//! number": bits 0–53 hold the mantissa, bits 54–61 the exponent biased
//! by +97, and bit 62 the sign (set = negative). Bit 63 is never set, so
//! every valid float is a non-negative `i64` and never collides with the
//! negative error-code space. Canonical zero is the enclosing number `0`.
//!
//! A nonzero mantissa is always normalized to `[10^15, 10^16)`; the
//! exponent ranges over `[-96, 80]`. All arithmetic uses `i128`
//! intermediates — no host floating point anywhere.

use crate::error::HookReturnCode;

/// Result type for float operations: a valid enclosing number or a code
/// from the arithmetic error family.
pub type XflResult = Result<i64, HookReturnCode>;

/// Smallest normalized mantissa (10^15).
pub const MANTISSA_MIN: i64 = 1_000_000_000_000_000;
/// Largest normalized mantissa (10^16 - 1).
pub const MANTISSA_MAX: i64 = 9_999_999_999_999_999;
/// Smallest representable exponent.
pub const EXPONENT_MIN: i32 = -96;
/// Largest representable exponent.
pub const EXPONENT_MAX: i32 = 80;

const EXPONENT_BIAS: i64 = 97;
const MANTISSA_MASK: i64 = (1 << 54) - 1;
const SIGN_BIT: i64 = 1 << 62;

/// Comparison mode bits for [`compare`].
pub const COMPARE_EQUAL: u32 = 1;
pub const COMPARE_LESS: u32 = 2;
pub const COMPARE_GREATER: u32 = 4;

/// The issued-amount marker bit in the first byte of a 48-byte amount.
const ISSUED_BIT: u64 = 1 << 63;

fn pack(negative: bool, exponent: i32, mantissa: i64) -> i64 {
    let sign = if negative { SIGN_BIT } else { 0 };
    sign | ((exponent as i64 + EXPONENT_BIAS) << 54) | mantissa
}

/// Decompose an enclosing number. `Ok(None)` is canonical zero.
fn unpack(f: i64) -> Result<Option<(bool, i32, i64)>, HookReturnCode> {
    if f == 0 {
        return Ok(None);
    }
    if f < 0 {
        return Err(HookReturnCode::InvalidFloat);
    }
    let mantissa = f & MANTISSA_MASK;
    let exponent = ((f >> 54) & 0xFF) - EXPONENT_BIAS;
    let negative = f & SIGN_BIT != 0;
    if mantissa < MANTISSA_MIN {
        return Err(HookReturnCode::MantissaUndersized);
    }
    if mantissa > MANTISSA_MAX {
        return Err(HookReturnCode::MantissaOversized);
    }
    if exponent < EXPONENT_MIN as i64 {
        return Err(HookReturnCode::ExponentUndersized);
    }
    if exponent > EXPONENT_MAX as i64 {
        return Err(HookReturnCode::ExponentOversized);
    }
    Ok(Some((negative, exponent as i32, mantissa)))
}

/// Normalize an arithmetic intermediate. Underflow collapses to canonical
/// zero; overflow is an error.
fn normalize(negative: bool, mut mantissa: i128, mut exponent: i32) -> XflResult {
    if mantissa == 0 {
        return Ok(0);
    }
    while mantissa < MANTISSA_MIN as i128 {
        mantissa *= 10;
        exponent -= 1;
    }
    while mantissa > MANTISSA_MAX as i128 {
        mantissa /= 10;
        exponent += 1;
    }
    if exponent < EXPONENT_MIN {
        return Ok(0);
    }
    if exponent > EXPONENT_MAX {
        return Err(HookReturnCode::Overflow);
    }
    Ok(pack(negative, exponent, mantissa as i64))
}

/// Build a float from an exponent and a signed mantissa.
///
/// Unlike the arithmetic path, an exponent that leaves the representable
/// range after normalization is reported rather than flushed to zero.
pub fn new(exponent: i32, mantissa: i64) -> XflResult {
    if mantissa == 0 {
        return Ok(0);
    }
    let negative = mantissa < 0;
    let mut m = (mantissa as i128).abs();
    let mut e = exponent;
    while m < MANTISSA_MIN as i128 {
        m *= 10;
        e -= 1;
    }
    while m > MANTISSA_MAX as i128 {
        m /= 10;
        e += 1;
    }
    if e < EXPONENT_MIN {
        return Err(HookReturnCode::ExponentUndersized);
    }
    if e > EXPONENT_MAX {
        return Err(HookReturnCode::ExponentOversized);
    }
    Ok(pack(negative, e, m as i64))
}

/// The float 1.0.
pub fn one() -> i64 {
    pack(false, -15, MANTISSA_MIN)
}

/// Add two floats.
pub fn sum(a: i64, b: i64) -> XflResult {
    let ua = unpack(a)?;
    let ub = unpack(b)?;
    let (na, ea, ma) = match ua {
        None => return Ok(b),
        Some(v) => v,
    };
    let (nb, eb, mb) = match ub {
        None => return Ok(a),
        Some(v) => v,
    };
    // Order so that ea >= eb; beyond 17 decimal digits the smaller term
    // cannot affect the result.
    let (na, ea, ma, nb, eb, mb) = if ea >= eb {
        (na, ea, ma, nb, eb, mb)
    } else {
        (nb, eb, mb, na, ea, ma)
    };
    let diff = (ea - eb) as u32;
    if diff > 17 {
        return Ok(pack(na, ea, ma));
    }
    let sa = if na { -(ma as i128) } else { ma as i128 };
    let sb = if nb { -(mb as i128) } else { mb as i128 };
    let total = sa * 10i128.pow(diff) + sb;
    normalize(total < 0, total.abs(), eb)
}

/// Multiply two floats. Zero times anything is canonical zero.
pub fn multiply(a: i64, b: i64) -> XflResult {
    let (na, ea, ma) = match unpack(a)? {
        None => return Ok(0),
        Some(v) => v,
    };
    let (nb, eb, mb) = match unpack(b)? {
        None => return Ok(0),
        Some(v) => v,
    };
    let product = ma as i128 * mb as i128 / MANTISSA_MIN as i128;
    normalize(na != nb, product, ea + eb + 15)
}

/// Multiply a float by the ratio `numerator / denominator`.
pub fn mulratio(f: i64, round_up: bool, numerator: u32, denominator: u32) -> XflResult {
    if denominator == 0 {
        return Err(HookReturnCode::DivisionByZero);
    }
    let (neg, e, m) = match unpack(f)? {
        None => return Ok(0),
        Some(v) => v,
    };
    let scaled = m as i128 * numerator as i128;
    let d = denominator as i128;
    let q = if round_up { (scaled + d - 1) / d } else { scaled / d };
    normalize(neg, q, e)
}

/// Divide `a` by `b`.
pub fn divide(a: i64, b: i64) -> XflResult {
    let ub = unpack(b)?;
    let (nb, eb, mb) = match ub {
        None => return Err(HookReturnCode::DivisionByZero),
        Some(v) => v,
    };
    let (na, ea, ma) = match unpack(a)? {
        None => return Ok(0),
        Some(v) => v,
    };
    let q = ma as i128 * 10_000_000_000_000_000i128 / mb as i128;
    normalize(na != nb, q, ea - eb - 16)
}

/// The multiplicative inverse `1 / f`.
pub fn invert(f: i64) -> XflResult {
    divide(one(), f)
}

/// Negate a float. Zero stays zero.
pub fn negate(f: i64) -> XflResult {
    match unpack(f)? {
        None => Ok(0),
        Some(_) => Ok(f ^ SIGN_BIT),
    }
}

fn signed_magnitude(v: Option<(bool, i32, i64)>) -> (i32, i32, i64) {
    match v {
        None => (0, 0, 0),
        Some((true, e, m)) => (-1, e, m),
        Some((false, e, m)) => (1, e, m),
    }
}

/// Compare two floats under a mode mask of `COMPARE_*` bits.
///
/// Returns 1 when the relation holds, 0 when it does not. A mode of zero,
/// any bit above GREATER, or the contradictory EQ|LT|GT combination is
/// `INVALID_ARGUMENT`.
pub fn compare(a: i64, b: i64, mode: u32) -> XflResult {
    if mode == 0
        || mode & !(COMPARE_EQUAL | COMPARE_LESS | COMPARE_GREATER) != 0
        || mode == COMPARE_EQUAL | COMPARE_LESS | COMPARE_GREATER
    {
        return Err(HookReturnCode::InvalidArgument);
    }
    let (sa, ea, ma) = signed_magnitude(unpack(a)?);
    let (sb, eb, mb) = signed_magnitude(unpack(b)?);
    let ord = if sa != sb {
        sa.cmp(&sb)
    } else if sa == 0 {
        std::cmp::Ordering::Equal
    } else {
        // Same nonzero sign: larger magnitude means larger value for
        // positives, smaller for negatives.
        let mag = (ea, ma).cmp(&(eb, mb));
        if sa > 0 { mag } else { mag.reverse() }
    };
    let hit = match ord {
        std::cmp::Ordering::Equal => mode & COMPARE_EQUAL != 0,
        std::cmp::Ordering::Less => mode & COMPARE_LESS != 0,
        std::cmp::Ordering::Greater => mode & COMPARE_GREATER != 0,
    };
    Ok(hit as i64)
}

/// The exponent of a float. Zero reports exponent 0.
pub fn exponent(f: i64) -> XflResult {
    match unpack(f)? {
        None => Ok(0),
        Some((_, e, _)) => Ok(e as i64),
    }
}

/// The mantissa of a float. Zero reports mantissa 0.
pub fn mantissa(f: i64) -> XflResult {
    match unpack(f)? {
        None => Ok(0),
        Some((_, _, m)) => Ok(m),
    }
}

/// 1 for negative, 0 for positive or zero.
pub fn sign(f: i64) -> XflResult {
    match unpack(f)? {
        None => Ok(0),
        Some((neg, _, _)) => Ok(neg as i64),
    }
}

/// Replace the exponent of a float.
pub fn exponent_set(f: i64, exponent: i32) -> XflResult {
    if exponent < EXPONENT_MIN {
        return Err(HookReturnCode::ExponentUndersized);
    }
    if exponent > EXPONENT_MAX {
        return Err(HookReturnCode::ExponentOversized);
    }
    match unpack(f)? {
        None => Ok(0),
        Some((neg, _, m)) => Ok(pack(neg, exponent, m)),
    }
}

/// Replace the mantissa of a float. The replacement must already be
/// normalized; zero collapses the float to canonical zero.
pub fn mantissa_set(f: i64, mantissa: i64) -> XflResult {
    if mantissa == 0 {
        return Ok(0);
    }
    if mantissa < MANTISSA_MIN {
        return Err(HookReturnCode::MantissaUndersized);
    }
    if mantissa > MANTISSA_MAX {
        return Err(HookReturnCode::MantissaOversized);
    }
    match unpack(f)? {
        None => Err(HookReturnCode::InvalidFloat),
        Some((neg, e, _)) => Ok(pack(neg, e, mantissa)),
    }
}

/// Replace the sign of a float.
pub fn sign_set(f: i64, negative: bool) -> XflResult {
    match unpack(f)? {
        None => Ok(0),
        Some((_, e, m)) => Ok(pack(negative, e, m)),
    }
}

/// Convert a float to an integer scaled by `10^decimal_places`.
///
/// Truncates toward zero. Negative inputs require `absolute`, otherwise
/// `CANT_RETURN_NEGATIVE`. Values that do not fit an `i64` are `TOO_BIG`.
pub fn int(f: i64, decimal_places: u32, absolute: bool) -> XflResult {
    if decimal_places > 15 {
        return Err(HookReturnCode::InvalidArgument);
    }
    let (neg, e, m) = match unpack(f)? {
        None => return Ok(0),
        Some(v) => v,
    };
    if neg && !absolute {
        return Err(HookReturnCode::CantReturnNegative);
    }
    let shift = e + decimal_places as i32;
    let value: i128 = if shift >= 0 {
        if shift > 3 {
            // mantissa >= 10^15, so four or more upward shifts always
            // exceed i64::MAX
            return Err(HookReturnCode::TooBig);
        }
        m as i128 * 10i128.pow(shift as u32)
    } else if shift < -16 {
        0
    } else {
        m as i128 / 10i128.pow((-shift) as u32)
    };
    if value > i64::MAX as i128 {
        return Err(HookReturnCode::TooBig);
    }
    Ok(value as i64)
}

/// Serialize a float into an AMOUNT field body.
///
/// Without an issue the float must be a non-negative integer (drop count);
/// the body is 8 big-endian bytes with the issued bit clear. With an issue
/// the body is 48 bytes: the enclosing number with the issued bit set,
/// then 20 bytes of currency and 20 bytes of issuer.
pub fn to_amount_bytes(f: i64, issue: Option<(&[u8; 20], &[u8; 20])>) -> Result<Vec<u8>, HookReturnCode> {
    match issue {
        None => {
            let drops = int(f, 0, false)?;
            Ok((drops as u64).to_be_bytes().to_vec())
        }
        Some((currency, issuer)) => {
            unpack(f)?;
            let mut out = Vec::with_capacity(48);
            out.extend_from_slice(&(f as u64 | ISSUED_BIT).to_be_bytes());
            out.extend_from_slice(currency);
            out.extend_from_slice(issuer);
            Ok(out)
        }
    }
}

/// Parse an AMOUNT field body back into a float.
pub fn from_amount_bytes(data: &[u8]) -> XflResult {
    match data.len() {
        8 => {
            let v = u64::from_be_bytes(data.try_into().unwrap());
            if v & ISSUED_BIT != 0 {
                return Err(HookReturnCode::NotAnAmount);
            }
            if v > i64::MAX as u64 {
                return Err(HookReturnCode::NotAnAmount);
            }
            new(0, v as i64)
        }
        48 => {
            let v = u64::from_be_bytes(data[..8].try_into().unwrap());
            if v & ISSUED_BIT == 0 {
                return Err(HookReturnCode::NotAnAmount);
            }
            let f = (v & !ISSUED_BIT) as i64;
            unpack(f)?;
            Ok(f)
        }
        _ => Err(HookReturnCode::NotAnAmount),
    }
}

/// True when an AMOUNT field body is in the 8-byte native form.
pub fn is_native_amount(data: &[u8]) -> bool {
    data.len() == 8 && data[0] & 0x80 == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonical_zero() {
        assert_eq!(new(0, 0).unwrap(), 0);
        assert_eq!(new(50, 0).unwrap(), 0);
    }

    #[test]
    fn test_new_normalizes() {
        // 5 = 5 * 10^0 -> mantissa 5*10^15, exponent -15
        let f = new(0, 5).unwrap();
        assert_eq!(mantissa(f).unwrap(), 5_000_000_000_000_000);
        assert_eq!(exponent(f).unwrap(), -15);
        assert_eq!(sign(f).unwrap(), 0);
    }

    #[test]
    fn test_set_roundtrip_law() {
        for (e, m) in [
            (0i32, 1i64),
            (-15, MANTISSA_MIN),
            (10, 1234),
            (-40, -987_654_321),
            (EXPONENT_MAX, MANTISSA_MAX),
        ] {
            let f = new(e, m).unwrap();
            let e2 = exponent(f).unwrap() as i32;
            let m2 = mantissa(f).unwrap() * if sign(f).unwrap() == 1 { -1 } else { 1 };
            assert_eq!(new(e2, m2).unwrap(), f, "set(exp, mant) must reproduce f");
        }
    }

    #[test]
    fn test_exponent_range_errors() {
        assert_eq!(new(100, 1), Err(HookReturnCode::ExponentOversized));
        assert_eq!(new(-120, MANTISSA_MIN), Err(HookReturnCode::ExponentUndersized));
    }

    #[test]
    fn test_negate_is_involution() {
        let f = new(-3, 7_250_000).unwrap();
        let n = negate(f).unwrap();
        assert_ne!(n, f);
        assert_eq!(negate(n).unwrap(), f);
        assert_eq!(negate(0).unwrap(), 0);
    }

    #[test]
    fn test_sum_basic() {
        let a = new(0, 2).unwrap();
        let b = new(0, 3).unwrap();
        assert_eq!(sum(a, b).unwrap(), new(0, 5).unwrap());
    }

    #[test]
    fn test_sum_cancellation() {
        let a = new(0, 42).unwrap();
        let b = negate(a).unwrap();
        assert_eq!(sum(a, b).unwrap(), 0);
    }

    #[test]
    fn test_sum_negligible_term() {
        let big = new(20, 1).unwrap();
        let tiny = new(-20, 1).unwrap();
        assert_eq!(sum(big, tiny).unwrap(), big);
    }

    #[test]
    fn test_multiply_zero_is_canonical_zero() {
        let f = new(5, 123).unwrap();
        assert_eq!(multiply(f, 0).unwrap(), 0);
        assert_eq!(multiply(0, f).unwrap(), 0);
    }

    #[test]
    fn test_multiply_basic() {
        let a = new(0, 3).unwrap();
        let b = new(0, 4).unwrap();
        assert_eq!(multiply(a, b).unwrap(), new(0, 12).unwrap());
    }

    #[test]
    fn test_multiply_signs() {
        let a = new(0, -3).unwrap();
        let b = new(0, 4).unwrap();
        assert_eq!(multiply(a, b).unwrap(), new(0, -12).unwrap());
        assert_eq!(multiply(a, a).unwrap(), new(0, 9).unwrap());
    }

    #[test]
    fn test_multiply_overflow() {
        let big = new(EXPONENT_MAX, MANTISSA_MAX).unwrap();
        assert_eq!(multiply(big, big), Err(HookReturnCode::Overflow));
    }

    #[test]
    fn test_divide() {
        let a = new(0, 10).unwrap();
        let b = new(0, 4).unwrap();
        // 10 / 4 = 2.5
        assert_eq!(divide(a, b).unwrap(), new(-1, 25).unwrap());
        assert_eq!(divide(a, 0), Err(HookReturnCode::DivisionByZero));
        assert_eq!(divide(0, b).unwrap(), 0);
    }

    #[test]
    fn test_invert() {
        let f = new(0, 4).unwrap();
        assert_eq!(invert(f).unwrap(), new(-2, 25).unwrap()); // 0.25
        assert_eq!(invert(0), Err(HookReturnCode::DivisionByZero));
    }

    #[test]
    fn test_mulratio() {
        let f = new(0, 100).unwrap();
        let two_thirds = mulratio(f, false, 2, 3).unwrap();
        assert_eq!(int(two_thirds, 0, false).unwrap(), 66);
        assert_eq!(mulratio(f, false, 3, 2).unwrap(), new(0, 150).unwrap());
        assert_eq!(mulratio(f, false, 1, 0), Err(HookReturnCode::DivisionByZero));
        assert_eq!(mulratio(0, false, 7, 9).unwrap(), 0);
    }

    #[test]
    fn test_mulratio_rounding() {
        let f = new(0, 1).unwrap();
        let down = mulratio(f, false, 1, 3).unwrap();
        let up = mulratio(f, true, 1, 3).unwrap();
        assert_eq!(compare(up, down, COMPARE_GREATER).unwrap(), 1);
    }

    #[test]
    fn test_compare_modes() {
        let a = new(0, 2).unwrap();
        let b = new(0, 3).unwrap();
        assert_eq!(compare(a, b, COMPARE_LESS).unwrap(), 1);
        assert_eq!(compare(a, b, COMPARE_GREATER).unwrap(), 0);
        assert_eq!(compare(a, a, COMPARE_EQUAL).unwrap(), 1);
        assert_eq!(compare(a, b, COMPARE_LESS | COMPARE_EQUAL).unwrap(), 1);
        assert_eq!(compare(a, b, COMPARE_LESS | COMPARE_GREATER).unwrap(), 1);
        assert_eq!(compare(a, a, COMPARE_LESS | COMPARE_GREATER).unwrap(), 0);
    }

    #[test]
    fn test_compare_signs_and_zero() {
        let pos = new(0, 1).unwrap();
        let neg = new(0, -1).unwrap();
        assert_eq!(compare(neg, pos, COMPARE_LESS).unwrap(), 1);
        assert_eq!(compare(neg, 0, COMPARE_LESS).unwrap(), 1);
        assert_eq!(compare(0, pos, COMPARE_LESS).unwrap(), 1);
        assert_eq!(compare(0, 0, COMPARE_EQUAL).unwrap(), 1);
    }

    #[test]
    fn test_compare_invalid_mode() {
        let a = new(0, 1).unwrap();
        assert_eq!(compare(a, a, 0), Err(HookReturnCode::InvalidArgument));
        assert_eq!(compare(a, a, 7), Err(HookReturnCode::InvalidArgument));
        assert_eq!(compare(a, a, 8), Err(HookReturnCode::InvalidArgument));
    }

    #[test]
    fn test_invalid_float_sentinel() {
        assert_eq!(sum(-10024, 0), Err(HookReturnCode::InvalidFloat));
        assert_eq!(negate(-1), Err(HookReturnCode::InvalidFloat));
    }

    #[test]
    fn test_one() {
        assert_eq!(int(one(), 0, false).unwrap(), 1);
        assert_eq!(multiply(one(), one()).unwrap(), one());
    }

    #[test]
    fn test_int_scaling() {
        let f = new(-2, 150).unwrap(); // 1.5
        assert_eq!(int(f, 0, false).unwrap(), 1);
        assert_eq!(int(f, 1, false).unwrap(), 15);
        assert_eq!(int(f, 3, false).unwrap(), 1500);
    }

    #[test]
    fn test_int_negative_requires_abs() {
        let f = new(0, -7).unwrap();
        assert_eq!(int(f, 0, false), Err(HookReturnCode::CantReturnNegative));
        assert_eq!(int(f, 0, true).unwrap(), 7);
    }

    #[test]
    fn test_int_limits() {
        let f = new(0, 1).unwrap();
        assert_eq!(int(f, 16, false), Err(HookReturnCode::InvalidArgument));
        let huge = new(30, 1).unwrap();
        assert_eq!(int(huge, 0, false), Err(HookReturnCode::TooBig));
    }

    #[test]
    fn test_mantissa_exponent_set() {
        let f = new(-15, MANTISSA_MIN).unwrap(); // 1.0
        let g = exponent_set(f, -14).unwrap(); // 10.0
        assert_eq!(int(g, 0, false).unwrap(), 10);
        assert_eq!(mantissa_set(f, 0).unwrap(), 0);
        assert_eq!(mantissa_set(f, 5), Err(HookReturnCode::MantissaUndersized));
        assert_eq!(
            mantissa_set(f, MANTISSA_MAX + 1),
            Err(HookReturnCode::MantissaOversized)
        );
    }

    #[test]
    fn test_sign_set() {
        let f = new(0, 3).unwrap();
        let n = sign_set(f, true).unwrap();
        assert_eq!(sign(n).unwrap(), 1);
        assert_eq!(sign_set(n, false).unwrap(), f);
        assert_eq!(sign_set(0, true).unwrap(), 0);
    }

    #[test]
    fn test_amount_bytes_native_roundtrip() {
        let f = new(0, 1_000_000).unwrap();
        let bytes = to_amount_bytes(f, None).unwrap();
        assert_eq!(bytes.len(), 8);
        assert!(is_native_amount(&bytes));
        assert_eq!(from_amount_bytes(&bytes).unwrap(), f);
    }

    #[test]
    fn test_amount_bytes_issued_roundtrip() {
        let currency = [0x55u8; 20];
        let issuer = [0x66u8; 20];
        let f = new(-3, -125).unwrap();
        let bytes = to_amount_bytes(f, Some((&currency, &issuer))).unwrap();
        assert_eq!(bytes.len(), 48);
        assert!(!is_native_amount(&bytes));
        assert_eq!(from_amount_bytes(&bytes).unwrap(), f);
    }

    #[test]
    fn test_amount_bytes_bad_lengths() {
        assert_eq!(from_amount_bytes(&[0u8; 7]), Err(HookReturnCode::NotAnAmount));
        assert_eq!(from_amount_bytes(&[0u8; 20]), Err(HookReturnCode::NotAnAmount));
    }
}
