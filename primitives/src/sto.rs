//! Canonical serialized-object codec.
//!
//! Ledger objects and transactions are flat sequences of fields. A field
//! starts with a 1–3 byte header carrying a type code and a field code
//! (a zero nibble defers the code to a following byte), followed by a
//! payload whose length is fixed by the type, length-prefixed, or — for
//! objects and arrays — delimited by an end marker. Integers are
//! big-endian.
//!
//! The `sto_*` operations work directly on these blobs and report
//! locations as `(offset, length)` pairs packed into an `i64` (low 32
//! bits = offset, high 32 bits = length).

use crate::error::HookReturnCode;
use crate::types::{AccountId, Hash256};

pub const TYPE_UINT16: u16 = 1;
pub const TYPE_UINT32: u16 = 2;
pub const TYPE_UINT64: u16 = 3;
pub const TYPE_HASH128: u16 = 4;
pub const TYPE_HASH256: u16 = 5;
pub const TYPE_AMOUNT: u16 = 6;
pub const TYPE_BLOB: u16 = 7;
pub const TYPE_ACCOUNT: u16 = 8;
pub const TYPE_OBJECT: u16 = 14;
pub const TYPE_ARRAY: u16 = 15;
pub const TYPE_UINT8: u16 = 16;
pub const TYPE_HASH160: u16 = 17;

/// Maximum nesting depth accepted by the parser.
const MAX_DEPTH: u32 = 10;

/// Maximum serialized-object size `sto_emplace` will produce.
pub const MAX_STO_LEN: usize = 16 * 1024;

/// A field identifier: type code in the high 16 bits, field code in the
/// low 16.
pub type FieldId = u32;

/// Build a field id from its type and field codes.
pub const fn field_id(type_code: u16, field_code: u16) -> FieldId {
    ((type_code as u32) << 16) | field_code as u32
}

/// The type code of a field id.
pub const fn type_of(id: FieldId) -> u16 {
    (id >> 16) as u16
}

/// The field code of a field id.
pub const fn code_of(id: FieldId) -> u16 {
    (id & 0xFFFF) as u16
}

/// Well-known fields used by the execution core.
pub mod field {
    use super::*;

    pub const TRANSACTION_TYPE: FieldId = field_id(TYPE_UINT16, 2);
    pub const FLAGS: FieldId = field_id(TYPE_UINT32, 2);
    pub const SEQUENCE: FieldId = field_id(TYPE_UINT32, 4);
    pub const EMIT_GENERATION: FieldId = field_id(TYPE_UINT32, 10);
    pub const EMIT_BURDEN: FieldId = field_id(TYPE_UINT64, 13);
    pub const EMIT_PARENT_TXN_ID: FieldId = field_id(TYPE_HASH256, 11);
    pub const EMIT_NONCE: FieldId = field_id(TYPE_HASH256, 12);
    pub const AMOUNT: FieldId = field_id(TYPE_AMOUNT, 1);
    pub const FEE: FieldId = field_id(TYPE_AMOUNT, 8);
    pub const ACCOUNT: FieldId = field_id(TYPE_ACCOUNT, 1);
    pub const DESTINATION: FieldId = field_id(TYPE_ACCOUNT, 3);
    pub const EMIT_CALLBACK: FieldId = field_id(TYPE_ACCOUNT, 11);
    pub const EMIT_DETAILS: FieldId = field_id(TYPE_OBJECT, 9);
}

/// A parsed field and its location within the containing blob.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Field {
    pub type_code: u16,
    pub field_code: u16,
    /// Offset of the field header.
    pub start: usize,
    /// Offset of the payload (past header and any length prefix).
    pub payload_start: usize,
    pub payload_len: usize,
    /// Offset one past the whole field, end markers included.
    pub end: usize,
}

impl Field {
    pub fn id(&self) -> FieldId {
        field_id(self.type_code, self.field_code)
    }

    /// Location reported to the guest: containers report the whole field,
    /// scalars report the payload.
    pub fn guest_range(&self) -> (usize, usize) {
        if self.type_code == TYPE_OBJECT || self.type_code == TYPE_ARRAY {
            (self.start, self.end - self.start)
        } else {
            (self.payload_start, self.payload_len)
        }
    }
}

/// Pack an `(offset, length)` pair into the host-call return convention.
pub fn pack_location(offset: usize, len: usize) -> i64 {
    ((len as i64) << 32) | offset as i64
}

fn decode_header(buf: &[u8], off: usize) -> Result<(u16, u16, usize), HookReturnCode> {
    let b0 = *buf.get(off).ok_or(HookReturnCode::ParseError)?;
    let mut type_code = (b0 >> 4) as u16;
    let mut field_code = (b0 & 0x0F) as u16;
    let mut len = 1;
    if type_code == 0 {
        type_code = *buf.get(off + len).ok_or(HookReturnCode::ParseError)? as u16;
        len += 1;
        if type_code < 16 {
            return Err(HookReturnCode::ParseError);
        }
    }
    if field_code == 0 {
        field_code = *buf.get(off + len).ok_or(HookReturnCode::ParseError)? as u16;
        len += 1;
        if field_code < 16 {
            return Err(HookReturnCode::ParseError);
        }
    }
    Ok((type_code, field_code, len))
}

fn encode_header(type_code: u16, field_code: u16, out: &mut Vec<u8>) {
    match (type_code < 16, field_code < 16) {
        (true, true) => out.push(((type_code as u8) << 4) | field_code as u8),
        (false, true) => {
            out.push(field_code as u8);
            out.push(type_code as u8);
        }
        (true, false) => {
            out.push((type_code as u8) << 4);
            out.push(field_code as u8);
        }
        (false, false) => {
            out.push(0);
            out.push(type_code as u8);
            out.push(field_code as u8);
        }
    }
}

fn decode_vl(buf: &[u8], off: usize) -> Result<(usize, usize), HookReturnCode> {
    let b0 = *buf.get(off).ok_or(HookReturnCode::ParseError)? as usize;
    if b0 <= 192 {
        Ok((b0, 1))
    } else if b0 <= 240 {
        let b1 = *buf.get(off + 1).ok_or(HookReturnCode::ParseError)? as usize;
        Ok((193 + (b0 - 193) * 256 + b1, 2))
    } else if b0 <= 254 {
        let b1 = *buf.get(off + 1).ok_or(HookReturnCode::ParseError)? as usize;
        let b2 = *buf.get(off + 2).ok_or(HookReturnCode::ParseError)? as usize;
        Ok((12481 + (b0 - 241) * 65536 + b1 * 256 + b2, 3))
    } else {
        Err(HookReturnCode::ParseError)
    }
}

fn encode_vl(len: usize, out: &mut Vec<u8>) {
    if len <= 192 {
        out.push(len as u8);
    } else if len <= 12480 {
        let v = len - 193;
        out.push(193 + (v / 256) as u8);
        out.push((v % 256) as u8);
    } else {
        let v = len - 12481;
        out.push(241 + (v / 65536) as u8);
        out.push(((v / 256) % 256) as u8);
        out.push((v % 256) as u8);
    }
}

/// Parse the field starting at `off`.
pub fn parse_field(buf: &[u8], off: usize) -> Result<Field, HookReturnCode> {
    parse_field_at_depth(buf, off, 0)
}

fn parse_field_at_depth(buf: &[u8], off: usize, depth: u32) -> Result<Field, HookReturnCode> {
    if depth > MAX_DEPTH {
        return Err(HookReturnCode::ParseError);
    }
    let (type_code, field_code, header_len) = decode_header(buf, off)?;
    let body = off + header_len;
    let take = |n: usize| -> Result<Field, HookReturnCode> {
        if body + n > buf.len() {
            return Err(HookReturnCode::ParseError);
        }
        Ok(Field {
            type_code,
            field_code,
            start: off,
            payload_start: body,
            payload_len: n,
            end: body + n,
        })
    };
    match type_code {
        TYPE_UINT8 => take(1),
        TYPE_UINT16 => take(2),
        TYPE_UINT32 => take(4),
        TYPE_UINT64 => take(8),
        TYPE_HASH128 => take(16),
        TYPE_HASH160 => take(20),
        TYPE_HASH256 => take(32),
        TYPE_AMOUNT => {
            let first = *buf.get(body).ok_or(HookReturnCode::ParseError)?;
            take(if first & 0x80 != 0 { 48 } else { 8 })
        }
        TYPE_BLOB | TYPE_ACCOUNT => {
            let (len, prefix) = decode_vl(buf, body)?;
            if body + prefix + len > buf.len() {
                return Err(HookReturnCode::ParseError);
            }
            Ok(Field {
                type_code,
                field_code,
                start: off,
                payload_start: body + prefix,
                payload_len: len,
                end: body + prefix + len,
            })
        }
        TYPE_OBJECT | TYPE_ARRAY => {
            let mut cursor = body;
            loop {
                let (t, f, hlen) = decode_header(buf, cursor)?;
                if t == type_code && f == 1 {
                    // end marker
                    return Ok(Field {
                        type_code,
                        field_code,
                        start: off,
                        payload_start: body,
                        payload_len: cursor - body,
                        end: cursor + hlen,
                    });
                }
                if type_code == TYPE_ARRAY && t != TYPE_OBJECT {
                    return Err(HookReturnCode::ParseError);
                }
                let inner = parse_field_at_depth(buf, cursor, depth + 1)?;
                cursor = inner.end;
            }
        }
        _ => Err(HookReturnCode::ParseError),
    }
}

/// Parse a blob as a top-level sequence of fields (an object body without
/// enclosing markers).
pub fn parse_fields(buf: &[u8]) -> Result<Vec<Field>, HookReturnCode> {
    let mut fields = Vec::new();
    let mut off = 0;
    while off < buf.len() {
        let f = parse_field(buf, off)?;
        off = f.end;
        fields.push(f);
    }
    Ok(fields)
}

/// Locate a top-level field by id.
pub fn subfield(buf: &[u8], id: FieldId) -> Result<(usize, usize), HookReturnCode> {
    for f in parse_fields(buf)? {
        if f.id() == id {
            return Ok(f.guest_range());
        }
    }
    Err(HookReturnCode::DoesntExist)
}

/// Locate the `index`-th element of an array.
///
/// Accepts either a full ARRAY field or a bare sequence of object
/// entries.
pub fn subarray(buf: &[u8], index: usize) -> Result<(usize, usize), HookReturnCode> {
    let top = parse_fields(buf).map_err(|_| HookReturnCode::NotAnArray)?;
    let elements: Vec<Field> = if top.len() == 1 && top[0].type_code == TYPE_ARRAY {
        let arr = top[0];
        let mut out = Vec::new();
        let mut off = arr.payload_start;
        while off < arr.payload_start + arr.payload_len {
            let f = parse_field(buf, off).map_err(|_| HookReturnCode::NotAnArray)?;
            off = f.end;
            out.push(f);
        }
        out
    } else if top.iter().all(|f| f.type_code == TYPE_OBJECT) {
        top
    } else {
        return Err(HookReturnCode::NotAnArray);
    };
    let f = elements.get(index).ok_or(HookReturnCode::DoesntExist)?;
    Ok((f.start, f.end - f.start))
}

/// Number of elements in an array blob (full ARRAY field or bare
/// sequence of object entries).
pub fn array_len(buf: &[u8]) -> Result<usize, HookReturnCode> {
    let top = parse_fields(buf).map_err(|_| HookReturnCode::NotAnArray)?;
    if top.len() == 1 && top[0].type_code == TYPE_ARRAY {
        let arr = top[0];
        let mut count = 0;
        let mut off = arr.payload_start;
        while off < arr.payload_start + arr.payload_len {
            let f = parse_field(buf, off).map_err(|_| HookReturnCode::NotAnArray)?;
            off = f.end;
            count += 1;
        }
        Ok(count)
    } else if !top.is_empty() && top.iter().all(|f| f.type_code == TYPE_OBJECT) {
        Ok(top.len())
    } else {
        Err(HookReturnCode::NotAnArray)
    }
}

/// Insert a field into a serialized object, maintaining canonical
/// `(type, field)` order. An existing field with the same id is replaced.
pub fn emplace(sto: &[u8], field_bytes: &[u8], id: FieldId) -> Result<Vec<u8>, HookReturnCode> {
    let candidate = parse_field(field_bytes, 0)?;
    if candidate.end != field_bytes.len() {
        return Err(HookReturnCode::ParseError);
    }
    if candidate.id() != id {
        return Err(HookReturnCode::InvalidArgument);
    }
    let fields = parse_fields(sto)?;
    let key = |f: &Field| (f.type_code, f.field_code);
    let new_key = (candidate.type_code, candidate.field_code);
    let mut out = Vec::with_capacity(sto.len() + field_bytes.len());
    let mut placed = false;
    for f in &fields {
        if f.id() == id {
            continue; // replaced
        }
        if !placed && key(f) > new_key {
            out.extend_from_slice(field_bytes);
            placed = true;
        }
        out.extend_from_slice(&sto[f.start..f.end]);
    }
    if !placed {
        out.extend_from_slice(field_bytes);
    }
    if out.len() > MAX_STO_LEN {
        return Err(HookReturnCode::TooBig);
    }
    Ok(out)
}

/// Remove a top-level field from a serialized object.
pub fn erase(sto: &[u8], id: FieldId) -> Result<Vec<u8>, HookReturnCode> {
    let fields = parse_fields(sto)?;
    if !fields.iter().any(|f| f.id() == id) {
        return Err(HookReturnCode::DoesntExist);
    }
    let mut out = Vec::with_capacity(sto.len());
    for f in &fields {
        if f.id() != id {
            out.extend_from_slice(&sto[f.start..f.end]);
        }
    }
    Ok(out)
}

/// 1 when the blob is a non-empty, well-formed field sequence, else 0.
pub fn validate(buf: &[u8]) -> i64 {
    if buf.is_empty() {
        return 0;
    }
    match parse_fields(buf) {
        Ok(_) => 1,
        Err(_) => 0,
    }
}

// ── Field encoders ──

pub fn encode_u8(field_code: u16, v: u8) -> Vec<u8> {
    let mut out = Vec::with_capacity(3);
    encode_header(TYPE_UINT8, field_code, &mut out);
    out.push(v);
    out
}

pub fn encode_u16(field_code: u16, v: u16) -> Vec<u8> {
    let mut out = Vec::with_capacity(3);
    encode_header(TYPE_UINT16, field_code, &mut out);
    out.extend_from_slice(&v.to_be_bytes());
    out
}

pub fn encode_u32(field_code: u16, v: u32) -> Vec<u8> {
    let mut out = Vec::with_capacity(5);
    encode_header(TYPE_UINT32, field_code, &mut out);
    out.extend_from_slice(&v.to_be_bytes());
    out
}

pub fn encode_u64(field_code: u16, v: u64) -> Vec<u8> {
    let mut out = Vec::with_capacity(9);
    encode_header(TYPE_UINT64, field_code, &mut out);
    out.extend_from_slice(&v.to_be_bytes());
    out
}

pub fn encode_h256(field_code: u16, v: &Hash256) -> Vec<u8> {
    let mut out = Vec::with_capacity(33);
    encode_header(TYPE_HASH256, field_code, &mut out);
    out.extend_from_slice(v);
    out
}

pub fn encode_amount(field_code: u16, body: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(1 + body.len());
    encode_header(TYPE_AMOUNT, field_code, &mut out);
    out.extend_from_slice(body);
    out
}

pub fn encode_blob(field_code: u16, data: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(4 + data.len());
    encode_header(TYPE_BLOB, field_code, &mut out);
    encode_vl(data.len(), &mut out);
    out.extend_from_slice(data);
    out
}

pub fn encode_account(field_code: u16, acc: &AccountId) -> Vec<u8> {
    let mut out = Vec::with_capacity(22);
    encode_header(TYPE_ACCOUNT, field_code, &mut out);
    encode_vl(20, &mut out);
    out.extend_from_slice(acc);
    out
}

pub fn encode_object(field_code: u16, inner: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(inner.len() + 2);
    encode_header(TYPE_OBJECT, field_code, &mut out);
    out.extend_from_slice(inner);
    encode_header(TYPE_OBJECT, 1, &mut out);
    out
}

pub fn encode_array(field_code: u16, elements: &[Vec<u8>]) -> Vec<u8> {
    let mut out = Vec::new();
    encode_header(TYPE_ARRAY, field_code, &mut out);
    for e in elements {
        out.extend_from_slice(e);
    }
    encode_header(TYPE_ARRAY, 1, &mut out);
    out
}

/// Read the big-endian payload of a located uint field.
pub fn read_uint(buf: &[u8], range: (usize, usize)) -> u64 {
    let (off, len) = range;
    let mut v = 0u64;
    for b in &buf[off..off + len] {
        v = (v << 8) | *b as u64;
    }
    v
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_roundtrip() {
        for (t, f) in [(1u16, 2u16), (6, 1), (14, 9), (16, 3), (17, 1), (16, 200), (5, 31)] {
            let mut buf = Vec::new();
            encode_header(t, f, &mut buf);
            let (t2, f2, len) = decode_header(&buf, 0).unwrap();
            assert_eq!((t2, f2), (t, f));
            assert_eq!(len, buf.len());
        }
    }

    #[test]
    fn test_vl_boundaries() {
        for len in [0usize, 1, 192, 193, 12480, 12481, 100_000] {
            let mut buf = Vec::new();
            encode_vl(len, &mut buf);
            let (len2, prefix) = decode_vl(&buf, 0).unwrap();
            assert_eq!(len2, len);
            assert_eq!(prefix, buf.len());
        }
    }

    #[test]
    fn test_subfield_scalar() {
        let mut blob = Vec::new();
        blob.extend(encode_u16(2, 0)); // TransactionType = Payment
        blob.extend(encode_u32(4, 7)); // Sequence
        let (off, len) = subfield(&blob, field::SEQUENCE).unwrap();
        assert_eq!(len, 4);
        assert_eq!(read_uint(&blob, (off, len)), 7);
    }

    #[test]
    fn test_subfield_missing() {
        let blob = encode_u16(2, 0);
        assert_eq!(subfield(&blob, field::SEQUENCE), Err(HookReturnCode::DoesntExist));
    }

    #[test]
    fn test_subfield_truncated_is_parse_error() {
        let mut blob = encode_u32(4, 7);
        blob.truncate(3);
        assert_eq!(subfield(&blob, field::SEQUENCE), Err(HookReturnCode::ParseError));
    }

    #[test]
    fn test_object_field_reports_whole_field() {
        let inner = encode_u32(10, 1);
        let obj = encode_object(9, &inner);
        let mut blob = encode_u16(2, 0);
        blob.extend(obj.clone());
        let (off, len) = subfield(&blob, field::EMIT_DETAILS).unwrap();
        assert_eq!(&blob[off..off + len], &obj[..]);
    }

    #[test]
    fn test_nested_object_subfield() {
        let inner: Vec<u8> = [encode_u32(10, 3), encode_u64(13, 99)].concat();
        let obj = encode_object(9, &inner);
        let field = parse_field(&obj, 0).unwrap();
        let body = &obj[field.payload_start..field.payload_start + field.payload_len];
        let (off, len) = subfield(body, field::EMIT_BURDEN).unwrap();
        assert_eq!(read_uint(body, (off, len)), 99);
    }

    #[test]
    fn test_emplace_then_subfield() {
        let blob = encode_u16(2, 0);
        let seq = encode_u32(4, 42);
        let out = emplace(&blob, &seq, field::SEQUENCE).unwrap();
        let (off, len) = subfield(&out, field::SEQUENCE).unwrap();
        assert_eq!(read_uint(&out, (off, len)), 42);
    }

    #[test]
    fn test_emplace_keeps_canonical_order() {
        // Insert a UINT16 (type 1) after the object already holds a UINT32
        // (type 2): the new field must sort first.
        let blob = encode_u32(4, 7);
        let tt = encode_u16(2, 0);
        let out = emplace(&blob, &tt, field::TRANSACTION_TYPE).unwrap();
        let fields = parse_fields(&out).unwrap();
        assert_eq!(fields[0].id(), field::TRANSACTION_TYPE);
        assert_eq!(fields[1].id(), field::SEQUENCE);
    }

    #[test]
    fn test_emplace_replaces_existing() {
        let blob = encode_u32(4, 7);
        let out = emplace(&blob, &encode_u32(4, 9), field::SEQUENCE).unwrap();
        let (off, len) = subfield(&out, field::SEQUENCE).unwrap();
        assert_eq!(read_uint(&out, (off, len)), 9);
        assert_eq!(parse_fields(&out).unwrap().len(), 1);
    }

    #[test]
    fn test_emplace_id_mismatch() {
        let blob = encode_u16(2, 0);
        let seq = encode_u32(4, 42);
        assert_eq!(
            emplace(&blob, &seq, field::FLAGS),
            Err(HookReturnCode::InvalidArgument)
        );
    }

    #[test]
    fn test_erase() {
        let mut blob = encode_u16(2, 0);
        blob.extend(encode_u32(4, 7));
        let out = erase(&blob, field::TRANSACTION_TYPE).unwrap();
        assert_eq!(parse_fields(&out).unwrap().len(), 1);
        assert_eq!(erase(&out, field::TRANSACTION_TYPE), Err(HookReturnCode::DoesntExist));
    }

    #[test]
    fn test_erase_only_field_yields_empty() {
        let blob = encode_u16(2, 0);
        let out = erase(&blob, field::TRANSACTION_TYPE).unwrap();
        assert!(out.is_empty());
    }

    #[test]
    fn test_subarray() {
        let e0 = encode_object(2, &encode_u32(10, 0));
        let e1 = encode_object(2, &encode_u32(10, 1));
        let arr = encode_array(4, &[e0.clone(), e1.clone()]);
        let (off, len) = subarray(&arr, 0).unwrap();
        assert_eq!(&arr[off..off + len], &e0[..]);
        let (off, len) = subarray(&arr, 1).unwrap();
        assert_eq!(&arr[off..off + len], &e1[..]);
        assert_eq!(subarray(&arr, 2), Err(HookReturnCode::DoesntExist));
    }

    #[test]
    fn test_array_len() {
        let e0 = encode_object(2, &encode_u32(10, 0));
        let e1 = encode_object(2, &encode_u32(10, 1));
        let arr = encode_array(4, &[e0, e1]);
        assert_eq!(array_len(&arr).unwrap(), 2);
        assert_eq!(array_len(&encode_u16(2, 0)), Err(HookReturnCode::NotAnArray));
    }

    #[test]
    fn test_subarray_not_an_array() {
        let blob = encode_u16(2, 0);
        assert_eq!(subarray(&blob, 0), Err(HookReturnCode::NotAnArray));
    }

    #[test]
    fn test_validate() {
        let mut blob = encode_u16(2, 0);
        blob.extend(encode_account(1, &[7u8; 20]));
        assert_eq!(validate(&blob), 1);
        blob.pop();
        assert_eq!(validate(&blob), 0);
        assert_eq!(validate(&[]), 0);
    }

    #[test]
    fn test_amount_native_and_issued_sizes() {
        let native = encode_amount(1, &[0u8; 8]);
        let f = parse_field(&native, 0).unwrap();
        assert_eq!(f.payload_len, 8);

        let mut issued_body = vec![0x80u8];
        issued_body.extend_from_slice(&[0u8; 47]);
        let issued = encode_amount(1, &issued_body);
        let f = parse_field(&issued, 0).unwrap();
        assert_eq!(f.payload_len, 48);
    }

    #[test]
    fn test_pack_location() {
        let packed = pack_location(10, 32);
        assert_eq!(packed & 0xFFFF_FFFF, 10);
        assert_eq!(packed >> 32, 32);
        assert!(packed > 0);
    }
}
