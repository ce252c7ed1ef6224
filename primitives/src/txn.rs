//! Transaction access over canonical serialized blobs.
//!
//! The core never owns a rich transaction model; it reads the fields it
//! needs straight out of the serialized form. `TxnView` wraps a blob and
//! answers the questions the host API and the stakeholder table ask.
//! `TxnBuilder` assembles well-formed blobs in canonical field order.

use crate::crypto::sha512h_concat;
use crate::error::HookReturnCode;
use crate::sto::{self, field};
use crate::types::{AccountId, Hash256, TxType};

/// Domain separator for transaction ids.
const TXN_ID_PREFIX: &[u8] = b"TXN\0";

/// Emission metadata embedded in an emitted transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmitDetails {
    pub generation: u32,
    pub burden: u64,
    pub parent_txn_id: Hash256,
    pub nonce: Hash256,
    pub callback: AccountId,
}

impl EmitDetails {
    /// Serialize as the EmitDetails object field.
    pub fn to_bytes(&self) -> Vec<u8> {
        let inner: Vec<u8> = [
            sto::encode_u32(sto::code_of(field::EMIT_GENERATION), self.generation),
            sto::encode_u64(sto::code_of(field::EMIT_BURDEN), self.burden),
            sto::encode_h256(sto::code_of(field::EMIT_PARENT_TXN_ID), &self.parent_txn_id),
            sto::encode_h256(sto::code_of(field::EMIT_NONCE), &self.nonce),
            sto::encode_account(sto::code_of(field::EMIT_CALLBACK), &self.callback),
        ]
        .concat();
        sto::encode_object(sto::code_of(field::EMIT_DETAILS), &inner)
    }

    /// Parse from the payload of an EmitDetails object field.
    pub fn from_object_body(body: &[u8]) -> Result<Self, HookReturnCode> {
        let generation = sto::subfield(body, field::EMIT_GENERATION)
            .map(|r| sto::read_uint(body, r) as u32)?;
        let burden = sto::subfield(body, field::EMIT_BURDEN).map(|r| sto::read_uint(body, r))?;
        let parent = sto::subfield(body, field::EMIT_PARENT_TXN_ID)?;
        let nonce = sto::subfield(body, field::EMIT_NONCE)?;
        let callback = sto::subfield(body, field::EMIT_CALLBACK)?;
        if parent.1 != 32 || nonce.1 != 32 || callback.1 != 20 {
            return Err(HookReturnCode::ParseError);
        }
        Ok(Self {
            generation,
            burden,
            parent_txn_id: body[parent.0..parent.0 + 32].try_into().unwrap(),
            nonce: body[nonce.0..nonce.0 + 32].try_into().unwrap(),
            callback: body[callback.0..callback.0 + 20].try_into().unwrap(),
        })
    }
}

/// Read-only view over a serialized transaction.
#[derive(Debug, Clone, Copy)]
pub struct TxnView<'a> {
    blob: &'a [u8],
}

impl<'a> TxnView<'a> {
    pub fn new(blob: &'a [u8]) -> Self {
        Self { blob }
    }

    pub fn bytes(&self) -> &'a [u8] {
        self.blob
    }

    /// The transaction id: SHA-512/256 over a domain prefix and the blob.
    pub fn txn_id(&self) -> Hash256 {
        sha512h_concat(&[TXN_ID_PREFIX, self.blob])
    }

    pub fn txn_type(&self) -> Result<TxType, HookReturnCode> {
        let range = sto::subfield(self.blob, field::TRANSACTION_TYPE)?;
        TxType::from_u16(sto::read_uint(self.blob, range) as u16)
            .ok_or(HookReturnCode::InvalidField)
    }

    fn account_field(&self, id: sto::FieldId) -> Result<AccountId, HookReturnCode> {
        let (off, len) = sto::subfield(self.blob, id)?;
        if len != 20 {
            return Err(HookReturnCode::InvalidAccount);
        }
        Ok(self.blob[off..off + 20].try_into().unwrap())
    }

    /// The sending account.
    pub fn account(&self) -> Result<AccountId, HookReturnCode> {
        self.account_field(field::ACCOUNT)
    }

    /// The destination account, when the transaction carries one.
    pub fn destination(&self) -> Option<AccountId> {
        self.account_field(field::DESTINATION).ok()
    }

    /// The emission metadata, when this is an emitted transaction.
    pub fn emit_details(&self) -> Option<EmitDetails> {
        let (off, _) = sto::subfield(self.blob, field::EMIT_DETAILS).ok()?;
        let f = sto::parse_field(self.blob, off).ok()?;
        let body = &self.blob[f.payload_start..f.payload_start + f.payload_len];
        EmitDetails::from_object_body(body).ok()
    }

    pub fn is_emitted(&self) -> bool {
        sto::subfield(self.blob, field::EMIT_DETAILS).is_ok()
    }
}

/// Canonical transaction assembly for tests and emission templates.
#[derive(Debug, Default, Clone)]
pub struct TxnBuilder {
    fields: Vec<Vec<u8>>,
}

impl TxnBuilder {
    pub fn new(txn_type: TxType) -> Self {
        Self {
            fields: vec![sto::encode_u16(
                sto::code_of(field::TRANSACTION_TYPE),
                txn_type.as_u16(),
            )],
        }
    }

    pub fn sequence(mut self, seq: u32) -> Self {
        self.fields
            .push(sto::encode_u32(sto::code_of(field::SEQUENCE), seq));
        self
    }

    pub fn account(mut self, acc: &AccountId) -> Self {
        self.fields
            .push(sto::encode_account(sto::code_of(field::ACCOUNT), acc));
        self
    }

    pub fn destination(mut self, acc: &AccountId) -> Self {
        self.fields
            .push(sto::encode_account(sto::code_of(field::DESTINATION), acc));
        self
    }

    pub fn amount_drops(mut self, drops: u64) -> Self {
        self.fields.push(sto::encode_amount(
            sto::code_of(field::AMOUNT),
            &drops.to_be_bytes(),
        ));
        self
    }

    pub fn fee_drops(mut self, drops: u64) -> Self {
        self.fields.push(sto::encode_amount(
            sto::code_of(field::FEE),
            &drops.to_be_bytes(),
        ));
        self
    }

    pub fn emit_details(mut self, details: &EmitDetails) -> Self {
        self.fields.push(details.to_bytes());
        self
    }

    /// Serialize in canonical `(type, field)` order.
    pub fn build(mut self) -> Vec<u8> {
        self.fields.sort_by_key(|f| {
            let parsed = sto::parse_field(f, 0).expect("builder fields are well-formed");
            (parsed.type_code, parsed.field_code)
        });
        self.fields.concat()
    }
}
