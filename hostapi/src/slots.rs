//! Slot table: numbered views over deserialized ledger objects.
//!
//! A slot holds shared ownership of a serialized object and a view into
//! it. Sub-slots produced by `subfield`/`subarray` share the parent's
//! storage, so clearing the parent never invalidates a child. Slot
//! numbers are 1..=255; freed numbers are reused LIFO before the
//! high-water counter advances.

use std::collections::BTreeMap;
use std::sync::Arc;

use hookvm_primitives::error::{HookError, HookReturnCode};
use hookvm_primitives::float;
use hookvm_primitives::sto;

/// One slot: an identifier, the owning storage, and the current view.
#[derive(Debug, Clone)]
pub struct SlotEntry {
    /// The keylet or hash the object was loaded under.
    pub id: Vec<u8>,
    pub storage: Arc<Vec<u8>>,
    /// View into `storage` as (offset, length).
    pub view: (usize, usize),
}

impl SlotEntry {
    pub fn bytes(&self) -> &[u8] {
        &self.storage[self.view.0..self.view.0 + self.view.1]
    }
}

/// Fixed-capacity slot directory.
#[derive(Debug, Clone, Default)]
pub struct SlotTable {
    slots: BTreeMap<u32, SlotEntry>,
    free: Vec<u32>,
    high_water: u32,
    capacity: u32,
}

impl SlotTable {
    pub fn new(capacity: u32) -> Self {
        Self {
            slots: BTreeMap::new(),
            free: Vec::new(),
            high_water: 0,
            capacity,
        }
    }

    fn allocate(&mut self) -> Result<u32, HookError> {
        // A freed number may have been reoccupied by an explicit set in
        // the meantime; skip stale free-list entries.
        while let Some(n) = self.free.pop() {
            if !self.slots.contains_key(&n) {
                return Ok(n);
            }
        }
        while self.high_water < self.capacity {
            self.high_water += 1;
            if !self.slots.contains_key(&self.high_water) {
                return Ok(self.high_water);
            }
        }
        Err(HookReturnCode::NoFreeSlots.into())
    }

    fn place(&mut self, slot_no: u32, entry: SlotEntry) -> Result<u32, HookError> {
        let n = match slot_no {
            0 => self.allocate()?,
            n if n <= self.capacity => n,
            _ => return Err(HookReturnCode::InvalidArgument.into()),
        };
        self.slots.insert(n, entry);
        Ok(n)
    }

    /// Load an object into a slot. Slot 0 allocates; a nonzero slot
    /// overwrites that position.
    pub fn set(&mut self, id: Vec<u8>, data: Vec<u8>, slot_no: u32) -> Result<u32, HookError> {
        let len = data.len();
        let entry = SlotEntry {
            id,
            storage: Arc::new(data),
            view: (0, len),
        };
        self.place(slot_no, entry)
    }

    /// Free a slot for LIFO reuse.
    pub fn clear(&mut self, slot_no: u32) -> Result<(), HookError> {
        if self.slots.remove(&slot_no).is_none() {
            return Err(HookReturnCode::DoesntExist.into());
        }
        self.free.push(slot_no);
        Ok(())
    }

    pub fn get(&self, slot_no: u32) -> Option<&SlotEntry> {
        self.slots.get(&slot_no)
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Serialized byte length of the slot's view.
    pub fn size(&self, slot_no: u32) -> Result<usize, HookError> {
        self.get(slot_no)
            .map(|e| e.view.1)
            .ok_or_else(|| HookReturnCode::DoesntExist.into())
    }

    /// Number of elements when the view is an array.
    pub fn count(&self, slot_no: u32) -> Result<usize, HookError> {
        let entry = self.get(slot_no).ok_or(HookReturnCode::DoesntExist)?;
        sto::array_len(entry.bytes()).map_err(HookError::from)
    }

    /// The view narrowed to the body fields when the view is a single
    /// object field, otherwise the view itself.
    fn body_range(&self, entry: &SlotEntry) -> Result<(usize, usize), HookError> {
        let bytes = entry.bytes();
        let fields = sto::parse_fields(bytes).map_err(HookError::from)?;
        if fields.len() == 1 && fields[0].type_code == sto::TYPE_OBJECT {
            let f = fields[0];
            Ok((entry.view.0 + f.payload_start, f.payload_len))
        } else {
            Ok(entry.view)
        }
    }

    /// Create (or overwrite) a slot viewing a field of the parent.
    /// Shares the parent's storage.
    pub fn subfield(
        &mut self,
        parent: u32,
        field_id: sto::FieldId,
        new_slot: u32,
    ) -> Result<u32, HookError> {
        let entry = self.get(parent).ok_or(HookReturnCode::DoesntExist)?.clone();
        let (body_off, body_len) = self.body_range(&entry)?;
        let body = &entry.storage[body_off..body_off + body_len];
        // Containers keep their markers so the child stays parseable;
        // locate the whole field rather than the guest payload range.
        let fields = sto::parse_fields(body).map_err(HookError::from)?;
        let found = fields
            .iter()
            .find(|f| f.id() == field_id)
            .ok_or(HookReturnCode::DoesntExist)?;
        let child = SlotEntry {
            id: entry.id.clone(),
            storage: Arc::clone(&entry.storage),
            view: (body_off + found.start, found.end - found.start),
        };
        self.place(new_slot, child)
    }

    /// Create (or overwrite) a slot viewing an array element of the
    /// parent. Shares the parent's storage.
    pub fn subarray(
        &mut self,
        parent: u32,
        index: usize,
        new_slot: u32,
    ) -> Result<u32, HookError> {
        let entry = self.get(parent).ok_or(HookReturnCode::DoesntExist)?.clone();
        let (off, len) = sto::subarray(entry.bytes(), index).map_err(HookError::from)?;
        let child = SlotEntry {
            id: entry.id.clone(),
            storage: Arc::clone(&entry.storage),
            view: (entry.view.0 + off, len),
        };
        self.place(new_slot, child)
    }

    /// The type tag of the slot's content: the type code of a single
    /// field, or OBJECT for a multi-field body.
    pub fn type_tag(&self, slot_no: u32) -> Result<u16, HookError> {
        let entry = self.get(slot_no).ok_or(HookReturnCode::DoesntExist)?;
        let fields = sto::parse_fields(entry.bytes()).map_err(HookError::from)?;
        match fields.len() {
            1 => Ok(fields[0].type_code),
            _ => Ok(sto::TYPE_OBJECT),
        }
    }

    /// Whether the slot's view is a native (non-issued) amount.
    pub fn is_native_amount(&self, slot_no: u32) -> Result<bool, HookError> {
        let entry = self.get(slot_no).ok_or(HookReturnCode::DoesntExist)?;
        let bytes = entry.bytes();
        let fields = sto::parse_fields(bytes).map_err(HookError::from)?;
        if fields.len() != 1 || fields[0].type_code != sto::TYPE_AMOUNT {
            return Err(HookReturnCode::NotAnAmount.into());
        }
        let f = fields[0];
        Ok(float::is_native_amount(&bytes[f.payload_start..f.payload_start + f.payload_len]))
    }

    /// Parse the slot's amount field into a decimal float.
    pub fn as_float(&self, slot_no: u32) -> Result<i64, HookError> {
        let entry = self.get(slot_no).ok_or(HookReturnCode::DoesntExist)?;
        let bytes = entry.bytes();
        let fields = sto::parse_fields(bytes).map_err(HookError::from)?;
        if fields.len() != 1 || fields[0].type_code != sto::TYPE_AMOUNT {
            return Err(HookReturnCode::NotAnAmount.into());
        }
        let f = fields[0];
        float::from_amount_bytes(&bytes[f.payload_start..f.payload_start + f.payload_len])
            .map_err(HookError::from)
    }
}
