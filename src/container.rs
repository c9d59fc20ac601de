//! Arrays and maps in their definite and indefinite forms.
//!
//! Both forms are immutable once built. Indefinite containers are assembled
//! with [`ArrayBuilder`] / [`MapBuilder`] and frozen by `finish`.

use crate::length::{Length, encode_length};
use crate::object::CborObject;
use crate::value::Value;
use crate::{CborError, Result};
use std::collections::BTreeMap;

/// Definite-length array.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Array {
    items: Vec<CborObject>,
}

impl Array {
    pub fn new(items: Vec<CborObject>) -> Self {
        Array { items }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&CborObject> {
        self.items.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, CborObject> {
        self.items.iter()
    }

    pub fn into_items(self) -> Vec<CborObject> {
        self.items
    }

    /// Header derived from the item count.
    pub fn header(&self) -> Length {
        encode_length(self.items.len() as u64)
    }
}

/// Array terminated by a break marker instead of a length prefix.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IndefiniteArray {
    items: Vec<CborObject>,
}

impl IndefiniteArray {
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&CborObject> {
        self.items.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, CborObject> {
        self.items.iter()
    }

    pub fn into_items(self) -> Vec<CborObject> {
        self.items
    }
}

/// One key/value pair of a map.
#[derive(Debug, Clone, PartialEq)]
pub struct MapEntry {
    key: CborObject,
    value: CborObject,
}

impl MapEntry {
    pub fn new(key: CborObject, value: CborObject) -> Self {
        MapEntry { key, value }
    }

    pub fn key(&self) -> &CborObject {
        &self.key
    }

    pub fn value(&self) -> &CborObject {
        &self.value
    }

    pub fn into_pair(self) -> (CborObject, CborObject) {
        (self.key, self.value)
    }
}

// Insertion-ordered entries, unique by normalized key.
#[derive(Debug, Clone, Default, PartialEq)]
struct Entries {
    entries: Vec<MapEntry>,
    index: BTreeMap<Value, usize>,
}

impl Entries {
    fn insert(&mut self, entry: MapEntry) -> Option<MapEntry> {
        let identity = entry.key.normalize(false);
        match self.index.get(&identity) {
            Some(&position) => Some(std::mem::replace(&mut self.entries[position], entry)),
            None => {
                self.index.insert(identity, self.entries.len());
                self.entries.push(entry);
                None
            }
        }
    }

    fn get(&self, key: &CborObject) -> Option<&CborObject> {
        self.index
            .get(&key.normalize(false))
            .map(|&position| &self.entries[position].value)
    }

    fn contains_key(&self, key: &CborObject) -> bool {
        self.index.contains_key(&key.normalize(false))
    }

    // Later entries shift down one place, so their indexed positions do too.
    fn remove(&mut self, key: &CborObject) -> Option<MapEntry> {
        let position = self.index.remove(&key.normalize(false))?;
        for later in self.index.values_mut() {
            if *later > position {
                *later -= 1;
            }
        }
        Some(self.entries.remove(position))
    }
}

impl FromIterator<MapEntry> for Entries {
    fn from_iter<I: IntoIterator<Item = MapEntry>>(iter: I) -> Self {
        let mut entries = Entries::default();
        for entry in iter {
            entries.insert(entry);
        }
        entries
    }
}

/// Definite-length map.
///
/// Entries keep insertion order; two keys whose normalized values are equal
/// are the same entry and the later one replaces the earlier in place.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Map {
    entries: Entries,
}

impl Map {
    pub fn new(entries: impl IntoIterator<Item = MapEntry>) -> Self {
        Map {
            entries: entries.into_iter().collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.entries.is_empty()
    }

    /// Looks a value up by normalized key identity.
    pub fn get(&self, key: &CborObject) -> Option<&CborObject> {
        self.entries.get(key)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, MapEntry> {
        self.entries.entries.iter()
    }

    pub fn into_entries(self) -> Vec<MapEntry> {
        self.entries.entries
    }

    /// Header derived from the entry count.
    pub fn header(&self) -> Length {
        encode_length(self.len() as u64)
    }
}

/// Map terminated by a break marker instead of a length prefix.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IndefiniteMap {
    entries: Entries,
}

impl IndefiniteMap {
    pub fn len(&self) -> usize {
        self.entries.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.entries.is_empty()
    }

    pub fn get(&self, key: &CborObject) -> Option<&CborObject> {
        self.entries.get(key)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, MapEntry> {
        self.entries.entries.iter()
    }

    pub fn into_entries(self) -> Vec<MapEntry> {
        self.entries.entries
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Form {
    Definite(Option<u64>),
    Indefinite,
}

impl Form {
    fn declare(&mut self, len: u64) -> Result<()> {
        match self {
            Form::Indefinite => Err(CborError::ConstructionError(
                "cannot give a length to an indefinite container".to_string(),
            )),
            Form::Definite(declared) => {
                *declared = Some(len);
                Ok(())
            }
        }
    }

    fn check(&self, actual: usize) -> Result<()> {
        match self {
            Form::Definite(Some(declared)) if *declared != actual as u64 => {
                Err(CborError::ConstructionError(format!(
                    "declared {declared} items but {actual} were added"
                )))
            }
            _ => Ok(()),
        }
    }
}

/// Collects array items incrementally, then freezes them into a
/// [`CborObject::Array`] or [`CborObject::IndefiniteArray`].
#[derive(Debug, Clone)]
pub struct ArrayBuilder {
    items: Vec<CborObject>,
    form: Form,
}

impl ArrayBuilder {
    /// A builder for a definite array whose length is taken from the items.
    pub fn definite() -> Self {
        ArrayBuilder {
            items: Vec::new(),
            form: Form::Definite(None),
        }
    }

    pub fn indefinite() -> Self {
        ArrayBuilder {
            items: Vec::new(),
            form: Form::Indefinite,
        }
    }

    /// Fixes the number of items `finish` will accept. Fails on an
    /// indefinite builder.
    pub fn declare_length(&mut self, len: u64) -> Result<()> {
        self.form.declare(len)
    }

    pub fn push(&mut self, item: CborObject) -> &mut Self {
        self.items.push(item);
        self
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn is_indefinite(&self) -> bool {
        self.form == Form::Indefinite
    }

    pub fn finish(self) -> Result<CborObject> {
        self.form.check(self.items.len())?;
        Ok(match self.form {
            Form::Definite(_) => CborObject::Array(Array::new(self.items)),
            Form::Indefinite => CborObject::IndefiniteArray(IndefiniteArray { items: self.items }),
        })
    }
}

/// Collects map entries incrementally, then freezes them into a
/// [`CborObject::Map`] or [`CborObject::IndefiniteMap`].
#[derive(Debug, Clone)]
pub struct MapBuilder {
    entries: Entries,
    form: Form,
}

impl MapBuilder {
    pub fn definite() -> Self {
        MapBuilder {
            entries: Entries::default(),
            form: Form::Definite(None),
        }
    }

    pub fn indefinite() -> Self {
        MapBuilder {
            entries: Entries::default(),
            form: Form::Indefinite,
        }
    }

    pub fn declare_length(&mut self, len: u64) -> Result<()> {
        self.form.declare(len)
    }

    /// Adds an entry, returning the one it replaced if the key was already
    /// present.
    pub fn insert(&mut self, key: CborObject, value: CborObject) -> Option<MapEntry> {
        self.entries.insert(MapEntry::new(key, value))
    }

    pub fn get(&self, key: &CborObject) -> Option<&CborObject> {
        self.entries.get(key)
    }

    /// True if an entry's key normalizes equal to `key`.
    pub fn contains_key(&self, key: &CborObject) -> bool {
        self.entries.contains_key(key)
    }

    /// Removes the entry whose key normalizes equal to `key`. The remaining
    /// entries keep their relative order.
    pub fn remove(&mut self, key: &CborObject) -> Option<MapEntry> {
        self.entries.remove(key)
    }

    pub fn len(&self) -> usize {
        self.entries.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.entries.is_empty()
    }

    pub fn is_indefinite(&self) -> bool {
        self.form == Form::Indefinite
    }

    pub fn finish(self) -> Result<CborObject> {
        self.form.check(self.len())?;
        Ok(match self.form {
            Form::Definite(_) => CborObject::Map(Map {
                entries: self.entries,
            }),
            Form::Indefinite => CborObject::IndefiniteMap(IndefiniteMap {
                entries: self.entries,
            }),
        })
    }
}
