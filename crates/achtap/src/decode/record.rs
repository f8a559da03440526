use std::collections::BTreeMap;

/// One decoded group: field number -> scalar value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Record {
    fields: BTreeMap<u32, u32>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, field: u32, value: u32) {
        self.fields.insert(field, value);
    }

    pub fn get(&self, field: u32) -> Option<u32> {
        self.fields.get(&field).copied()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Fields in ascending field-number order.
    pub fn iter(&self) -> impl Iterator<Item = (u32, u32)> + '_ {
        self.fields.iter().map(|(field, value)| (*field, *value))
    }
}

impl FromIterator<(u32, u32)> for Record {
    fn from_iter<I: IntoIterator<Item = (u32, u32)>>(iter: I) -> Self {
        Self {
            fields: iter.into_iter().collect(),
        }
    }
}

/// All records collected from one decode pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SampleSet {
    records: Vec<Record>,
}

impl SampleSet {
    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Record> {
        self.records.iter()
    }
}

impl From<Vec<Record>> for SampleSet {
    fn from(records: Vec<Record>) -> Self {
        Self { records }
    }
}

impl FromIterator<Record> for SampleSet {
    fn from_iter<I: IntoIterator<Item = Record>>(iter: I) -> Self {
        Self {
            records: iter.into_iter().collect(),
        }
    }
}

impl<'a> IntoIterator for &'a SampleSet {
    type Item = &'a Record;
    type IntoIter = std::slice::Iter<'a, Record>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}
