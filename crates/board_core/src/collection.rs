/// A record addressable by its backend-issued identifier.
pub trait Keyed {
    fn record_id(&self) -> &str;
}

/// The client's currently rendered set of records for one query scope.
///
/// After a resynchronizer pass the view equals the backend's authoritative
/// set; between passes it may carry provisional local mutations. The only
/// wholesale entry point is `replace_all`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionView<R> {
    records: Vec<R>,
}

impl<R> Default for CollectionView<R> {
    fn default() -> Self {
        Self {
            records: Vec::new(),
        }
    }
}

impl<R: Keyed> CollectionView<R> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[R] {
        &self.records
    }

    pub fn get(&self, id: &str) -> Option<&R> {
        self.records.iter().find(|record| record.record_id() == id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.get(id).is_some()
    }

    /// Replaces the whole view with an authoritative record set.
    pub fn replace_all(&mut self, records: Vec<R>) {
        self.records = records;
    }

    /// Replaces the record with `id` in place, preserving its position.
    /// Returns false when the record is not present.
    pub(crate) fn replace_record(&mut self, id: &str, record: R) -> bool {
        match self
            .records
            .iter_mut()
            .find(|existing| existing.record_id() == id)
        {
            Some(slot) => {
                *slot = record;
                true
            }
            None => false,
        }
    }
}
