use hashbrown::HashMap;
use hashbrown::hash_map::EntryRef;

/// Running aggregate for one key, all figures in integer tenths.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Record {
    pub count: u64,
    pub sum: i64,
    pub min: i32,
    pub max: i32,
}

impl Record {
    /// Aggregate of a single observation.
    #[inline]
    pub fn new(value: i32) -> Self {
        Record {
            count: 1,
            sum: value as i64,
            min: value,
            max: value,
        }
    }

    /// Fold one more observation in.
    #[inline]
    pub fn observe(&mut self, value: i32) {
        self.count += 1;
        self.sum += value as i64;
        self.min = self.min.min(value);
        self.max = self.max.max(value);
    }

    /// Fold another aggregate of the same key in. Commutative and associative.
    #[inline]
    pub fn combine(&mut self, other: &Record) {
        self.count += other.count;
        self.sum += other.sum;
        self.min = self.min.min(other.min);
        self.max = self.max.max(other.max);
    }
}

/// Initial slot count for a map; comfortably above typical key cardinality.
const MAP_CAPACITY: usize = 1024;

/// Key → Record map. Keys are owned copies of the raw key bytes, so a map
/// outlives the chunk buffer it was built from.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StationMap {
    entries: HashMap<Box<[u8]>, Record>,
}

impl StationMap {
    pub fn new() -> Self {
        StationMap {
            entries: HashMap::with_capacity(MAP_CAPACITY),
        }
    }

    /// Record `value` for `key` with a single hash lookup. The key bytes are
    /// copied only the first time the key is seen.
    #[inline]
    pub fn observe(&mut self, key: &[u8], value: i32) {
        match self.entries.entry_ref(key) {
            EntryRef::Occupied(mut e) => e.get_mut().observe(value),
            EntryRef::Vacant(e) => {
                e.insert(Record::new(value));
            }
        }
    }

    /// Fold `record` into the entry for an already-owned `key`.
    #[inline]
    pub fn combine(&mut self, key: Box<[u8]>, record: Record) {
        self.entries
            .entry(key)
            .and_modify(|r| r.combine(&record))
            .or_insert(record);
    }

    pub fn get(&self, key: &[u8]) -> Option<&Record> {
        self.entries.get(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&[u8], &Record)> {
        self.entries.iter().map(|(k, r)| (&**k, r))
    }

    /// Entries in ascending byte order of key.
    pub fn sorted(&self) -> Vec<(&[u8], &Record)> {
        let mut entries: Vec<_> = self.iter().collect();
        entries.sort_unstable_by(|a, b| a.0.cmp(b.0));
        entries
    }
}

impl IntoIterator for StationMap {
    type Item = (Box<[u8]>, Record);
    type IntoIter = hashbrown::hash_map::IntoIter<Box<[u8]>, Record>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

impl<'a> FromIterator<(&'a [u8], i32)> for StationMap {
    fn from_iter<I: IntoIterator<Item = (&'a [u8], i32)>>(iter: I) -> Self {
        let mut map = StationMap::new();
        for (key, value) in iter {
            map.observe(key, value);
        }
        map
    }
}
