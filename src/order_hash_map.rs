//! OrderHashMap: chained hash map whose iteration order is insertion order.

use core::borrow::Borrow;
use core::fmt;
use core::hash::{BuildHasher, Hash};
use core::iter::FusedIterator;
use core::ops::Index;
use slotmap::{DefaultKey, SlotMap};
use std::collections::hash_map::RandomState;

/// Initial (and post-`clear`) bucket count. Always a power of two.
const START_TABLE_SIZE: usize = 8;

#[inline]
fn bucket_index(hash: u64, table_size: usize) -> usize {
    // table_size is a power of two, so masking is hash % table_size.
    (hash as usize) & (table_size - 1)
}

/// A stable position for an entry, as returned by [`OrderHashMap::find`].
///
/// Positions survive growth (growth rebuilds only the bucket index, not the
/// entry storage) and removals of unrelated entries. A position goes stale
/// once its entry is removed or the map is cleared; stale positions resolve
/// to `None` and never alias a later entry, because the underlying slots are
/// generational.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct Pos(DefaultKey);

impl Pos {
    pub(crate) fn new(k: DefaultKey) -> Self {
        Pos(k)
    }

    pub fn key<'a, K, V, S>(&self, map: &'a OrderHashMap<K, V, S>) -> Option<&'a K>
    where
        K: Eq + Hash,
        S: BuildHasher,
    {
        map.slots.get(self.0).map(|e| &e.key)
    }

    pub fn value<'a, K, V, S>(&self, map: &'a OrderHashMap<K, V, S>) -> Option<&'a V>
    where
        K: Eq + Hash,
        S: BuildHasher,
    {
        map.slots.get(self.0).map(|e| &e.value)
    }

    pub fn value_mut<'a, K, V, S>(&self, map: &'a mut OrderHashMap<K, V, S>) -> Option<&'a mut V>
    where
        K: Eq + Hash,
        S: BuildHasher,
    {
        map.slots.get_mut(self.0).map(|e| &mut e.value)
    }
}

/// Error returned by [`OrderHashMap::at`] when the key is absent.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct OutOfRange;

impl fmt::Display for OutOfRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("key not present in map")
    }
}

impl std::error::Error for OutOfRange {}

#[derive(Clone, Debug)]
struct Entry<K, V> {
    key: K,
    value: V,
    hash: u64,
    // Insertion-order chain through the slot storage.
    prev: Option<DefaultKey>,
    next: Option<DefaultKey>,
}

/// A hash map that iterates entries oldest-inserted first.
///
/// Entries live in a generational slot arena threaded into a doubly-linked
/// insertion-order chain; a separate bucket index of slot keys routes
/// lookups. Each entry caches its full `u64` hash at insertion time and the
/// index only ever consults the cached hash, so `K: Hash` never runs during
/// growth or removal of already-stored keys.
///
/// Duplicate inserts keep the first value: `insert` on a present key is a
/// no-op, not an update.
pub struct OrderHashMap<K, V, S = RandomState> {
    hasher: S,
    slots: SlotMap<DefaultKey, Entry<K, V>>, // entry storage with generational keys
    buckets: Vec<Vec<DefaultKey>>,
    head: Option<DefaultKey>,
    tail: Option<DefaultKey>,
}

impl<K, V> OrderHashMap<K, V>
where
    K: Eq + Hash,
{
    pub fn new() -> Self {
        Self::with_hasher(Default::default())
    }
}

impl<K, V, S> Default for OrderHashMap<K, V, S>
where
    K: Eq + Hash,
    S: BuildHasher + Default,
{
    fn default() -> Self {
        Self::with_hasher(S::default())
    }
}

impl<K, V, S> OrderHashMap<K, V, S>
where
    K: Eq + Hash,
    S: BuildHasher,
{
    pub fn with_hasher(hasher: S) -> Self {
        let mut buckets = Vec::new();
        buckets.resize_with(START_TABLE_SIZE, Vec::new);
        Self {
            hasher,
            slots: SlotMap::with_key(),
            buckets,
            head: None,
            tail: None,
        }
    }

    fn make_hash<Q>(&self, q: &Q) -> u64
    where
        Q: ?Sized + Hash,
    {
        self.hasher.hash_one(q)
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Borrow of the configured hasher.
    pub fn hasher(&self) -> &S {
        &self.hasher
    }

    /// Scan the one bucket matching `hash` for an entry whose key equals `q`.
    fn probe<Q>(&self, hash: u64, q: &Q) -> Option<DefaultKey>
    where
        K: Borrow<Q>,
        Q: ?Sized + Eq,
    {
        let bucket = &self.buckets[bucket_index(hash, self.buckets.len())];
        bucket.iter().copied().find(|&k| {
            self.slots
                .get(k)
                .map(|e| e.key.borrow() == q)
                .unwrap_or(false)
        })
    }

    /// Rebuild the bucket index for `table_size` slots from the cached entry
    /// hashes, walking the insertion-order chain. Entry storage and position
    /// validity are untouched.
    fn rebuild_buckets(&mut self, table_size: usize) {
        debug_assert!(table_size.is_power_of_two());
        self.buckets.clear();
        self.buckets.resize_with(table_size, Vec::new);
        let mut cur = self.head;
        while let Some(k) = cur {
            let entry = &self.slots[k];
            self.buckets[bucket_index(entry.hash, table_size)].push(k);
            cur = entry.next;
        }
    }

    /// Append an entry known to be absent: run the growth check, link the
    /// entry at the tail of the order chain, and index it.
    fn insert_unique(&mut self, hash: u64, key: K, value: V) -> DefaultKey {
        // Pre-insert check: the new entry is not yet counted, so occupancy
        // after a doubling stays at or below a quarter of the table.
        if self.slots.len() * 4 >= self.buckets.len() {
            let doubled = self.buckets.len() * 2;
            self.rebuild_buckets(doubled);
        }
        let prev = self.tail;
        let k = self.slots.insert(Entry {
            key,
            value,
            hash,
            prev,
            next: None,
        });
        match prev {
            Some(t) => self.slots[t].next = Some(k),
            None => self.head = Some(k),
        }
        self.tail = Some(k);
        let b = bucket_index(hash, self.buckets.len());
        self.buckets[b].push(k);
        k
    }

    /// Insert `key -> value` if `key` is absent. Returns whether an entry was
    /// added; a present key keeps its original value (first write wins).
    ///
    /// The duplicate check runs before the growth check, so a no-op insert
    /// never resizes the table.
    pub fn insert(&mut self, key: K, value: V) -> bool {
        let hash = self.make_hash(&key);
        if self.probe(hash, &key).is_some() {
            return false;
        }
        self.insert_unique(hash, key, value);
        true
    }

    /// Remove the entry for `key`, returning its value. Absent keys are a
    /// silent `None`. The table never shrinks on removal.
    pub fn remove<Q>(&mut self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        let hash = self.make_hash(key);
        let b = bucket_index(hash, self.buckets.len());
        let slot = self.buckets[b].iter().position(|&k| {
            self.slots
                .get(k)
                .map(|e| e.key.borrow() == key)
                .unwrap_or(false)
        })?;
        let k = self.buckets[b].swap_remove(slot);
        let entry = self.slots.remove(k)?;
        match entry.prev {
            Some(p) => self.slots[p].next = entry.next,
            None => self.head = entry.next,
        }
        match entry.next {
            Some(n) => self.slots[n].prev = entry.prev,
            None => self.tail = entry.prev,
        }
        Some(entry.value)
    }

    /// Empty the map and reset the bucket index to its initial size. All
    /// outstanding positions stop resolving (slot generations are bumped).
    pub fn clear(&mut self) {
        self.slots.clear();
        self.buckets.clear();
        self.buckets.resize_with(START_TABLE_SIZE, Vec::new);
        self.head = None;
        self.tail = None;
    }

    /// Locate `key`, returning a stable [`Pos`] or `None`. Never mutates.
    pub fn find<Q>(&self, key: &Q) -> Option<Pos>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        let hash = self.make_hash(key);
        self.probe(hash, key).map(Pos::new)
    }

    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        let hash = self.make_hash(key);
        self.probe(hash, key).is_some()
    }

    pub fn get<Q>(&self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        let hash = self.make_hash(key);
        let k = self.probe(hash, key)?;
        self.slots.get(k).map(|e| &e.value)
    }

    pub fn get_mut<Q>(&mut self, key: &Q) -> Option<&mut V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        let hash = self.make_hash(key);
        let k = self.probe(hash, key)?;
        self.slots.get_mut(k).map(|e| &mut e.value)
    }

    /// Checked read-only access: the value for `key`, or [`OutOfRange`] if
    /// absent. Never inserts.
    pub fn at<Q>(&self, key: &Q) -> Result<&V, OutOfRange>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        self.get(key).ok_or(OutOfRange)
    }

    /// Mutable access to the value for `key`, inserting `V::default()` first
    /// if the key is absent (through the regular insert/growth path). The
    /// value of a present key is returned untouched.
    pub fn get_or_default(&mut self, key: K) -> &mut V
    where
        V: Default,
    {
        let hash = self.make_hash(&key);
        let k = match self.probe(hash, &key) {
            Some(k) => k,
            None => self.insert_unique(hash, key, V::default()),
        };
        &mut self.slots[k].value
    }

    /// Entries in insertion order, oldest first.
    pub fn iter(&self) -> Iter<'_, K, V> {
        Iter {
            slots: &self.slots,
            next: self.head,
            remaining: self.slots.len(),
        }
    }

    /// Entries in insertion order with mutable values.
    pub fn iter_mut(&mut self) -> IterMut<'_, K, V> {
        let next = self.head;
        let remaining = self.slots.len();
        IterMut {
            slots: &mut self.slots,
            next,
            remaining,
        }
    }

    pub fn keys(&self) -> Keys<'_, K, V> {
        Keys(self.iter())
    }

    pub fn values(&self) -> Values<'_, K, V> {
        Values(self.iter())
    }

    pub fn values_mut(&mut self) -> ValuesMut<'_, K, V> {
        ValuesMut(self.iter_mut())
    }
}

impl<K, V, S> Clone for OrderHashMap<K, V, S>
where
    K: Clone + Eq + Hash,
    V: Clone,
    S: Clone + BuildHasher,
{
    /// Deep copy. The bucket index is rebuilt for the cloned storage rather
    /// than copied structurally; cloning the slot arena preserves slot keys,
    /// so the order chain carries over as-is.
    fn clone(&self) -> Self {
        let mut map = Self {
            hasher: self.hasher.clone(),
            slots: self.slots.clone(),
            buckets: Vec::new(),
            head: self.head,
            tail: self.tail,
        };
        map.rebuild_buckets(self.buckets.len());
        map
    }
}

impl<K, V, S> fmt::Debug for OrderHashMap<K, V, S>
where
    K: fmt::Debug + Eq + Hash,
    V: fmt::Debug,
    S: BuildHasher,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

impl<K, V, S> Extend<(K, V)> for OrderHashMap<K, V, S>
where
    K: Eq + Hash,
    S: BuildHasher,
{
    fn extend<T: IntoIterator<Item = (K, V)>>(&mut self, iter: T) {
        for (k, v) in iter {
            self.insert(k, v);
        }
    }
}

impl<K, V, S> FromIterator<(K, V)> for OrderHashMap<K, V, S>
where
    K: Eq + Hash,
    S: BuildHasher + Default,
{
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        let mut map = Self::with_hasher(S::default());
        map.extend(iter);
        map
    }
}

impl<K, V, const N: usize> From<[(K, V); N]> for OrderHashMap<K, V>
where
    K: Eq + Hash,
{
    fn from(pairs: [(K, V); N]) -> Self {
        Self::from_iter(pairs)
    }
}

impl<K, V, S, Q> Index<&Q> for OrderHashMap<K, V, S>
where
    K: Eq + Hash + Borrow<Q>,
    Q: ?Sized + Hash + Eq,
    S: BuildHasher,
{
    type Output = V;

    /// Read-only indexing. Panics if the key is absent; `Index` takes
    /// `&self`, so unlike [`OrderHashMap::get_or_default`] it cannot insert.
    fn index(&self, key: &Q) -> &V {
        self.get(key).expect("no entry found for key")
    }
}

/// Iterator over `(&K, &V)` in insertion order.
pub struct Iter<'a, K, V> {
    slots: &'a SlotMap<DefaultKey, Entry<K, V>>,
    next: Option<DefaultKey>,
    remaining: usize,
}

impl<'a, K, V> Iterator for Iter<'a, K, V> {
    type Item = (&'a K, &'a V);

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        let k = self.next?;
        let e = self.slots.get(k)?;
        self.next = e.next;
        self.remaining -= 1;
        Some((&e.key, &e.value))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<K, V> ExactSizeIterator for Iter<'_, K, V> {}
impl<K, V> FusedIterator for Iter<'_, K, V> {}

/// Iterator over `(&K, &mut V)` in insertion order.
pub struct IterMut<'a, K, V> {
    slots: &'a mut SlotMap<DefaultKey, Entry<K, V>>,
    next: Option<DefaultKey>,
    remaining: usize,
}

impl<'a, K, V> Iterator for IterMut<'a, K, V> {
    type Item = (&'a K, &'a mut V);

    fn next(&mut self) -> Option<Self::Item> {
        let k = self.next?;
        let entry = self.slots.get_mut(k)?;
        self.next = entry.next;
        self.remaining -= 1;
        // SAFETY: the order chain visits each slot at most once, so the
        // items handed out never alias each other, and `self.slots` keeps
        // the whole map exclusively borrowed for 'a.
        let entry = unsafe { &mut *(entry as *mut Entry<K, V>) };
        Some((&entry.key, &mut entry.value))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<K, V> ExactSizeIterator for IterMut<'_, K, V> {}
impl<K, V> FusedIterator for IterMut<'_, K, V> {}

/// Owning iterator over `(K, V)` in insertion order.
pub struct IntoIter<K, V> {
    slots: SlotMap<DefaultKey, Entry<K, V>>,
    next: Option<DefaultKey>,
}

impl<K, V> Iterator for IntoIter<K, V> {
    type Item = (K, V);

    fn next(&mut self) -> Option<Self::Item> {
        let k = self.next?;
        let e = self.slots.remove(k)?;
        self.next = e.next;
        Some((e.key, e.value))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.slots.len(), Some(self.slots.len()))
    }
}

impl<K, V> ExactSizeIterator for IntoIter<K, V> {}
impl<K, V> FusedIterator for IntoIter<K, V> {}

/// Iterator over `&K` in insertion order.
pub struct Keys<'a, K, V>(Iter<'a, K, V>);

impl<'a, K, V> Iterator for Keys<'a, K, V> {
    type Item = &'a K;
    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        self.0.next().map(|(k, _)| k)
    }
    fn size_hint(&self) -> (usize, Option<usize>) {
        self.0.size_hint()
    }
}

impl<K, V> ExactSizeIterator for Keys<'_, K, V> {}
impl<K, V> FusedIterator for Keys<'_, K, V> {}

/// Iterator over `&V` in insertion order.
pub struct Values<'a, K, V>(Iter<'a, K, V>);

impl<'a, K, V> Iterator for Values<'a, K, V> {
    type Item = &'a V;
    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        self.0.next().map(|(_, v)| v)
    }
    fn size_hint(&self) -> (usize, Option<usize>) {
        self.0.size_hint()
    }
}

impl<K, V> ExactSizeIterator for Values<'_, K, V> {}
impl<K, V> FusedIterator for Values<'_, K, V> {}

/// Iterator over `&mut V` in insertion order.
pub struct ValuesMut<'a, K, V>(IterMut<'a, K, V>);

impl<'a, K, V> Iterator for ValuesMut<'a, K, V> {
    type Item = &'a mut V;
    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        self.0.next().map(|(_, v)| v)
    }
    fn size_hint(&self) -> (usize, Option<usize>) {
        self.0.size_hint()
    }
}

impl<K, V> ExactSizeIterator for ValuesMut<'_, K, V> {}
impl<K, V> FusedIterator for ValuesMut<'_, K, V> {}

impl<'a, K, V, S> IntoIterator for &'a OrderHashMap<K, V, S>
where
    K: Eq + Hash,
    S: BuildHasher,
{
    type Item = (&'a K, &'a V);
    type IntoIter = Iter<'a, K, V>;
    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<'a, K, V, S> IntoIterator for &'a mut OrderHashMap<K, V, S>
where
    K: Eq + Hash,
    S: BuildHasher,
{
    type Item = (&'a K, &'a mut V);
    type IntoIter = IterMut<'a, K, V>;
    fn into_iter(self) -> Self::IntoIter {
        self.iter_mut()
    }
}

impl<K, V, S> IntoIterator for OrderHashMap<K, V, S> {
    type Item = (K, V);
    type IntoIter = IntoIter<K, V>;
    fn into_iter(self) -> Self::IntoIter {
        IntoIter {
            slots: self.slots,
            next: self.head,
        }
    }
}
