#![cfg(test)]

// Property tests for OrderHashMap kept inside the crate so they can live
// next to the implementation without feature gates.

use crate::order_hash_map::{OrderHashMap, OutOfRange, Pos};
use proptest::prelude::*;
use std::collections::HashMap;
use std::fmt;
use std::hash::Hasher;

// Key newtype with Borrow<str> to exercise borrowed lookup.
#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
struct Key(String);
impl fmt::Debug for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}
impl std::borrow::Borrow<str> for Key {
    fn borrow(&self) -> &str {
        &self.0
    }
}

// Pool-indexed operations to improve shrinking: indices shrink to earlier
// keys, pool length shrinks, and op lists shrink in length.
#[derive(Clone, Debug)]
enum OpI {
    Insert(usize, i32),
    Remove(usize),
    Find(usize),
    At(usize),
    Contains(String),
    GetOrDefault(usize),
    Mutate(usize, i32),
    Iterate,
    Clear,
}

fn key_from(pool: &[String], i: usize) -> Key {
    Key(pool[i].clone())
}

fn arb_scenario() -> impl Strategy<Value = (Vec<String>, Vec<OpI>)> {
    proptest::collection::vec("[a-z]{0,5}", 1..=8).prop_flat_map(|pool| {
        let idxs: Vec<usize> = (0..pool.len()).collect();
        let idx = proptest::sample::select(idxs);
        let contains_pool = proptest::sample::select(pool.clone());
        let op = prop_oneof![
            4 => (idx.clone(), any::<i32>()).prop_map(|(i, v)| OpI::Insert(i, v)),
            3 => idx.clone().prop_map(OpI::Remove),
            3 => idx.clone().prop_map(OpI::Find),
            2 => idx.clone().prop_map(OpI::At),
            2 => prop_oneof![
                contains_pool.prop_map(|s: String| s),
                "[a-z]{0,5}".prop_map(|s| s)
            ]
            .prop_map(OpI::Contains),
            2 => idx.clone().prop_map(OpI::GetOrDefault),
            2 => (idx.clone(), any::<i32>()).prop_map(|(i, d)| OpI::Mutate(i, d)),
            2 => Just(OpI::Iterate),
            // Clear is rare so runs usually build up some history first.
            1 => Just(OpI::Clear),
        ];
        proptest::collection::vec(op, 1..60).prop_map(move |ops| (pool.clone(), ops))
    })
}

// Model: a std HashMap for the key -> value mapping plus a Vec tracking the
// insertion order of the live keys.
struct Model {
    values: HashMap<Key, i32>,
    order: Vec<Key>,
}

impl Model {
    fn new() -> Self {
        Model {
            values: HashMap::new(),
            order: Vec::new(),
        }
    }

    // First write wins; returns whether the key was added.
    fn insert(&mut self, k: Key, v: i32) -> bool {
        if self.values.contains_key(&k) {
            return false;
        }
        self.order.push(k.clone());
        self.values.insert(k, v);
        true
    }

    fn remove(&mut self, k: &Key) -> Option<i32> {
        let v = self.values.remove(k)?;
        self.order.retain(|o| o != k);
        Some(v)
    }

    fn clear(&mut self) {
        self.values.clear();
        self.order.clear();
    }

    fn pairs(&self) -> Vec<(Key, i32)> {
        self.order
            .iter()
            .map(|k| (k.clone(), self.values[k]))
            .collect()
    }
}

fn run_scenario<S>(sut: &mut OrderHashMap<Key, i32, S>, pool: Vec<String>, ops: Vec<OpI>) -> Result<(), TestCaseError>
where
    S: std::hash::BuildHasher,
{
    let mut model = Model::new();
    let mut live: HashMap<Key, Pos> = HashMap::new();
    let mut stale: Vec<Pos> = Vec::new();

    for op in ops {
        match op {
            OpI::Insert(i, v) => {
                let k = key_from(&pool, i);
                let added = sut.insert(k.clone(), v);
                prop_assert_eq!(added, model.insert(k.clone(), v), "first-write-wins parity");
                if added {
                    let p = sut.find(&k).expect("just inserted");
                    let prev = live.insert(k, p);
                    prop_assert!(prev.is_none());
                } else {
                    // The original value must be retained.
                    prop_assert_eq!(sut.get(&k), model.values.get(&k));
                }
            }
            OpI::Remove(i) => {
                let k = key_from(&pool, i);
                let got = sut.remove(&k);
                prop_assert_eq!(got, model.remove(&k), "remove parity");
                if got.is_some() {
                    stale.push(live.remove(&k).expect("tracked live position"));
                } else {
                    prop_assert!(sut.find(&k).is_none());
                }
            }
            OpI::Find(i) => {
                let k = key_from(&pool, i);
                let p = sut.find(&k);
                prop_assert_eq!(p.is_some(), model.values.contains_key(&k));
                if let Some(p) = p {
                    // Positions are stable: lookup returns the tracked one.
                    prop_assert_eq!(Some(&p), live.get(&k));
                    prop_assert_eq!(p.value(sut), model.values.get(&k));
                    prop_assert_eq!(p.key(sut), Some(&k));
                }
            }
            OpI::At(i) => {
                let k = key_from(&pool, i);
                match model.values.get(&k) {
                    Some(v) => prop_assert_eq!(sut.at(&k), Ok(v)),
                    None => prop_assert_eq!(sut.at(&k), Err(OutOfRange)),
                }
            }
            OpI::Contains(s) => {
                let has = sut.contains_key(s.as_str());
                let has_model = model.values.keys().any(|k| k.0 == s);
                prop_assert_eq!(has, has_model);
            }
            OpI::GetOrDefault(i) => {
                let k = key_from(&pool, i);
                let existed = model.values.contains_key(&k);
                let v = *sut.get_or_default(k.clone());
                if existed {
                    prop_assert_eq!(Some(&v), model.values.get(&k));
                } else {
                    prop_assert_eq!(v, 0, "absent key defaults");
                    model.insert(k.clone(), 0);
                    let p = sut.find(&k).expect("defaulted entry present");
                    live.insert(k, p);
                }
            }
            OpI::Mutate(i, d) => {
                let k = key_from(&pool, i);
                if let Some(vr) = sut.get_mut(&k) {
                    *vr = vr.saturating_add(d);
                    let mv = model.values.get_mut(&k).expect("model has the key");
                    *mv = mv.saturating_add(d);
                } else {
                    prop_assert!(!model.values.contains_key(&k));
                }
            }
            OpI::Iterate => {
                let got: Vec<(Key, i32)> = sut.iter().map(|(k, v)| (k.clone(), *v)).collect();
                prop_assert_eq!(got, model.pairs(), "insertion-order iteration parity");
            }
            OpI::Clear => {
                sut.clear();
                model.clear();
                stale.extend(live.drain().map(|(_, p)| p));
            }
        }

        // Post-conditions after each op
        // 1) Stale positions never resolve (and never alias new entries).
        for &p in &stale {
            prop_assert!(p.value(sut).is_none());
        }
        // 2) Size parity.
        prop_assert_eq!(sut.len(), model.values.len());
        prop_assert_eq!(sut.is_empty(), model.values.is_empty());
        // 3) Full insertion-order parity, every step.
        let got: Vec<(Key, i32)> = sut.iter().map(|(k, v)| (k.clone(), *v)).collect();
        prop_assert_eq!(got, model.pairs());
    }
    Ok(())
}

// Property: state-machine equivalence against a std HashMap plus an
// insertion-order Vec. Invariants exercised across random op sequences:
// - First write wins; duplicate inserts change nothing.
// - `find`/`at`/`contains_key`/`get_or_default` parity with the model.
// - Iteration yields live entries in exact insertion order after every op.
// - Positions are stable for live entries and stale ones never resolve,
//   including across `clear()`.
proptest! {
    #![proptest_config(ProptestConfig { cases: 64, .. ProptestConfig::default() })]
    #[test]
    fn prop_state_machine((pool, ops) in arb_scenario()) {
        let mut sut: OrderHashMap<Key, i32> = OrderHashMap::new();
        run_scenario(&mut sut, pool, ops)?;
    }
}

// Collision variant using a constant hasher so every key shares one bucket.
#[derive(Clone, Default)]
struct ConstBuildHasher;
struct ConstHasher;
impl std::hash::BuildHasher for ConstBuildHasher {
    type Hasher = ConstHasher;
    fn build_hasher(&self) -> Self::Hasher {
        ConstHasher
    }
}
impl Hasher for ConstHasher {
    fn write(&mut self, _bytes: &[u8]) {}
    fn finish(&self) -> u64 {
        0
    }
}

// Property: same state-machine invariants under worst-case collisions.
// This stresses in-bucket scans for insert/find/remove and the growth
// rebuild when every reference lands in bucket zero.
proptest! {
    #![proptest_config(ProptestConfig { cases: 64, .. ProptestConfig::default() })]
    #[test]
    fn prop_state_machine_with_collisions((pool, ops) in arb_scenario()) {
        let mut sut: OrderHashMap<Key, i32, ConstBuildHasher> =
            OrderHashMap::with_hasher(ConstBuildHasher);
        run_scenario(&mut sut, pool, ops)?;
    }
}
