use super::*;

use proptest::prelude::*;
use std::collections::BTreeMap;

#[derive(Debug, Clone)]
enum Op {
    Insert(u64),
    Delete(u64),
}

fn key_strategy() -> impl Strategy<Value = u64> + Clone {
    prop_oneof![
        // dense low keys collide a lot and force deep splits
        4 => 0u64..64,
        3 => 0u64..4096,
        // keys only separable above the depth limit
        1 => (0u64..4, 0u64..4).prop_map(|(lo, hi)| lo | (hi << 40)),
    ]
}

fn ops_strategy() -> impl Strategy<Value = Vec<Op>> {
    let key = key_strategy();
    let op = prop_oneof![
        60 => key.clone().prop_map(Op::Insert),
        40 => key.prop_map(Op::Delete),
    ];
    prop::collection::vec(op, 0..=300)
}

fn table(capacity: usize) -> ExtendibleHash {
    ExtendibleHash::with_config(Config::new(capacity).with_max_global_depth(16))
        .expect("valid config")
}

fn sorted_keys(t: &ExtendibleHash) -> Vec<u64> {
    let mut keys: Vec<u64> = t.keys().collect();
    keys.sort_unstable();
    keys
}

fn expand(model: &BTreeMap<u64, usize>) -> Vec<u64> {
    model
        .iter()
        .flat_map(|(&key, &count)| std::iter::repeat(key).take(count))
        .collect()
}

/// Directory never keeps a level nobody needs
fn assert_minimal(t: &ExtendibleHash) {
    let global_depth = t.global_depth();
    assert!(
        global_depth == 0 || t.buckets().any(|b| b.local_depth() == global_depth),
        "global depth {global_depth} is not used by any bucket"
    );
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 256,
        max_shrink_iters: 10_000,
        .. ProptestConfig::default()
    })]

    #[test]
    fn prop_matches_multiset_model(capacity in 2usize..=4, ops in ops_strategy()) {
        let mut t = table(capacity);
        let mut model: BTreeMap<u64, usize> = BTreeMap::new();

        for op in ops {
            match op {
                Op::Insert(key) => {
                    let before = (t.len(), t.global_depth(), t.bucket_count());
                    match t.insert(key) {
                        Ok(()) => *model.entry(key).or_default() += 1,
                        Err(Error::DuplicateOverflow { .. }) => {
                            prop_assert_eq!(model.get(&key).copied(), Some(capacity));
                            prop_assert_eq!((t.len(), t.global_depth(), t.bucket_count()), before);
                        }
                        Err(Error::DepthLimit { required, limit, .. }) => {
                            prop_assert!(required > limit);
                            prop_assert_eq!((t.len(), t.global_depth(), t.bucket_count()), before);
                        }
                        Err(err) => prop_assert!(false, "unexpected error: {}", err),
                    }
                }
                Op::Delete(key) => {
                    let outcome = t.delete(key).map_err(|e| TestCaseError::fail(e.to_string()))?;
                    match model.get_mut(&key) {
                        Some(count) => {
                            prop_assert_eq!(outcome, Deletion::Found);
                            *count -= 1;
                            if *count == 0 {
                                model.remove(&key);
                            }
                        }
                        None => prop_assert_eq!(outcome, Deletion::NotFound),
                    }
                }
            }

            if let Err(err) = t.verify_integrity() {
                prop_assert!(false, "{}", err);
            }
            assert_minimal(&t);
            prop_assert_eq!(t.len(), model.values().sum::<usize>());
        }

        prop_assert_eq!(sorted_keys(&t), expand(&model));
        for &key in model.keys() {
            prop_assert!(t.contains(key), "key {} not in its addressed bucket", key);
        }
    }

    #[test]
    fn prop_insert_then_delete_restores_keys(
        capacity in 2usize..=4,
        keys in prop::collection::vec(0u64..1024, 0..100),
        extra in 0u64..1024,
    ) {
        let mut t = table(capacity);
        for key in keys {
            // rejected duplicates are fine, they change nothing
            let _ = t.insert(key);
        }
        let before = sorted_keys(&t);

        if t.insert(extra).is_ok() {
            prop_assert_eq!(t.delete(extra), Ok(Deletion::Found));
        }
        prop_assert_eq!(sorted_keys(&t), before);
        prop_assert!(t.verify_integrity().is_ok());
    }

    #[test]
    fn prop_distinct_keys_terminate(keys in prop::collection::btree_set(0u64..(1 << 14), 0..300)) {
        let mut t = table(2);
        for &key in &keys {
            prop_assert!(t.insert(key).is_ok());
        }
        prop_assert_eq!(t.len(), keys.len());
        prop_assert!(t.buckets().all(|b| b.len() <= 2));
        prop_assert_eq!(sorted_keys(&t), keys.into_iter().collect::<Vec<_>>());
    }

    #[test]
    fn prop_split_partitions(
        local_depth in 0u8..8,
        prefix in any::<u64>(),
        highs in prop::collection::vec(0u64..1024, 0..=4),
    ) {
        let prefix = prefix & bucket::mask(local_depth);
        let keys: Vec<u64> = highs.iter().map(|&h| (h << local_depth) | prefix).collect();

        let mut b = Bucket::new(BucketId::new(0), local_depth, 4);
        for &key in &keys {
            prop_assert!(b.insert(key).is_ok());
        }
        let sibling = b.split(BucketId::new(1));

        let bit = 1u64 << local_depth;
        prop_assert!(b.keys().iter().all(|&k| k & bit == 0));
        prop_assert!(sibling.keys().iter().all(|&k| k & bit != 0));
        prop_assert_eq!(b.local_depth(), local_depth + 1);
        prop_assert_eq!(sibling.local_depth(), local_depth + 1);

        let mut union: Vec<u64> = b.keys().iter().chain(sibling.keys()).copied().collect();
        union.sort_unstable();
        let mut expected = keys;
        expected.sort_unstable();
        prop_assert_eq!(union, expected);
    }

    #[test]
    fn prop_merge_keeps_both_buckets(
        capacity in 2usize..=4,
        keys in prop::collection::vec(0u64..256, 1..60),
    ) {
        let mut t = ExtendibleHash::with_config(
            Config::new(capacity).with_max_global_depth(16).with_events(true),
        )
        .expect("valid config");
        for &key in &keys {
            let _ = t.insert(key);
        }

        for &key in &keys {
            let before: Vec<(BucketId, Vec<u64>)> =
                t.buckets().map(|b| (b.id(), b.keys().to_vec())).collect();
            t.take_events();
            if !t.delete(key).unwrap().is_found() {
                continue;
            }

            // the first merge folds the bucket that just lost `key`, a cascade
            // may then fold the survivor further up
            let merges: Vec<(BucketId, BucketId)> = t
                .take_events()
                .into_iter()
                .filter_map(|e| match e {
                    Event::BucketsMerged { absorbed, into, .. } => Some((absorbed, into)),
                    _ => None,
                })
                .collect();
            if let Some(&(absorbed, into)) = merges.first() {
                let survivor = merges[1..].iter().fold(into, |survivor, &(a, i)| {
                    if a == survivor { i } else { survivor }
                });

                let keys_of = |id: BucketId| {
                    before
                        .iter()
                        .find(|(b, _)| *b == id)
                        .map(|(_, k)| k.clone())
                        .unwrap_or_default()
                };
                let mut expected: Vec<u64> =
                    keys_of(absorbed).into_iter().chain(keys_of(into)).collect();
                let pos = expected.iter().position(|&k| k == key);
                prop_assert!(pos.is_some(), "deleted key {} was not in bucket {}", key, absorbed);
                expected.remove(pos.unwrap());

                let merged = t.buckets().find(|b| b.id() == survivor);
                prop_assert!(merged.is_some(), "bucket {} is gone", survivor);
                let mut got = merged.unwrap().keys().to_vec();
                for k in expected {
                    let pos = got.iter().position(|&g| g == k);
                    prop_assert!(pos.is_some(), "key {} lost in merge", k);
                    got.swap_remove(pos.unwrap());
                }
            }
            prop_assert!(t.verify_integrity().is_ok());
        }
        prop_assert!(t.is_empty());
    }
}
