use heterogeneous_cuckoo::{BuildConfig, BuildError, Builder, Placement, Strategy};
use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};
use std::collections::HashSet;
use test_log::test;

const SEED: u64 = 42;

fn gen_unique_keys(n: usize) -> Vec<Vec<u8>> {
    let mut rng = StdRng::seed_from_u64(SEED);
    let mut set = HashSet::with_capacity(n * 2);
    let mut keys = Vec::with_capacity(n);
    while keys.len() < n {
        let mut buf = [0u8; 16];
        rng.fill_bytes(&mut buf);
        if set.insert(buf) {
            keys.push(buf.to_vec());
        }
    }
    keys
}

fn build(keys: &[Vec<u8>], cfg: BuildConfig) -> Result<Placement, BuildError> {
    Builder::new()
        .with_config(cfg)
        .build(keys.iter().map(|k| k.as_slice()))
}

#[test]
fn both_strategies_build_valid_placements() {
    let keys = gen_unique_keys(5_000);
    for strategy in [Strategy::RandomWalk, Strategy::Matching] {
        let cfg = BuildConfig {
            strategy,
            ..Default::default()
        };
        let placement = build(&keys, cfg).unwrap();
        assert_eq!(placement.n, 5_000);
        assert_eq!(placement.probe_indices.len(), 5_000);
        assert!(placement.verify(keys.iter().map(|k| k.as_slice())));

        // Every cell is inside the table and the cells of different small
        // tables do not overlap.
        let size = placement.table_size();
        let mut cells = HashSet::new();
        for (key, &index) in keys.iter().zip(&placement.probe_indices) {
            assert!(placement.mask(key).allows(index));
            let cell = placement.cell(key, index);
            assert!(cell < size);
            assert!(cells.insert(cell));
        }
        for pair in placement.buckets.windows(2) {
            assert_eq!(pair[0].offset + pair[0].m as u64, pair[1].offset);
        }
    }
}

#[test]
fn build_is_deterministic() {
    let keys = gen_unique_keys(2_000);
    let a = build(&keys, BuildConfig::default()).unwrap();
    let b = build(&keys, BuildConfig::default()).unwrap();
    assert_eq!(a, b);
}

#[test]
fn load_factor_one_is_minimal() {
    let keys = gen_unique_keys(1_000);
    let cfg = BuildConfig {
        bucket_size: 16,
        load_factor: 1.0,
        class1_percentage: 0.0,
        class2_percentage: 0.0,
        ..Default::default()
    };
    let placement = build(&keys, cfg).unwrap();
    assert_eq!(placement.table_size(), 1_000);
    assert!(placement.verify(keys.iter().map(|k| k.as_slice())));
}

#[test]
fn string_keys() {
    let keys: Vec<String> = (0..300).map(|i| format!("user:{i}")).collect();
    let placement = Builder::new()
        .build(keys.iter().map(|k| k.as_bytes()))
        .unwrap();
    let cells: HashSet<u64> = keys
        .iter()
        .zip(&placement.probe_indices)
        .map(|(k, &i)| placement.cell_str(k, i))
        .collect();
    assert_eq!(cells.len(), keys.len());
}

#[test]
fn hopeless_config_is_unresolvable() {
    // Every key has a single candidate in a table with no slack, so nearly
    // every small table collides; a single seed per round cannot fix that.
    let keys = gen_unique_keys(2_000);
    let cfg = BuildConfig {
        load_factor: 1.0,
        class1_percentage: 100.0,
        class2_percentage: 0.0,
        rehash_limit: 1,
        seed_attempts: 1,
        ..Default::default()
    };
    match build(&keys, cfg) {
        Err(BuildError::Unresolvable { rounds }) => assert_eq!(rounds, 2),
        other => panic!("expected Unresolvable, got {other:?}"),
    }
}

#[cfg(feature = "serde")]
#[test]
fn serde_round_trip() {
    let keys = gen_unique_keys(1_000);
    let placement = build(&keys, BuildConfig::default()).unwrap();
    let bytes = placement.to_bytes().unwrap();
    let restored = Placement::from_bytes(&bytes).unwrap();
    assert_eq!(placement, restored);
    assert!(restored.verify(keys.iter().map(|k| k.as_slice())));
}

#[cfg(feature = "serde")]
#[test]
fn from_bytes_rejects_unusable_layouts() {
    let keys = gen_unique_keys(200);
    let placement = build(&keys, BuildConfig::default()).unwrap();
    let decode = |p: &Placement| Placement::from_bytes(&p.to_bytes().unwrap());

    let mut no_tables = placement.clone();
    no_tables.buckets.clear();
    assert!(matches!(decode(&no_tables), Err(BuildError::InvalidPlacement(_))));

    let mut short = placement.clone();
    short.probe_indices.pop();
    assert!(matches!(decode(&short), Err(BuildError::InvalidPlacement(_))));

    let mut bad_index = placement.clone();
    bad_index.probe_indices[0] = 3;
    assert!(matches!(decode(&bad_index), Err(BuildError::InvalidPlacement(_))));

    let mut gap = placement.clone();
    gap.buckets.last_mut().unwrap().offset += 1;
    assert!(matches!(decode(&gap), Err(BuildError::InvalidPlacement(_))));

    assert!(Placement::from_bytes(&[1, 2, 3]).is_err());
    assert_eq!(decode(&placement).unwrap(), placement);
}
