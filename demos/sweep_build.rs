use heterogeneous_cuckoo::{BuildConfig, BuildError, Builder, Strategy};
use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};
use std::collections::HashSet;
use std::time::Instant;

const N_KEYS: usize = 200_000;
const GEN_SEED: u64 = 42;

fn main() -> Result<(), BuildError> {
    println!("--- heterogeneous_cuckoo sweep ---");
    println!("n = {N_KEYS}");

    // 1) Generate unique keys
    let t0 = Instant::now();
    let keys = gen_unique_keys(N_KEYS, GEN_SEED);
    let gen_s = t0.elapsed().as_secs_f64();
    println!(
        "gen:    {:>8.3} s   ({:.1} M keys/s)",
        gen_s,
        N_KEYS as f64 / gen_s / 1e6
    );

    // 2) Build with both strategies over a few class splits
    for strategy in [Strategy::RandomWalk, Strategy::Matching] {
        for (class1, class2) in [(10.0, 30.0), (20.0, 30.0), (25.0, 35.0)] {
            let cfg = BuildConfig {
                class1_percentage: class1,
                class2_percentage: class2,
                strategy,
                ..Default::default()
            };
            let t1 = Instant::now();
            let placement = Builder::new()
                .with_config(cfg)
                .build(keys.iter().map(|v| v.as_slice()))?;
            let build_s = t1.elapsed().as_secs_f64();

            // 3) Query-time recomputation of every cell
            assert!(placement.verify(keys.iter().map(|v| v.as_slice())));

            println!(
                "{strategy:?} t1={class1} t2={class2}: build {:>8.3} s ({:.2} M keys/s), cells {}",
                build_s,
                N_KEYS as f64 / build_s / 1e6,
                placement.table_size()
            );
        }
    }
    Ok(())
}

/// Generate N unique 16-byte keys (raw bytes), deterministically.
fn gen_unique_keys(n: usize, seed: u64) -> Vec<Vec<u8>> {
    let mut rng = StdRng::seed_from_u64(seed);
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
