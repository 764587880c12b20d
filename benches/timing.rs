use std::hint::black_box;
use std::time::Instant;

use encrypted_attributes::{EncryptionKey, Envelope, FormatVersion};
use serde_json::json;

fn time_it<F: FnMut()>(label: &str, iters: usize, mut f: F) {
    // warmup
    for _ in 0..(iters / 10).max(5) {
        f();
    }

    let start = Instant::now();
    for _ in 0..iters {
        f();
    }
    let elapsed = start.elapsed();

    let per_iter = elapsed / (iters as u32);
    println!("{:<20} total={:?}  per_iter={:?}", label, elapsed, per_iter);
}

fn main() {
    let keys: Vec<EncryptionKey> = (0..2).map(|_| EncryptionKey::generate().unwrap()).collect();
    let value = json!({"payload": "x".repeat(1024)});
    let small = json!({"a": 1});

    let iters = 200;

    for version in [FormatVersion::V0, FormatVersion::V1, FormatVersion::V2] {
        let bench_value = if version == FormatVersion::V0 { &small } else { &value };

        time_it(&format!("{version:?} encrypt"), iters, || {
            let mut envelope = Envelope::create(version).unwrap();
            envelope
                .encrypt(black_box(bench_value), black_box(&keys))
                .unwrap();
            black_box(envelope.to_value().unwrap());
        });

        let mut envelope = Envelope::create(version).unwrap();
        envelope.encrypt(bench_value, &keys).unwrap();

        time_it(&format!("{version:?} decrypt"), iters, || {
            let value = envelope.decrypt(black_box(&keys[0])).unwrap();
            black_box(value);
        });

        time_it(&format!("{version:?} needs_update"), iters, || {
            let update = envelope.needs_update(black_box(&keys[..1])).unwrap();
            black_box(update);
        });
    }

    println!("\nDone.");
}
