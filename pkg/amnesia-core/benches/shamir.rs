/*
 * amnesia: seal a secret behind a set of security questions
 * Copyright (C) 2018-2022 Aleksa Sarai <cyphar@cyphar.com>
 *
 * This program is free software: you can redistribute it and/or modify
 * it under the terms of the GNU General Public License as published by
 * the Free Software Foundation, either version 3 of the License, or
 * (at your option) any later version.
 *
 * This program is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 * GNU General Public License for more details.
 *
 * You should have received a copy of the GNU General Public License
 * along with this program.  If not, see <https://www.gnu.org/licenses/>.
 */

use std::time::Duration;

use amnesia_core::shamir::{recover_secret, Dealer};

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use rand::{distributions::Standard, Rng};

// Sealing only ever splits a data key, but larger secrets make the per-byte
// cost easier to see.
const SECRET_LENGTHS: [usize; 2] = [32, 1 << 12];

fn benchmark_dealer_shards(c: &mut Criterion) {
    let mut group = c.benchmark_group("shamir Dealer::shards");
    for secret_len in SECRET_LENGTHS {
        for threshold in (10..=40).step_by(10) {
            let vec = rand::thread_rng()
                .sample_iter(Standard)
                .take(secret_len)
                .collect::<Vec<u8>>();
            let dealer = Dealer::new(threshold, &vec, &mut rand::thread_rng()).unwrap();
            group.measurement_time(Duration::new(20, 0));
            group.throughput(Throughput::Bytes(vec.len() as u64));
            group.bench_with_input(
                format!("len={} M={:03}", secret_len, threshold),
                &dealer,
                |b, dealer| b.iter(|| dealer.shards(threshold, &mut rand::thread_rng()).unwrap()),
            );
        }
    }
    group.finish()
}

fn benchmark_recover_secret(c: &mut Criterion) {
    let mut group = c.benchmark_group("shamir recover_secret");
    for secret_len in SECRET_LENGTHS {
        for threshold in (5..=65).step_by(15) {
            let vec = rand::thread_rng()
                .sample_iter(Standard)
                .take(secret_len)
                .collect::<Vec<u8>>();
            let shards = Dealer::new(threshold, &vec, &mut rand::thread_rng())
                .and_then(|dealer| dealer.shards(threshold, &mut rand::thread_rng()))
                .unwrap();
            group.throughput(Throughput::Bytes(vec.len() as u64));
            group.measurement_time(Duration::new(20 + threshold as u64, 0));
            group.bench_with_input(
                format!("len={} M={:03}", secret_len, threshold),
                &shards,
                |b, shards| b.iter(|| black_box(recover_secret(shards).unwrap())),
            );
        }
    }
    group.finish()
}

criterion_group! {
    name = benches;
    config = Criterion::default().sample_size(100);
    targets = benchmark_dealer_shards, benchmark_recover_secret
}
criterion_main!(benches);
