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

use crate::shamir::{
    gf::{GfElem, GfElemPrimitive, GfPolynomial},
    Error, Shard,
};

use rand::{seq::SliceRandom, CryptoRng, RngCore};

/// Smallest threshold that still requires more than one shard.
pub const MIN_THRESHOLD: usize = 2;

/// Every shard needs a distinct non-zero `x` value.
pub const MAX_SHARDS: usize = GfElemPrimitive::MAX as usize;

/// Holds one random polynomial per byte of the secret, each with the secret
/// byte as its constant term.
#[derive(Clone, Debug)]
pub struct Dealer {
    polys: Vec<GfPolynomial>,
    threshold: usize,
}

impl Dealer {
    /// Construct a new `Dealer` for the given `secret`, such that any
    /// `threshold` of its shards recover the secret.
    pub fn new<B, R>(threshold: usize, secret: B, r: &mut R) -> Result<Self, Error>
    where
        B: AsRef<[u8]>,
        R: CryptoRng + RngCore + ?Sized,
    {
        let secret = secret.as_ref();
        if secret.is_empty() {
            return Err(Error::EmptySecret);
        }
        if !(MIN_THRESHOLD..=MAX_SHARDS).contains(&threshold) {
            return Err(Error::InvalidThreshold { threshold });
        }

        let polys = secret
            .iter()
            .map(|b| {
                let mut poly = GfPolynomial::new_rand(threshold - 1, r);
                *poly.constant_mut() = GfElem::from_inner(*b);
                poly
            })
            .collect::<Vec<_>>();

        Ok(Self { polys, threshold })
    }

    /// Generate the shard at `x`, which must not be zero (the shard at zero
    /// *is* the secret).
    pub fn shard(&self, x: GfElemPrimitive) -> Result<Shard, Error> {
        if x == 0 {
            return Err(Error::ZeroShardId);
        }
        let x = GfElem::from_inner(x);
        Ok(Shard {
            x,
            ys: self.polys.iter().map(|p| p.evaluate(x)).collect(),
        })
    }

    /// Generate `n` shards with distinct, randomly-chosen `x` values.
    pub fn shards<R>(&self, n: usize, r: &mut R) -> Result<Vec<Shard>, Error>
    where
        R: CryptoRng + RngCore + ?Sized,
    {
        if n < self.threshold {
            return Err(Error::ThresholdExceedsShards {
                threshold: self.threshold,
                shards: n,
            });
        }
        if n > MAX_SHARDS {
            return Err(Error::TooManyShards { shards: n });
        }

        let mut xs = (1..=GfElemPrimitive::MAX).collect::<Vec<_>>();
        xs.shuffle(r);
        xs.into_iter().take(n).map(|x| self.shard(x)).collect()
    }
}

/// Split `secret` into `n` shards, any `threshold` of which can be combined to
/// recover it.
pub fn split_secret<B, R>(
    secret: B,
    n: usize,
    threshold: usize,
    r: &mut R,
) -> Result<Vec<Shard>, Error>
where
    B: AsRef<[u8]>,
    R: CryptoRng + RngCore + ?Sized,
{
    Dealer::new(threshold, secret, r)?.shards(n, r)
}

/// Combine `shards` into the secret they were split from.
///
/// Shards carry no record of the threshold, so every supplied shard is used
/// for interpolation. If fewer than the threshold number of genuine shards
/// are supplied (or any of them is not genuine) the result is unrelated to
/// the original secret, rather than an error.
pub fn recover_secret<S: AsRef<[Shard]>>(shards: S) -> Result<Vec<u8>, Error> {
    let shards = shards.as_ref();
    if shards.len() < MIN_THRESHOLD {
        return Err(Error::TooFewShards {
            shards: shards.len(),
        });
    }

    let secret_len = shards[0].secret_len();
    if shards.iter().any(|s| s.secret_len() != secret_len) {
        return Err(Error::MismatchedShards);
    }

    (0..secret_len)
        .map(|i| {
            let points = shards.iter().map(|s| (s.x, s.ys[i])).collect::<Vec<_>>();
            GfPolynomial::lagrange_constant(points).map(|y| y.inner())
        })
        .collect::<Result<Vec<_>, _>>()
        .map_err(Error::from)
}

#[cfg(test)]
mod test {
    use super::*;

    use quickcheck::TestResult;
    use rand::{rngs::OsRng, seq::SliceRandom};

    #[quickcheck]
    fn split_recover_any_subset(threshold: u8, extra: u8, secret: Vec<u8>) -> TestResult {
        let threshold = threshold as usize;
        if !(MIN_THRESHOLD..=32).contains(&threshold) || secret.is_empty() {
            return TestResult::discard();
        }
        let n = (threshold + extra as usize % 16).min(MAX_SHARDS);

        let mut shards = split_secret(&secret, n, threshold, &mut OsRng).unwrap();
        shards.shuffle(&mut OsRng);

        // Any subset with at least the threshold count works.
        let exact = recover_secret(&shards[..threshold]).unwrap();
        let all = recover_secret(&shards).unwrap();
        TestResult::from_bool(exact == secret && all == secret)
    }

    #[quickcheck]
    fn recover_below_threshold_is_garbage(threshold: u8) -> TestResult {
        let threshold = threshold as usize;
        if !(3..=32).contains(&threshold) {
            return TestResult::discard();
        }
        let mut secret = [0u8; 32];
        OsRng.fill_bytes(&mut secret);

        let shards = split_secret(secret, threshold, threshold, &mut OsRng).unwrap();
        let recovered = recover_secret(&shards[..threshold - 1]).unwrap();
        TestResult::from_bool(recovered != secret)
    }

    #[test]
    fn shards_have_distinct_ids() {
        let dealer = Dealer::new(2, b"hunter2", &mut OsRng).unwrap();
        let mut ids = dealer
            .shards(MAX_SHARDS, &mut OsRng)
            .unwrap()
            .iter()
            .map(Shard::id)
            .collect::<Vec<_>>();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), MAX_SHARDS);
        assert!(!ids.contains(&0));
    }

    #[test]
    fn dealer_fixed_shards() {
        let dealer = Dealer::new(3, b"zed > vim", &mut OsRng).unwrap();
        let shards = [1, 2, 255]
            .into_iter()
            .map(|x| dealer.shard(x).unwrap())
            .collect::<Vec<_>>();
        assert_eq!(recover_secret(&shards).unwrap(), b"zed > vim");
        assert!(matches!(dealer.shard(0), Err(Error::ZeroShardId)));
    }

    #[test]
    fn split_parameter_validation() {
        assert!(matches!(
            split_secret(b"x", 3, 1, &mut OsRng),
            Err(Error::InvalidThreshold { threshold: 1 })
        ));
        assert!(matches!(
            split_secret(b"x", 2, 3, &mut OsRng),
            Err(Error::ThresholdExceedsShards {
                threshold: 3,
                shards: 2
            })
        ));
        assert!(matches!(
            split_secret(b"x", 256, 2, &mut OsRng),
            Err(Error::TooManyShards { shards: 256 })
        ));
        assert!(matches!(
            split_secret(b"", 3, 2, &mut OsRng),
            Err(Error::EmptySecret)
        ));
    }

    #[test]
    fn recover_parameter_validation() {
        let shards = split_secret(b"secret", 3, 2, &mut OsRng).unwrap();
        assert!(matches!(
            recover_secret(&shards[..1]),
            Err(Error::TooFewShards { shards: 1 })
        ));

        let short = Shard::from_bytes(&shards[1].to_bytes()[1..]).unwrap();
        assert!(matches!(
            recover_secret([shards[0].clone(), short]),
            Err(Error::MismatchedShards)
        ));

        assert!(matches!(
            recover_secret([shards[0].clone(), shards[0].clone()]),
            Err(Error::Lagrange(_))
        ));
    }
}
