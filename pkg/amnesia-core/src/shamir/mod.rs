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

//! This module implements a Shamir Secret Sharing scheme in GF(2^8), meaning
//! that every byte of the secret is shared independently (and all x and y
//! values are single bytes).
//!
//! The shard format (y values followed by the x value) is identical to the one
//! used by HashiCorp Vault, and like Vault at most 255 shards can be dealt for
//! any one secret.

mod dealer;
mod gf;
mod shard;

pub use dealer::{recover_secret, split_secret, Dealer, MAX_SHARDS, MIN_THRESHOLD};
pub use shard::Shard;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("lagrange interpolation failed: {0}")]
    Lagrange(#[from] gf::Error),

    #[error("cannot split an empty secret")]
    EmptySecret,

    #[error("threshold {threshold} must be between {} and {}", MIN_THRESHOLD, MAX_SHARDS)]
    InvalidThreshold { threshold: usize },

    #[error("threshold {threshold} is larger than the number of shards ({shards})")]
    ThresholdExceedsShards { threshold: usize, shards: usize },

    #[error("cannot deal {shards} shards, maximum is {}", MAX_SHARDS)]
    TooManyShards { shards: usize },

    #[error("shard id must not be zero")]
    ZeroShardId,

    #[error("need at least {} shards to recover a secret, got {shards}", MIN_THRESHOLD)]
    TooFewShards { shards: usize },

    #[error("shards do not all belong to secrets of the same length")]
    MismatchedShards,

    #[error("shard is too short to contain an x value and any y values")]
    ShardTooShort,
}
