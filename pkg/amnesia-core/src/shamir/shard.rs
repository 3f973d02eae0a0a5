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
    gf::{GfElem, GfElemPrimitive},
    Error,
};

/// Piece of a secret which has been sharded with [Shamir Secret Sharing][sss].
///
/// The wire format is the `y` value for every byte of the secret followed by
/// the single-byte `x` value, so a shard is always exactly one byte longer
/// than the secret it was split from.
///
/// [sss]: https://en.wikipedia.org/wiki/Shamir%27s_Secret_Sharing
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Shard {
    pub(super) x: GfElem,
    pub(super) ys: Vec<GfElem>,
}

impl Shard {
    /// Returns the *unique* identifier (`x` value) for a given `Shard`.
    ///
    /// If two shards have the same identifier, they cannot be used together for
    /// secret recovery.
    pub fn id(&self) -> GfElemPrimitive {
        self.x.inner()
    }

    /// Length of the secret this shard can help recover.
    pub fn secret_len(&self) -> usize {
        self.ys.len()
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        self.ys
            .iter()
            .map(GfElem::inner)
            .chain(std::iter::once(self.x.inner()))
            .collect()
    }

    pub fn from_bytes<B: AsRef<[u8]>>(bytes: B) -> Result<Self, Error> {
        match bytes.as_ref().split_last() {
            Some((x, ys)) if !ys.is_empty() => Ok(Self {
                x: GfElem::from_inner(*x),
                ys: ys.iter().copied().map(GfElem::from_inner).collect(),
            }),
            _ => Err(Error::ShardTooShort),
        }
    }
}

#[cfg(test)]
impl quickcheck::Arbitrary for Shard {
    fn arbitrary(g: &mut quickcheck::Gen) -> Self {
        Self {
            x: GfElem::arbitrary(g),
            ys: (0..g.size().max(1)).map(|_| GfElem::arbitrary(g)).collect(),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[quickcheck]
    fn shard_bytes_roundtrip(shard: Shard) {
        let shard2 = Shard::from_bytes(shard.to_bytes()).unwrap();
        assert_eq!(shard, shard2);
    }

    #[test]
    fn shard_layout() {
        let shard = Shard::from_bytes([0xaa, 0xbb, 0x07]).unwrap();
        assert_eq!(shard.id(), 0x07);
        assert_eq!(shard.secret_len(), 2);
        assert_eq!(shard.to_bytes(), vec![0xaa, 0xbb, 0x07]);
    }

    #[test]
    fn shard_too_short() {
        assert!(matches!(Shard::from_bytes([]), Err(Error::ShardTooShort)));
        assert!(matches!(Shard::from_bytes([0x01]), Err(Error::ShardTooShort)));
    }
}
