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

use crate::Error;

use argon2::{Algorithm, Argon2, Params, Version};
use zeroize::Zeroizing;

/// Length of every key used by amnesia (KEKs and the DEK).
pub const KEY_LENGTH: usize = 32;

/// Length of the per-question random salt.
pub const SALT_LENGTH: usize = 32;

/// Key derived from an answer, used to protect a single share.
pub(crate) type KeyEncryptionKey = Zeroizing<[u8; KEY_LENGTH]>;

/// Argon2id cost parameters used to turn an answer into a key-encryption key.
///
/// Answers to security questions are low-entropy, so the defaults are
/// deliberately expensive. Parameters are not recorded in a sealed secret, so
/// a secret must be unsealed with the same parameters it was sealed with.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct KdfParams {
    passes: u32,
    memory_kib: u32,
    lanes: u32,
}

impl KdfParams {
    pub const DEFAULT_PASSES: u32 = 5;
    pub const DEFAULT_MEMORY_KIB: u32 = 64 * 1024; // 64MiB
    pub const DEFAULT_LANES: u32 = 4;

    /// Construct a custom set of parameters, rejecting any that Argon2id does
    /// not accept (such as less than 8KiB of memory per lane).
    pub fn new(passes: u32, memory_kib: u32, lanes: u32) -> Result<Self, Error> {
        let params = Self {
            passes,
            memory_kib,
            lanes,
        };
        params.argon2_params()?;
        Ok(params)
    }

    pub fn passes(&self) -> u32 {
        self.passes
    }

    pub fn memory_kib(&self) -> u32 {
        self.memory_kib
    }

    pub fn lanes(&self) -> u32 {
        self.lanes
    }

    fn argon2_params(&self) -> Result<Params, Error> {
        Params::new(self.memory_kib, self.passes, self.lanes, Some(KEY_LENGTH))
            .map_err(Error::KdfParams)
    }

    /// Derive a key from `password` and `salt`. The same inputs always produce
    /// the same key.
    pub fn derive<P, S>(&self, password: P, salt: S) -> Result<KeyEncryptionKey, Error>
    where
        P: AsRef<[u8]>,
        S: AsRef<[u8]>,
    {
        let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, self.argon2_params()?);

        let mut key = Zeroizing::new([0u8; KEY_LENGTH]);
        argon2
            .hash_password_into(password.as_ref(), salt.as_ref(), &mut key[..])
            .map_err(Error::Kdf)?;
        Ok(key)
    }
}

impl Default for KdfParams {
    fn default() -> Self {
        Self {
            passes: Self::DEFAULT_PASSES,
            memory_kib: Self::DEFAULT_MEMORY_KIB,
            lanes: Self::DEFAULT_LANES,
        }
    }
}
