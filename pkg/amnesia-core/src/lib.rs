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

#![forbid(unsafe_code)]

//! Seal a secret behind a set of security questions.
//!
//! The secret is encrypted under a random data key, which is split with
//! Shamir Secret Sharing so that any `threshold` of the questions can recover
//! it. Each share is in turn encrypted under a key derived (with Argon2id)
//! from the answer to its question. Only salts, encrypted shares and the
//! encrypted secret are ever written out.
//!
//! ```no_run
//! use amnesia_core::{Answers, Question, Questions};
//!
//! let mut questions = Questions::new();
//! questions.push(Question::new("What's your favourite animal?", "cat"));
//! questions.push(Question::new("What's your favourite food?", "pizza"));
//! let sealed = amnesia_core::seal(b"zed > vim", &questions, 2)?;
//!
//! let answers = [(0, "cat"), (1, "pizza")].into_iter().collect::<Answers>();
//! assert_eq!(amnesia_core::unseal(&sealed, &answers)?, b"zed > vim");
//! # Ok::<(), amnesia_core::Error>(())
//! ```

#[cfg(test)]
extern crate quickcheck;
#[cfg(test)]
#[macro_use]
extern crate quickcheck_macros;

/// Implementation of Shamir Secret Sharing.
#[cfg(not(feature = "donotuse_expose_internal_modules"))]
mod shamir;

// Expose the module so we can benchmark it with criterion. This feature is only enabled as a
// dev-dependency.
#[cfg(feature = "donotuse_expose_internal_modules")]
pub mod shamir;

mod cipher;
mod envelope;
mod error;
mod kdf;
mod questions;

/// Version 1 of the sealed secret format.
///
/// This module includes the envelope types as well as the sealing and
/// unsealing logic for this version.
pub mod v1;

/// Re-export of the newest sealed secret format.
pub use v1 as latest;

pub use cipher::DataKey;
pub use envelope::Envelope;
pub use error::{Error, ErrorKind};
pub use kdf::{KdfParams, KEY_LENGTH, SALT_LENGTH};
pub use questions::{Answers, Question, QuestionId, Questions, MAX_QUESTIONS, MIN_QUESTIONS};

use tracing::debug;

/// Seals and unseals secrets with a particular set of [`KdfParams`].
///
/// The parameters are not recorded in a sealed secret, so the same `Engine`
/// configuration must be used to unseal a secret as was used to seal it. The
/// free functions in this crate use [`Engine::default()`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Engine {
    kdf: KdfParams,
}

impl Engine {
    pub fn new(kdf: KdfParams) -> Self {
        Self { kdf }
    }

    pub fn kdf_params(&self) -> &KdfParams {
        &self.kdf
    }

    /// Seal `secret` behind `questions`, requiring `threshold` correct answers
    /// to unseal it. Returns the encoded envelope.
    pub fn seal<B: AsRef<[u8]>>(
        &self,
        secret: B,
        questions: &Questions,
        threshold: usize,
    ) -> Result<Vec<u8>, Error> {
        latest::seal(&self.kdf, secret.as_ref(), questions, threshold)?.encode()
    }

    /// Unseal an encoded envelope using `answers`.
    ///
    /// Questions without an answer (or with a blank one) are skipped. Wrong
    /// and missing answers both result in [`Error::IncorrectAnswers`].
    pub fn unseal<B: AsRef<[u8]>>(&self, sealed: B, answers: &Answers) -> Result<Vec<u8>, Error> {
        answers.validate()?;
        match decode(sealed)? {
            Envelope::V1(sealed) => v1::unseal(&self.kdf, &sealed, answers),
        }
    }

    /// Recover the data key of an encoded envelope using `answers`, so that it
    /// can later be opened or resealed without asking the questions again.
    pub fn recover_key<B: AsRef<[u8]>>(
        &self,
        sealed: B,
        answers: &Answers,
    ) -> Result<DataKey, Error> {
        answers.validate()?;
        match decode(sealed)? {
            Envelope::V1(sealed) => v1::recover_key(&self.kdf, &sealed, answers),
        }
    }

    /// Unseal an encoded envelope with a previously recovered data key.
    pub fn unseal_with_key<B: AsRef<[u8]>>(
        &self,
        sealed: B,
        key: &DataKey,
    ) -> Result<Vec<u8>, Error> {
        match decode(sealed)? {
            Envelope::V1(sealed) => v1::unseal_with_key(&sealed, key),
        }
    }

    /// Replace the secret protected by an encoded envelope, using a previously
    /// recovered data key. The shares (and so the questions, threshold and
    /// [`Envelope::id`]) are left untouched.
    pub fn reseal_with_key<B, S>(
        &self,
        sealed: B,
        secret: S,
        key: &DataKey,
    ) -> Result<Vec<u8>, Error>
    where
        B: AsRef<[u8]>,
        S: AsRef<[u8]>,
    {
        let envelope = decode(sealed)?;
        debug!(id = envelope.id().as_str(), "resealing with recovered key");
        match envelope {
            Envelope::V1(sealed) => v1::reseal_with_key(&sealed, secret.as_ref(), key)?.encode(),
        }
    }
}

/// Parse an encoded envelope without doing any cryptography, for instance to
/// find out which questions to ask.
pub fn decode<B: AsRef<[u8]>>(sealed: B) -> Result<Envelope, Error> {
    Envelope::decode(sealed)
}

/// [`Engine::seal`] with the default [`KdfParams`].
pub fn seal<B: AsRef<[u8]>>(
    secret: B,
    questions: &Questions,
    threshold: usize,
) -> Result<Vec<u8>, Error> {
    Engine::default().seal(secret, questions, threshold)
}

/// [`Engine::unseal`] with the default [`KdfParams`].
pub fn unseal<B: AsRef<[u8]>>(sealed: B, answers: &Answers) -> Result<Vec<u8>, Error> {
    Engine::default().unseal(sealed, answers)
}

/// [`Engine::recover_key`] with the default [`KdfParams`].
pub fn recover_key<B: AsRef<[u8]>>(sealed: B, answers: &Answers) -> Result<DataKey, Error> {
    Engine::default().recover_key(sealed, answers)
}

/// [`Engine::unseal_with_key`].
pub fn unseal_with_key<B: AsRef<[u8]>>(sealed: B, key: &DataKey) -> Result<Vec<u8>, Error> {
    Engine::default().unseal_with_key(sealed, key)
}

/// [`Engine::reseal_with_key`].
pub fn reseal_with_key<B, S>(sealed: B, secret: S, key: &DataKey) -> Result<Vec<u8>, Error>
where
    B: AsRef<[u8]>,
    S: AsRef<[u8]>,
{
    Engine::default().reseal_with_key(sealed, secret, key)
}
