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

use crate::{questions::QuestionId, shamir::Error as ShamirError};

/// Coarse classification of an [`Error`].
///
/// Callers that only need to decide *how* to report a failure (re-prompt for
/// answers, reject a file, abort) should match on this rather than on the
/// individual variants.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Inputs were rejected before any cryptographic work was done.
    Validation,
    /// A sealed secret could not be parsed, or has an unsupported version.
    Format,
    /// The answers (or key) did not unlock the sealed secret.
    Recovery,
    /// The execution environment is broken (random source, KDF backend).
    System,
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("too few questions, minimum is {min}")]
    TooFewQuestions { min: usize },

    #[error("too many questions, maximum is {max}")]
    TooManyQuestions { max: usize },

    #[error("too few answers, minimum is {min}")]
    TooFewAnswers { min: usize },

    #[error("too many answers, maximum is {max}")]
    TooManyAnswers { max: usize },

    #[error("question id {0} is already in use")]
    DuplicateQuestionId(QuestionId),

    #[error("answer to question {0} is empty")]
    EmptyAnswer(QuestionId),

    #[error("threshold {threshold} must be between {min} and the number of questions ({questions})")]
    InvalidThreshold {
        threshold: usize,
        min: usize,
        questions: usize,
    },

    #[error("invalid key derivation parameters: {0}")]
    KdfParams(argon2::Error),

    #[error("invalid key length: expected {expected} bytes but got {actual}")]
    InvalidKeyLength { expected: usize, actual: usize },

    #[error("failed to parse sealed secret: {0}")]
    MalformedEnvelope(serde_json::Error),

    #[error("invalid sealed secret: {0}")]
    InvalidEnvelope(String),

    #[error("unknown seal version: {0}")]
    UnknownVersion(String),

    #[error("failed to serialise sealed secret: {0}")]
    EnvelopeEncode(serde_json::Error),

    #[error("incorrect or insufficient answers")]
    IncorrectAnswers,

    #[error("key does not unlock sealed secret")]
    IncorrectKey,

    #[error("secure random source failed: {0}")]
    Entropy(#[from] rand::Error),

    #[error("key derivation failed: {0}")]
    Kdf(argon2::Error),

    #[error("aead encryption cryptographic error: {0}")]
    AeadEncryption(aead::Error),

    #[error("shamir algorithm operation: {0}")]
    Shamir(#[from] ShamirError),
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::TooFewQuestions { .. }
            | Self::TooManyQuestions { .. }
            | Self::TooFewAnswers { .. }
            | Self::TooManyAnswers { .. }
            | Self::DuplicateQuestionId(_)
            | Self::EmptyAnswer(_)
            | Self::InvalidThreshold { .. }
            | Self::KdfParams(_)
            | Self::InvalidKeyLength { .. } => ErrorKind::Validation,
            Self::MalformedEnvelope(_)
            | Self::InvalidEnvelope(_)
            | Self::UnknownVersion(_)
            | Self::EnvelopeEncode(_) => ErrorKind::Format,
            Self::IncorrectAnswers | Self::IncorrectKey => ErrorKind::Recovery,
            Self::Entropy(_) | Self::Kdf(_) | Self::AeadEncryption(_) | Self::Shamir(_) => {
                ErrorKind::System
            }
        }
    }
}
