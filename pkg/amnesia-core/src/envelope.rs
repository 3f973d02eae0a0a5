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

use crate::{questions::QuestionId, v1, Error};

use serde::Deserialize;
use tracing::trace;

/// A decoded sealed secret of any supported version.
#[derive(Clone, Debug, PartialEq)]
#[non_exhaustive]
pub enum Envelope {
    V1(v1::SealedSecret),
}

impl Envelope {
    /// Decode a persisted sealed secret, dispatching on its `version` tag.
    ///
    /// Unknown versions are always rejected, there is no fallback to the
    /// newest version this crate knows about.
    pub fn decode<B: AsRef<[u8]>>(bytes: B) -> Result<Self, Error> {
        #[derive(Deserialize)]
        struct Versioned {
            version: String,
        }

        let bytes = bytes.as_ref();
        let Versioned { version } =
            serde_json::from_slice(bytes).map_err(Error::MalformedEnvelope)?;
        trace!(version = version.as_str(), "decoding sealed secret");

        match version.as_str() {
            v1::VERSION => v1::SealedSecret::decode(bytes).map(Self::V1),
            _ => Err(Error::UnknownVersion(version)),
        }
    }

    pub fn encode(&self) -> Result<Vec<u8>, Error> {
        match self {
            Self::V1(sealed) => sealed.encode(),
        }
    }

    pub fn version(&self) -> &str {
        match self {
            Self::V1(sealed) => sealed.version(),
        }
    }

    pub fn sealed_timestamp(&self) -> &str {
        match self {
            Self::V1(sealed) => sealed.sealed_timestamp(),
        }
    }

    /// The (id, text) of every question this secret was sealed behind.
    pub fn questions(&self) -> Vec<(QuestionId, &str)> {
        match self {
            Self::V1(sealed) => sealed.questions().collect(),
        }
    }

    pub fn id(&self) -> String {
        match self {
            Self::V1(sealed) => sealed.id(),
        }
    }
}

impl From<v1::SealedSecret> for Envelope {
    fn from(sealed: v1::SealedSecret) -> Self {
        Self::V1(sealed)
    }
}
