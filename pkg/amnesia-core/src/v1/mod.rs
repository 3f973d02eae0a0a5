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

use crate::{
    cipher::{AEAD_NONCE_LENGTH, AEAD_TAG_LENGTH, STREAM_IV_LENGTH},
    kdf::{KEY_LENGTH, SALT_LENGTH},
    questions::{QuestionId, MAX_QUESTIONS, MIN_QUESTIONS},
    Error,
};

use std::collections::BTreeSet;

use chrono::{DateTime, FixedOffset, SecondsFormat, Utc};
use multihash::Multihash;
use multihash_codetable::{Code, MultihashDigest};
use serde::{Deserialize, Serialize};

mod seal;
mod unseal;

pub(crate) use seal::seal;
pub(crate) use unseal::{recover_key, reseal_with_key, unseal, unseal_with_key};

pub type SealedSecretId = String;

/// Version tag written into (and required of) every version 1 envelope.
pub const VERSION: &str = "1";

const CHECKSUM_ALGORITHM: Code = Code::Blake2b256;
const CHECKSUM_MULTIBASE: multibase::Base = multibase::Base::Base32Z;

/// Length of an encrypted share: the IV, one y value for each byte of the
/// DEK, and the shard's x value.
const ENCRYPTED_SHARE_LENGTH: usize = STREAM_IV_LENGTH + KEY_LENGTH + 1;

/// Binary fields are stored as standard (padded) base64 strings.
mod base64_bytes {
    use base64::{engine::general_purpose::STANDARD, Engine};
    use serde::{de::Error as _, Deserialize, Deserializer, Serializer};

    pub(super) fn serialize<S: Serializer>(bytes: &[u8], s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&STANDARD.encode(bytes))
    }

    pub(super) fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(d)?;
        STANDARD.decode(encoded).map_err(D::Error::custom)
    }
}

fn now_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true)
}

fn multihash_short_id(hash: Multihash<64>, length: usize) -> String {
    let chksum = hash.to_bytes();
    let encoded_chksum = multibase::encode(CHECKSUM_MULTIBASE, &chksum);
    // The *suffix* is the ID.
    let short_id = &encoded_chksum[encoded_chksum.len() - length..];

    short_id.to_string()
}

/// One question's share of the DEK, encrypted under the key derived from the
/// answer to that question.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Share {
    id: QuestionId,
    #[serde(default)]
    question: String,
    #[serde(with = "base64_bytes")]
    salt: Vec<u8>,
    #[serde(with = "base64_bytes")]
    share: Vec<u8>,
    #[serde(flatten)]
    extra: serde_json::Map<String, serde_json::Value>,
}

impl Share {
    pub fn id(&self) -> QuestionId {
        self.id
    }

    pub fn question(&self) -> &str {
        &self.question
    }

    pub fn salt(&self) -> &[u8] {
        &self.salt
    }
}

/// A version 1 sealed secret.
///
/// This is the only thing amnesia ever persists. It holds no answers and no
/// plaintext key material, only salts, encrypted shares and the encrypted
/// payload. Fields this version does not know about are kept as-is so that
/// newer writers can extend the format without breaking older readers.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SealedSecret {
    version: String,
    sealed_timestamp: String,
    shares: Vec<Share>,
    #[serde(with = "base64_bytes")]
    encrypted: Vec<u8>,
    #[serde(flatten)]
    extra: serde_json::Map<String, serde_json::Value>,
}

impl SealedSecret {
    pub const ID_LENGTH: usize = 8;

    /// Parse and structurally validate a version 1 envelope. No key
    /// derivation or decryption is done here.
    pub fn decode<B: AsRef<[u8]>>(bytes: B) -> Result<Self, Error> {
        let sealed: Self =
            serde_json::from_slice(bytes.as_ref()).map_err(Error::MalformedEnvelope)?;
        if sealed.version != VERSION {
            return Err(Error::UnknownVersion(sealed.version));
        }
        sealed.validate()?;
        Ok(sealed)
    }

    pub fn encode(&self) -> Result<Vec<u8>, Error> {
        serde_json::to_vec_pretty(self).map_err(Error::EnvelopeEncode)
    }

    fn validate(&self) -> Result<(), Error> {
        let invalid = |msg: String| Err(Error::InvalidEnvelope(msg));

        if !(MIN_QUESTIONS..=MAX_QUESTIONS).contains(&self.shares.len()) {
            return invalid(format!(
                "sealed secret has {} shares, expected between {} and {}",
                self.shares.len(),
                MIN_QUESTIONS,
                MAX_QUESTIONS
            ));
        }

        let mut ids = BTreeSet::new();
        for share in &self.shares {
            if !ids.insert(share.id) {
                return invalid(format!("duplicate share id {}", share.id));
            }
            if share.salt.len() != SALT_LENGTH {
                return invalid(format!(
                    "share {} has a {}-byte salt, expected {}",
                    share.id,
                    share.salt.len(),
                    SALT_LENGTH
                ));
            }
            if share.share.len() != ENCRYPTED_SHARE_LENGTH {
                return invalid(format!(
                    "share {} is {} bytes long, expected {}",
                    share.id,
                    share.share.len(),
                    ENCRYPTED_SHARE_LENGTH
                ));
            }
        }

        if self.encrypted.len() < AEAD_NONCE_LENGTH + AEAD_TAG_LENGTH {
            return invalid("encrypted payload is truncated".into());
        }
        Ok(())
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    /// When the secret was last sealed (or resealed), as written in the
    /// envelope.
    pub fn sealed_timestamp(&self) -> &str {
        &self.sealed_timestamp
    }

    /// Parsed form of [`Self::sealed_timestamp`], if it is valid RFC 3339.
    pub fn sealed_at(&self) -> Option<DateTime<FixedOffset>> {
        DateTime::parse_from_rfc3339(&self.sealed_timestamp).ok()
    }

    pub fn shares(&self) -> &[Share] {
        &self.shares
    }

    /// The questions that must be answered to unseal this secret, in share
    /// order.
    pub fn questions(&self) -> impl Iterator<Item = (QuestionId, &str)> {
        self.shares.iter().map(|s| (s.id, s.question.as_str()))
    }

    pub fn checksum(&self) -> Multihash<64> {
        let mut bytes = Vec::new();
        for share in &self.shares {
            bytes.extend_from_slice(&share.id.to_le_bytes());
            let fields = [
                share.question.as_bytes(),
                share.salt.as_slice(),
                share.share.as_slice(),
            ];
            for field in fields {
                bytes.extend_from_slice(&(field.len() as u64).to_le_bytes());
                bytes.extend_from_slice(field);
            }
        }
        CHECKSUM_ALGORITHM.digest(&bytes)
    }

    /// Short identifier for this sealed secret.
    ///
    /// Only the share material is covered, so resealing a new payload keeps
    /// the same id while sealing from scratch always produces a new one.
    pub fn id(&self) -> SealedSecretId {
        multihash_short_id(self.checksum(), Self::ID_LENGTH)
    }
}
