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
    cipher::{self, DataKey},
    kdf::KdfParams,
    questions::Answers,
    shamir::{self, Shard},
    v1::{now_timestamp, SealedSecret},
    Error,
};

use tracing::debug;
use zeroize::Zeroizing;

/// Combine the shares unlocked by `answers` into a candidate DEK.
///
/// Shares whose question has no (or a blank) answer are skipped. The result
/// is only a candidate: wrong answers produce a wrong key rather than an
/// error, so it must be checked against the payload before being trusted.
fn combine_key(
    params: &KdfParams,
    sealed: &SealedSecret,
    answers: &Answers,
) -> Result<DataKey, Error> {
    let shards = sealed
        .shares
        .iter()
        .filter_map(|share| answers.get(share.id).map(|answer| (share, answer)))
        .map(|(share, answer)| {
            let kek = params.derive(answer, &share.salt)?;
            let shard = cipher::decrypt_share(&share.share, &kek)?;
            Shard::from_bytes(&*shard).map_err(|_| Error::IncorrectAnswers)
        })
        .collect::<Result<Vec<_>, Error>>()?;

    debug!(
        shares = sealed.shares.len(),
        answered = shards.len(),
        "combining shares"
    );

    let key = shamir::recover_secret(&shards)
        .map(Zeroizing::new)
        .map_err(|_| Error::IncorrectAnswers)?;
    DataKey::try_from(&key[..]).map_err(|_| Error::IncorrectAnswers)
}

/// Recover the DEK of `sealed` using `answers`.
///
/// The key is only returned once it has been shown to open the current
/// payload.
pub(crate) fn recover_key(
    params: &KdfParams,
    sealed: &SealedSecret,
    answers: &Answers,
) -> Result<DataKey, Error> {
    let key = combine_key(params, sealed, answers)?;
    cipher::open_payload(&sealed.encrypted, &key)
        .map(Zeroizing::new)
        .map_err(|_| Error::IncorrectAnswers)?;
    Ok(key)
}

pub(crate) fn unseal(
    params: &KdfParams,
    sealed: &SealedSecret,
    answers: &Answers,
) -> Result<Vec<u8>, Error> {
    let key = combine_key(params, sealed, answers)?;
    let secret =
        cipher::open_payload(&sealed.encrypted, &key).map_err(|_| Error::IncorrectAnswers);
    debug!(success = secret.is_ok(), "unsealed secret");
    secret
}

pub(crate) fn unseal_with_key(sealed: &SealedSecret, key: &DataKey) -> Result<Vec<u8>, Error> {
    cipher::open_payload(&sealed.encrypted, key)
}

/// Replace the payload of `sealed` with `secret`, leaving every share as it
/// was. `key` must open the existing payload.
pub(crate) fn reseal_with_key(
    sealed: &SealedSecret,
    secret: &[u8],
    key: &DataKey,
) -> Result<SealedSecret, Error> {
    cipher::open_payload(&sealed.encrypted, key).map(Zeroizing::new)?;

    debug!(secret_len = secret.len(), "resealing secret");
    Ok(SealedSecret {
        sealed_timestamp: now_timestamp(),
        encrypted: cipher::seal_payload(secret, key)?,
        ..sealed.clone()
    })
}
