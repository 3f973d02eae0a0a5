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
    kdf::{KdfParams, SALT_LENGTH},
    questions::Questions,
    shamir::{self, MIN_THRESHOLD},
    v1::{now_timestamp, SealedSecret, Share, VERSION},
    Error,
};

use rand::{
    rngs::{OsRng, StdRng},
    SeedableRng,
};
use tracing::{debug, trace};
use zeroize::Zeroizing;

/// Seal `secret` so that any `threshold` of the `questions` must be answered
/// correctly to recover it.
pub(crate) fn seal(
    params: &KdfParams,
    secret: &[u8],
    questions: &Questions,
    threshold: usize,
) -> Result<SealedSecret, Error> {
    questions.validate()?;
    if !(MIN_THRESHOLD..=questions.len()).contains(&threshold) {
        return Err(Error::InvalidThreshold {
            threshold,
            min: MIN_THRESHOLD,
            questions: questions.len(),
        });
    }
    if let Some((id, _)) = questions.iter().find(|(_, q)| q.answer().is_empty()) {
        return Err(Error::EmptyAnswer(id));
    }

    debug!(
        questions = questions.len(),
        threshold,
        secret_len = secret.len(),
        "sealing secret"
    );

    let dek = DataKey::generate()?;
    let encrypted = cipher::seal_payload(secret, &dek)?;

    let mut rng = StdRng::from_rng(OsRng)?;
    let shards = shamir::split_secret(dek.as_bytes(), questions.len(), threshold, &mut rng)?;

    let shares = questions
        .iter()
        .zip(shards)
        .map(|((id, question), shard)| {
            let mut salt = [0u8; SALT_LENGTH];
            cipher::fill_random(&mut salt)?;

            let kek = params.derive(question.answer(), salt)?;
            let x = shard.id();
            let shard = Zeroizing::new(shard.to_bytes());
            let share = cipher::encrypt_share(&shard, &kek)?;
            trace!(question = id, x, "encrypted share");

            Ok(Share {
                id,
                question: question.question().to_string(),
                salt: salt.to_vec(),
                share,
                extra: Default::default(),
            })
        })
        .collect::<Result<Vec<_>, Error>>()?;

    Ok(SealedSecret {
        version: VERSION.to_string(),
        sealed_timestamp: now_timestamp(),
        shares,
        encrypted,
        extra: Default::default(),
    })
}

#[cfg(test)]
mod test {
    use super::*;

    use crate::{questions::Question, ErrorKind};

    fn cheap() -> KdfParams {
        KdfParams::new(1, 8, 1).unwrap()
    }

    fn questions(n: usize) -> Questions {
        let mut questions = Questions::new();
        for i in 0..n {
            questions.push(Question::new(format!("question {}", i), format!("answer {}", i)));
        }
        questions
    }

    #[test]
    fn seal_threshold_bounds() {
        let questions = questions(3);
        for threshold in [0, 1, 4, 255] {
            let err = seal(&cheap(), b"secret", &questions, threshold).unwrap_err();
            assert!(matches!(err, Error::InvalidThreshold { .. }), "{:?}", err);
            assert_eq!(err.kind(), ErrorKind::Validation);
        }
        for threshold in 2..=3 {
            assert!(seal(&cheap(), b"secret", &questions, threshold).is_ok());
        }
    }

    #[test]
    fn seal_empty_answer() {
        let mut questions = questions(2);
        questions.insert(7, Question::new("favourite food", "")).unwrap();
        assert!(matches!(
            seal(&cheap(), b"secret", &questions, 2),
            Err(Error::EmptyAnswer(7))
        ));
    }

    #[test]
    fn seal_fresh_material() {
        let questions = questions(2);
        let sealed1 = seal(&cheap(), b"secret", &questions, 2).unwrap();
        let sealed2 = seal(&cheap(), b"secret", &questions, 2).unwrap();

        assert_ne!(sealed1.encrypted, sealed2.encrypted);
        for (share1, share2) in sealed1.shares.iter().zip(&sealed2.shares) {
            assert_eq!(share1.id, share2.id);
            assert_ne!(share1.salt, share2.salt);
            assert_ne!(share1.share, share2.share);
        }
        assert_ne!(sealed1.id(), sealed2.id());
    }

    #[test]
    fn seal_distinct_salts() {
        let sealed = seal(&cheap(), b"secret", &questions(16), 5).unwrap();
        let mut salts = sealed.shares.iter().map(|s| &s.salt).collect::<Vec<_>>();
        salts.sort();
        salts.dedup();
        assert_eq!(salts.len(), 16);
    }

    #[test]
    fn seal_empty_secret() {
        // An empty payload is still a valid thing to protect.
        let sealed = seal(&cheap(), b"", &questions(2), 2).unwrap();
        assert!(SealedSecret::decode(sealed.encode().unwrap()).is_ok());
    }
}
