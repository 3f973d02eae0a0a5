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

use crate::{kdf::KEY_LENGTH, Error};

use std::fmt;

use aead::{Aead, KeyInit};
use aes::Aes256;
use aes_gcm::Aes256Gcm;
use ctr::cipher::{KeyIvInit, StreamCipher};
use rand::{rngs::OsRng, RngCore};
use zeroize::Zeroizing;

type PayloadKey = aead::Key<Aes256Gcm>;
type PayloadNonce = aead::Nonce<Aes256Gcm>;

/// AES-256 in counter mode, with the whole 16-byte block used as a big-endian
/// counter.
type ShareCipher = ctr::Ctr128BE<Aes256>;
type ShareKey = ctr::cipher::Key<ShareCipher>;
type ShareIv = ctr::cipher::Iv<ShareCipher>;

/// Length of the nonce prepended to an AEAD-sealed payload.
pub const AEAD_NONCE_LENGTH: usize = 12;

/// Length of the GCM tag appended to an AEAD-sealed payload.
pub const AEAD_TAG_LENGTH: usize = 16;

/// Length of the IV prepended to an encrypted share (one AES block).
pub const STREAM_IV_LENGTH: usize = 16;

#[cfg(test)]
#[test]
fn check_length_consts() {
    // GenericArray doesn't give us a way to get the size, so we need to do this
    // in a test...
    assert_eq!(KEY_LENGTH, PayloadKey::default().len());
    assert_eq!(AEAD_NONCE_LENGTH, PayloadNonce::default().len());
    assert_eq!(AEAD_TAG_LENGTH, aead::Tag::<Aes256Gcm>::default().len());
    assert_eq!(KEY_LENGTH, ShareKey::default().len());
    assert_eq!(STREAM_IV_LENGTH, ShareIv::default().len());
}

/// Fill `buf` from the operating system's CSPRNG.
pub(crate) fn fill_random(buf: &mut [u8]) -> Result<(), Error> {
    OsRng.try_fill_bytes(buf).map_err(Error::from)
}

/// The data encryption key (DEK) which protects the payload of a sealed
/// secret.
///
/// A `DataKey` is what the answers to a quorum of questions unlock. Holding
/// one is sufficient to read *and* replace the payload of the sealed secret it
/// was recovered from, so it should be discarded as soon as it is no longer
/// needed (the backing memory is zeroed on drop).
#[derive(Clone)]
pub struct DataKey(Zeroizing<[u8; KEY_LENGTH]>);

impl DataKey {
    pub(crate) fn generate() -> Result<Self, Error> {
        let mut key = Zeroizing::new([0u8; KEY_LENGTH]);
        fill_random(&mut key[..])?;
        Ok(Self(key))
    }

    pub fn from_bytes(bytes: [u8; KEY_LENGTH]) -> Self {
        Self(Zeroizing::new(bytes))
    }

    pub fn as_bytes(&self) -> &[u8; KEY_LENGTH] {
        &self.0
    }
}

impl TryFrom<&[u8]> for DataKey {
    type Error = Error;

    fn try_from(bytes: &[u8]) -> Result<Self, Self::Error> {
        let mut key = Zeroizing::new([0u8; KEY_LENGTH]);
        if bytes.len() != KEY_LENGTH {
            return Err(Error::InvalidKeyLength {
                expected: KEY_LENGTH,
                actual: bytes.len(),
            });
        }
        key.copy_from_slice(bytes);
        Ok(Self(key))
    }
}

impl fmt::Debug for DataKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("DataKey(<redacted>)")
    }
}

/// Encrypt `plaintext` with AES-256-GCM under `key`, returning
/// `nonce || ciphertext || tag`. A fresh nonce is generated for every call.
pub(crate) fn seal_payload(plaintext: &[u8], key: &DataKey) -> Result<Vec<u8>, Error> {
    let mut nonce = [0u8; AEAD_NONCE_LENGTH];
    fill_random(&mut nonce)?;

    let aead = Aes256Gcm::new(PayloadKey::from_slice(key.as_bytes()));
    let ciphertext = aead
        .encrypt(PayloadNonce::from_slice(&nonce), plaintext)
        .map_err(Error::AeadEncryption)?;

    let mut blob = Vec::with_capacity(nonce.len() + ciphertext.len());
    blob.extend_from_slice(&nonce);
    blob.extend_from_slice(&ciphertext);
    Ok(blob)
}

/// Inverse of [`seal_payload`].
///
/// A truncated blob, a modified blob and the wrong key are all reported as
/// the same [`Error::IncorrectKey`].
pub(crate) fn open_payload(blob: &[u8], key: &DataKey) -> Result<Vec<u8>, Error> {
    if blob.len() < AEAD_NONCE_LENGTH + AEAD_TAG_LENGTH {
        return Err(Error::IncorrectKey);
    }
    let (nonce, ciphertext) = blob.split_at(AEAD_NONCE_LENGTH);

    let aead = Aes256Gcm::new(PayloadKey::from_slice(key.as_bytes()));
    aead.decrypt(PayloadNonce::from_slice(nonce), ciphertext)
        .map_err(|_| Error::IncorrectKey)
}

fn apply_stream(buf: &mut [u8], kek: &[u8; KEY_LENGTH], iv: &[u8]) {
    let mut stream = ShareCipher::new(ShareKey::from_slice(kek), ShareIv::from_slice(iv));
    stream.apply_keystream(buf);
}

/// Encrypt a share with the AES-256-CTR keystream derived from `kek`, returning
/// `iv || ciphertext`.
///
/// There is no authentication at this layer. Decrypting with the wrong key
/// yields a garbage share, which is only detected once the combined DEK fails
/// to open the payload.
pub(crate) fn encrypt_share(share: &[u8], kek: &[u8; KEY_LENGTH]) -> Result<Vec<u8>, Error> {
    let mut iv = [0u8; STREAM_IV_LENGTH];
    fill_random(&mut iv)?;

    let mut blob = Vec::with_capacity(iv.len() + share.len());
    blob.extend_from_slice(&iv);
    blob.extend_from_slice(share);
    apply_stream(&mut blob[STREAM_IV_LENGTH..], kek, &iv);
    Ok(blob)
}

/// Inverse of [`encrypt_share`]. The only possible failure is a blob too
/// short to hold an IV.
pub(crate) fn decrypt_share(
    blob: &[u8],
    kek: &[u8; KEY_LENGTH],
) -> Result<Zeroizing<Vec<u8>>, Error> {
    if blob.len() < STREAM_IV_LENGTH {
        return Err(Error::InvalidEnvelope(
            "encrypted share is shorter than its iv".into(),
        ));
    }
    let (iv, ciphertext) = blob.split_at(STREAM_IV_LENGTH);

    let mut share = Zeroizing::new(ciphertext.to_vec());
    apply_stream(&mut share, kek, iv);
    Ok(share)
}

#[cfg(test)]
mod test {
    use super::*;

    use quickcheck::TestResult;

    #[quickcheck]
    fn payload_roundtrip(plaintext: Vec<u8>) -> bool {
        let key = DataKey::generate().unwrap();
        let blob = seal_payload(&plaintext, &key).unwrap();
        blob.len() == AEAD_NONCE_LENGTH + plaintext.len() + AEAD_TAG_LENGTH
            && open_payload(&blob, &key).unwrap() == plaintext
    }

    #[test]
    fn payload_nonce_is_fresh() {
        let key = DataKey::generate().unwrap();
        let blob1 = seal_payload(b"zed > vim", &key).unwrap();
        let blob2 = seal_payload(b"zed > vim", &key).unwrap();
        assert_ne!(&blob1[..AEAD_NONCE_LENGTH], &blob2[..AEAD_NONCE_LENGTH]);
        assert_ne!(blob1, blob2);
    }

    #[quickcheck]
    fn payload_tamper_detected(plaintext: Vec<u8>, idx: usize, flip: u8) -> TestResult {
        if flip == 0 {
            return TestResult::discard();
        }
        let key = DataKey::generate().unwrap();
        let mut blob = seal_payload(&plaintext, &key).unwrap();
        let idx = idx % blob.len();
        blob[idx] ^= flip;

        TestResult::from_bool(matches!(
            open_payload(&blob, &key),
            Err(Error::IncorrectKey)
        ))
    }

    #[test]
    fn payload_failures_are_indistinguishable() {
        let key = DataKey::generate().unwrap();
        let other = DataKey::generate().unwrap();
        let blob = seal_payload(b"zed > vim", &key).unwrap();

        let wrong_key = open_payload(&blob, &other).unwrap_err();
        let truncated = open_payload(&blob[..AEAD_NONCE_LENGTH + 3], &key).unwrap_err();
        let mut corrupted = blob.clone();
        corrupted[AEAD_NONCE_LENGTH] ^= 0xff;
        let corrupted = open_payload(&corrupted, &key).unwrap_err();

        for err in [wrong_key, truncated, corrupted] {
            assert!(matches!(err, Error::IncorrectKey));
            assert_eq!(err.to_string(), Error::IncorrectKey.to_string());
        }
    }

    #[quickcheck]
    fn share_roundtrip(share: Vec<u8>, kek: Vec<u8>) -> bool {
        let mut key = [0u8; KEY_LENGTH];
        kek.iter().zip(key.iter_mut()).for_each(|(k, b)| *b = *k);

        let blob = encrypt_share(&share, &key).unwrap();
        blob.len() == STREAM_IV_LENGTH + share.len()
            && *decrypt_share(&blob, &key).unwrap() == share
    }

    #[test]
    fn share_wrong_key_is_garbage() {
        let share = b"0123456789abcdef0123456789abcdef!";
        let blob = encrypt_share(share, &[1u8; KEY_LENGTH]).unwrap();
        let garbage = decrypt_share(&blob, &[2u8; KEY_LENGTH]).unwrap();
        assert_eq!(garbage.len(), share.len());
        assert_ne!(&garbage[..], &share[..]);
    }

    fn unhex(s: &str) -> Vec<u8> {
        (0..s.len())
            .step_by(2)
            .map(|i| u8::from_str_radix(&s[i..i + 2], 16).unwrap())
            .collect()
    }

    // NIST SP 800-38A F.5.5 (CTR-AES256.Encrypt), where the counter carries
    // out of the last byte of the IV.
    #[test]
    fn share_cipher_is_aes256_ctr() {
        let mut kek = [0u8; KEY_LENGTH];
        kek.copy_from_slice(&unhex(
            "603deb1015ca71be2b73aef0857d77811f352c073b6108d72d9810a30914dff4",
        ));
        let blob = [
            unhex("f0f1f2f3f4f5f6f7f8f9fafbfcfdfeff"),
            unhex("601ec313775789a5b7a7f504bbf3d228f443e3ca4d62b59aca84e990cacaf5c5"),
        ]
        .concat();

        assert_eq!(
            *decrypt_share(&blob, &kek).unwrap(),
            unhex("6bc1bee22e409f96e93d7e117393172aae2d8a571e03ac9c9eb76fac45af8e51")
        );
    }

    #[test]
    fn share_too_short() {
        assert!(decrypt_share(&[0u8; STREAM_IV_LENGTH - 1], &[0u8; KEY_LENGTH]).is_err());
        assert!(decrypt_share(&[0u8; STREAM_IV_LENGTH], &[0u8; KEY_LENGTH])
            .unwrap()
            .is_empty());
    }

    #[test]
    fn data_key_length_checked() {
        assert!(DataKey::try_from(&[0u8; KEY_LENGTH][..]).is_ok());
        assert!(matches!(
            DataKey::try_from(&[0u8; 16][..]),
            Err(Error::InvalidKeyLength {
                expected: KEY_LENGTH,
                actual: 16
            })
        ));
        assert_eq!(
            format!("{:?}", DataKey::from_bytes([9; KEY_LENGTH])),
            "DataKey(<redacted>)"
        );
    }
}
