//! # ECIES
//!
//! Ephemeral-static Diffie-Hellman over the curve, HKDF-SHA256 and
//! ChaCha20-Poly1305. Used to send every shareholder its share privately over
//! the broadcast channel.
//!
//! # Examples
//!
//! ```rust
//! use threshold_primitives::{
//!     ecies::{encrypt, decrypt},
//!     curve::bls12377::G1Curve,
//!     group::{Curve, Element}
//! };
//!
//! let message = b"hello";
//! let rng = &mut rand::thread_rng();
//! let secret_key = <G1Curve as Curve>::Scalar::rand(rng);
//! let mut public_key = <G1Curve as Curve>::Point::one();
//! public_key.mul(&secret_key);
//!
//! // encrypt the message with the receiver's public key
//! let ciphertext = encrypt::<G1Curve, _>(&public_key, &message[..], rng).unwrap();
//!
//! // the receiver can then decrypt the ciphertext with their secret key
//! let cleartext = decrypt(&secret_key, &ciphertext).unwrap();
//!
//! assert_eq!(&message[..], &cleartext[..]);
//! ```
use crate::group::{mul_generator, Curve, Element};
use rand_core::RngCore;
use serde::{Deserialize, Serialize};

use chacha20poly1305::{
    aead::{Aead, KeyInit},
    ChaCha20Poly1305, Key, Nonce,
};
use hkdf::Hkdf;
use sha2::Sha256;

// re-export for usage by the avss primitives
pub use chacha20poly1305::aead::Error as EciesError;

const NONCE_LEN: usize = 12;
const KEY_LEN: usize = 32;

/// HKDF info string
const DOMAIN: &[u8] = b"avss-share-encryption";

/// A ciphertext together with the ephemeral public key and nonce needed to
/// decrypt it
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(bound = "")]
pub struct EciesCipher<C: Curve> {
    #[serde(with = "serde_bytes")]
    aead: Vec<u8>,
    ephemeral: C::Point,
    nonce: [u8; NONCE_LEN],
}

/// Encrypts `msg` to the holder of the private key behind `to`
pub fn encrypt<C: Curve, R: RngCore>(
    to: &C::Point,
    msg: &[u8],
    rng: &mut R,
) -> Result<EciesCipher<C>, EciesError> {
    let eph_secret = C::Scalar::rand(rng);
    let ephemeral = mul_generator::<C>(&eph_secret);

    let mut shared = to.clone();
    shared.mul(&eph_secret);
    let cipher = aead::<C>(&ephemeral, &shared)?;

    let mut nonce = [0u8; NONCE_LEN];
    rng.fill_bytes(&mut nonce);
    let aead = cipher.encrypt(Nonce::from_slice(&nonce), msg)?;

    Ok(EciesCipher {
        aead,
        ephemeral,
        nonce,
    })
}

/// Decrypts `cipher` with the recipient's private key. Fails if the
/// ciphertext was not encrypted to this key or was tampered with.
pub fn decrypt<C: Curve>(
    private: &C::Scalar,
    cipher: &EciesCipher<C>,
) -> Result<Vec<u8>, EciesError> {
    let mut shared = cipher.ephemeral.clone();
    shared.mul(private);

    aead::<C>(&cipher.ephemeral, &shared)?
        .decrypt(Nonce::from_slice(&cipher.nonce), cipher.aead.as_slice())
}

/// Keys ChaCha20-Poly1305 with `HKDF-SHA256(ephemeral || shared)`
fn aead<C: Curve>(ephemeral: &C::Point, shared: &C::Point) -> Result<ChaCha20Poly1305, EciesError> {
    let mut ikm = bincode::serialize(ephemeral).map_err(|_| EciesError)?;
    ikm.extend(bincode::serialize(shared).map_err(|_| EciesError)?);

    let mut key = [0u8; KEY_LEN];
    Hkdf::<Sha256>::new(None, &ikm)
        .expand(DOMAIN, &mut key)
        .map_err(|_| EciesError)?;

    Ok(ChaCha20Poly1305::new(Key::from_slice(&key)))
}
