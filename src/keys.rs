// File: src/keys.rs
//
// Key Material
//
// The harness never validates signatures; it only needs key material the
// node under test will accept: a random secret to import into a wallet and
// a deterministic address derived from it for the genesis allocation.

use rand::RngCore;
use sha3::{Digest, Sha3_256};

const SECRET_SIZE: usize = 32;
const ADDRESS_SIZE: usize = 20;
const ADDRESS_PREFIX: &str = "lda1";

/// A private/public key pair.
///
/// Used both as a participant's wallet-import key and, for the trust
/// delegate, as its block-signing credential.
#[derive(Clone, PartialEq, Eq)]
pub struct KeyPair {
    secret: [u8; SECRET_SIZE],
    public: [u8; SECRET_SIZE],
}

impl KeyPair {
    /// Generate a fresh key pair from the OS RNG.
    pub fn generate() -> Self {
        let mut secret = [0u8; SECRET_SIZE];
        rand::rngs::OsRng.fill_bytes(&mut secret);
        Self::from_secret(secret)
    }

    pub fn from_secret(secret: [u8; SECRET_SIZE]) -> Self {
        let public: [u8; SECRET_SIZE] = Sha3_256::digest(secret).into();
        Self { secret, public }
    }

    /// Hex encoding of the secret, as consumed by `importprivatekey`.
    pub fn secret_hex(&self) -> String {
        hex::encode(self.secret)
    }

    pub fn public_hex(&self) -> String {
        hex::encode(self.public)
    }

    /// The address the ledger derives from this key's public half.
    pub fn address(&self) -> String {
        let digest = Sha3_256::digest(self.public);
        format!("{}{}", ADDRESS_PREFIX, hex::encode(&digest[..ADDRESS_SIZE]))
    }
}

impl std::fmt::Debug for KeyPair {
    // Secrets stay out of logs.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyPair")
            .field("address", &self.address())
            .finish_non_exhaustive()
    }
}
