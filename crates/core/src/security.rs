//! Security utilities: ETags, password hashing, opaque token sealing, and
//! webhook signature verification.

use aes_gcm::aead::{Aead, KeyInit, OsRng};
use aes_gcm::{Aes256Gcm, Nonce};
use anyhow::{Context, Result};
use hmac::{Hmac, Mac};
use rand::RngCore;
use sha2::{Digest, Sha256};

type HmacSha256 = Hmac<Sha256>;

/// Generate an ETag for an entity from its serialized content.
///
/// ETags must be based on content, not timestamps, to avoid false
/// conflicts with clock skew between client and server.
pub fn generate_etag(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    format!("{:x}", hasher.finalize())
}

/// Hash a password using Argon2id.
pub fn hash_password(password: &str) -> Result<String> {
    use argon2::{
        Argon2,
        password_hash::{PasswordHasher, SaltString, rand_core::OsRng as Argon2Rng},
    };

    let salt = SaltString::generate(&mut Argon2Rng);
    let argon2 = Argon2::default();

    let hash = argon2
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!("failed to hash password: {e}"))?;

    Ok(hash.to_string())
}

/// Verify a password against an Argon2id hash.
pub fn verify_password(password: &str, hash: &str) -> Result<bool> {
    use argon2::{
        Argon2,
        password_hash::{PasswordHash, PasswordVerifier},
    };

    let parsed_hash =
        PasswordHash::new(hash).map_err(|e| anyhow::anyhow!("failed to parse password hash: {e}"))?;

    let argon2 = Argon2::default();

    Ok(argon2
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}

/// Encrypt/decrypt opaque secrets (OAuth refresh tokens, etc.) with a key
/// derived from `SECRET_KEY`.
///
/// This stands in for the sealing service the distilled spec treats as an
/// external collaborator (`seal(str)->str` / `open(str)->str`); callers
/// never see the underlying scheme.
pub struct TokenSealer {
    cipher: Aes256Gcm,
}

impl TokenSealer {
    pub fn new(secret_key: &str) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(secret_key.as_bytes());
        let key_bytes = hasher.finalize();
        let cipher = Aes256Gcm::new_from_slice(&key_bytes).expect("SHA-256 output is always 32 bytes");
        Self { cipher }
    }

    /// Seal a plaintext token into an opaque, storable string.
    pub fn seal(&self, plain_text: &str) -> Result<String> {
        let mut nonce_bytes = [0u8; 12];
        OsRng.fill_bytes(&mut nonce_bytes);
        let nonce = Nonce::from_slice(&nonce_bytes);

        let ciphertext = self
            .cipher
            .encrypt(nonce, plain_text.as_bytes())
            .map_err(|e| anyhow::anyhow!("failed to seal token: {e}"))?;

        let mut payload = nonce_bytes.to_vec();
        payload.extend_from_slice(&ciphertext);
        Ok(base64::Engine::encode(
            &base64::engine::general_purpose::STANDARD,
            payload,
        ))
    }

    /// Recover the plaintext token from a sealed string.
    pub fn open(&self, sealed: &str) -> Result<String> {
        let payload = base64::Engine::decode(&base64::engine::general_purpose::STANDARD, sealed)
            .context("sealed token is not valid base64")?;
        if payload.len() < 12 {
            anyhow::bail!("sealed token is too short");
        }
        let (nonce_bytes, ciphertext) = payload.split_at(12);
        let nonce = Nonce::from_slice(nonce_bytes);

        let plain = self
            .cipher
            .decrypt(nonce, ciphertext)
            .map_err(|e| anyhow::anyhow!("failed to open token: {e}"))?;

        String::from_utf8(plain).context("sealed token did not decrypt to valid UTF-8")
    }
}

/// Verify an HMAC-SHA256 webhook signature against a raw request body.
///
/// Gmail's push-notification auth is a stub in this system (see
/// `DESIGN.md`): this function is the verification primitive a concrete
/// webhook handler would call once the provider's exact signing scheme is
/// wired up.
pub fn verify_webhook_signature(body: &[u8], signature_hex: &str, secret: &str) -> Result<bool> {
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).map_err(|e| anyhow::anyhow!("invalid HMAC key: {e}"))?;
    mac.update(body);
    let expected = hex::decode(signature_hex).context("signature is not valid hex")?;
    Ok(mac.verify_slice(&expected).is_ok())
}
