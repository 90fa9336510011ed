//! Encrypted allowlist store: AES-256-GCM at rest, Ed25519 peer verification.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

use aes_gcm::aead::{Aead, AeadCore, KeyInit, OsRng};
use aes_gcm::{Aes256Gcm, Nonce};
use data_encoding::HEXLOWER;
use ed25519_dalek::{Signature, Verifier, VerifyingKey};
use sha2::{Digest, Sha256};
use tokio::sync::RwLock;
use tracing::{info, instrument, warn};

use crate::error::{AllowlistError, AllowlistResult};
use crate::model::{AllowlistFile, PeerEntry};

const NONCE_LEN: usize = 12;
const CURRENT_VERSION: u32 = 1;

/// Encrypted, file-backed allowlist of peers permitted to sync a folder.
///
/// The encryption key defaults to `SHA256(allowlist_path)` when none is
/// supplied. This is deterministic (anyone who knows the path can derive the
/// key) rather than secret-backed; it protects the file against casual
/// tampering and accidental disclosure, not against an adversary who already
/// has filesystem access to the folder.
pub struct AllowlistStore {
    path: PathBuf,
    cipher: Aes256Gcm,
    peers: RwLock<BTreeMap<String, PeerEntry>>,
    loaded: AtomicBool,
}

impl AllowlistStore {
    /// Create a store backed by `allowlist_path`, deriving the encryption
    /// key from the path itself.
    #[must_use]
    pub fn new(allowlist_path: impl Into<PathBuf>) -> Self {
        let path = allowlist_path.into();
        let key = derive_path_key(&path);
        Self::with_key(path, key)
    }

    /// Create a store backed by `allowlist_path` using an explicit 32-byte
    /// encryption key.
    ///
    /// # Errors
    ///
    /// Returns [`AllowlistError::InvalidKeyLength`] if `key` is not 32 bytes.
    pub fn with_key_bytes(allowlist_path: impl Into<PathBuf>, key: &[u8]) -> AllowlistResult<Self> {
        let key: [u8; 32] = key
            .try_into()
            .map_err(|_| AllowlistError::InvalidKeyLength { field: "encryption_key" })?;
        Ok(Self::with_key(allowlist_path.into(), key))
    }

    fn with_key(path: PathBuf, key: [u8; 32]) -> Self {
        Self {
            path,
            cipher: Aes256Gcm::new((&key).into()),
            peers: RwLock::new(BTreeMap::new()),
            loaded: AtomicBool::new(false),
        }
    }

    /// Load the allowlist from its encrypted file, if not already loaded.
    ///
    /// A missing file, a truncated file, or a file that fails to decrypt are
    /// all treated as an empty allowlist rather than a hard error, matching
    /// the "start clean on corruption" behavior of the original store.
    #[instrument(name = "allowlist.load", skip(self), fields(path = %self.path.display()))]
    pub async fn load(&self) -> AllowlistResult<()> {
        if self.loaded.load(Ordering::Acquire) {
            return Ok(());
        }

        let Ok(encrypted) = tokio::fs::read(&self.path).await else {
            *self.peers.write().await = BTreeMap::new();
            self.loaded.store(true, Ordering::Release);
            return Ok(());
        };

        if encrypted.len() < NONCE_LEN {
            warn!("allowlist file too short to contain a nonce; starting empty");
            *self.peers.write().await = BTreeMap::new();
            self.loaded.store(true, Ordering::Release);
            return Ok(());
        }

        let (nonce_bytes, ciphertext) = encrypted.split_at(NONCE_LEN);
        let nonce = Nonce::from_slice(nonce_bytes);

        let peers = match self.cipher.decrypt(nonce, ciphertext) {
            Ok(plaintext) => match serde_json::from_slice::<AllowlistFile>(&plaintext) {
                Ok(file) => file.peers,
                Err(err) => {
                    warn!(error = %err, "allowlist payload was not valid JSON; starting empty");
                    BTreeMap::new()
                }
            },
            Err(_) => {
                warn!("failed to decrypt allowlist; starting empty");
                BTreeMap::new()
            }
        };

        info!(peer_count = peers.len(), "loaded allowlist");
        *self.peers.write().await = peers;
        self.loaded.store(true, Ordering::Release);
        Ok(())
    }

    /// Persist the allowlist to its encrypted file, creating parent
    /// directories as needed.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization, encryption, or the write fails.
    #[instrument(name = "allowlist.save", skip(self), fields(path = %self.path.display()))]
    pub async fn save(&self) -> AllowlistResult<()> {
        self.load().await?;

        let peers = self.peers.read().await.clone();
        let file = AllowlistFile {
            peers,
            version: CURRENT_VERSION,
        };
        let plaintext = serde_json::to_vec(&file)?;

        let nonce = Aes256Gcm::generate_nonce(&mut OsRng);
        let ciphertext = self
            .cipher
            .encrypt(&nonce, plaintext.as_slice())
            .map_err(|_| AllowlistError::Aead { reason: "encrypt failed" })?;

        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|source| AllowlistError::Io { operation: "allowlist.save.mkdir", source })?;
        }

        let mut out = Vec::with_capacity(NONCE_LEN + ciphertext.len());
        out.extend_from_slice(nonce.as_slice());
        out.extend_from_slice(&ciphertext);
        tokio::fs::write(&self.path, out)
            .await
            .map_err(|source| AllowlistError::Io { operation: "allowlist.save.write", source })?;

        info!(peer_count = file.peers.len(), "saved allowlist");
        Ok(())
    }

    /// Add or update a peer in the allowlist.
    ///
    /// # Errors
    ///
    /// Returns [`AllowlistError::InvalidKeyLength`] if `public_key` is
    /// supplied and is not exactly 32 bytes.
    pub async fn add_peer(
        &self,
        peer_id: &str,
        public_key: Option<&[u8]>,
        metadata: Option<serde_json::Map<String, serde_json::Value>>,
        alias: Option<&str>,
        now: f64,
    ) -> AllowlistResult<()> {
        self.load().await?;
        let mut peers = self.peers.write().await;
        let mut entry = peers.remove(peer_id).unwrap_or_else(|| PeerEntry::new(now));

        if let Some(key) = public_key {
            if key.len() != 32 {
                return Err(AllowlistError::InvalidKeyLength { field: "public_key" });
            }
            entry.public_key = Some(HEXLOWER.encode(key));
        }

        if let Some(metadata) = metadata {
            entry.metadata.extend(metadata);
        }

        if let Some(alias) = alias {
            entry
                .metadata
                .insert("alias".to_string(), serde_json::Value::String(alias.to_string()));
        }

        peers.insert(peer_id.to_string(), entry);
        info!(peer_id, "added peer to allowlist");
        Ok(())
    }

    /// Remove a peer from the allowlist. Returns `true` if a peer was removed.
    pub async fn remove_peer(&self, peer_id: &str) -> AllowlistResult<bool> {
        self.load().await?;
        let removed = self.peers.write().await.remove(peer_id).is_some();
        if removed {
            info!(peer_id, "removed peer from allowlist");
        }
        Ok(removed)
    }

    /// Set a peer's alias. Returns `false` if the peer is not allowlisted.
    pub async fn set_alias(&self, peer_id: &str, alias: &str) -> AllowlistResult<bool> {
        self.load().await?;
        let mut peers = self.peers.write().await;
        let Some(entry) = peers.get_mut(peer_id) else {
            return Ok(false);
        };
        entry
            .metadata
            .insert("alias".to_string(), serde_json::Value::String(alias.to_string()));
        Ok(true)
    }

    /// Get a peer's alias, if one is set.
    pub async fn get_alias(&self, peer_id: &str) -> AllowlistResult<Option<String>> {
        self.load().await?;
        Ok(self
            .peers
            .read()
            .await
            .get(peer_id)
            .and_then(PeerEntry::alias)
            .map(str::to_string))
    }

    /// Remove a peer's alias. Returns `false` if there was no alias to remove.
    pub async fn remove_alias(&self, peer_id: &str) -> AllowlistResult<bool> {
        self.load().await?;
        let mut peers = self.peers.write().await;
        let Some(entry) = peers.get_mut(peer_id) else {
            return Ok(false);
        };
        Ok(entry.metadata.remove("alias").is_some())
    }

    /// Check whether a peer id is present in the allowlist.
    pub async fn is_allowed(&self, peer_id: &str) -> AllowlistResult<bool> {
        self.load().await?;
        Ok(self.peers.read().await.contains_key(peer_id))
    }

    /// Verify a peer's identity: allowlist membership, then (if the peer
    /// registered a public key) that it matches, then the Ed25519 signature
    /// over `message`.
    ///
    /// A peer with no registered public key passes on allowlist membership
    /// alone — signature verification has nothing to check against.
    ///
    /// # Errors
    ///
    /// Returns an error if `public_key` or `signature` are the wrong length,
    /// or if the peer's stored public key is corrupt hex.
    pub async fn verify_peer(
        &self,
        peer_id: &str,
        public_key: &[u8],
        signature: &[u8],
        message: &[u8],
    ) -> AllowlistResult<bool> {
        if !self.is_allowed(peer_id).await? {
            return Ok(false);
        }

        let expected_hex = {
            let peers = self.peers.read().await;
            peers.get(peer_id).and_then(|entry| entry.public_key.clone())
        };

        if let Some(expected_hex) = expected_hex {
            let expected = HEXLOWER
                .decode(expected_hex.as_bytes())
                .map_err(|_| AllowlistError::InvalidStoredKey)?;
            if expected != public_key {
                warn!(peer_id, "public key mismatch for peer");
                return Ok(false);
            }
        }

        let key_bytes: [u8; 32] = public_key
            .try_into()
            .map_err(|_| AllowlistError::InvalidKeyLength { field: "public_key" })?;
        let sig_bytes: [u8; 64] = signature
            .try_into()
            .map_err(|_| AllowlistError::InvalidSignatureLength)?;

        let Ok(verifying_key) = VerifyingKey::from_bytes(&key_bytes) else {
            return Ok(false);
        };
        let signature = Signature::from_bytes(&sig_bytes);

        let valid = verifying_key.verify(message, &signature).is_ok();
        if !valid {
            warn!(peer_id, "invalid signature for peer");
        }
        Ok(valid)
    }

    /// List all allowlisted peer ids.
    pub async fn get_peers(&self) -> AllowlistResult<Vec<String>> {
        self.load().await?;
        Ok(self.peers.read().await.keys().cloned().collect())
    }

    /// Get a peer's full allowlist record.
    pub async fn get_peer_info(&self, peer_id: &str) -> AllowlistResult<Option<PeerEntry>> {
        self.load().await?;
        Ok(self.peers.read().await.get(peer_id).cloned())
    }

    /// Compute the 32-byte SHA-256 content hash of the allowlist: a
    /// deterministic digest of the sorted `(peer_id, entry)` pairs, suitable
    /// for embedding as a `.tonic`'s `allowlist hash`.
    ///
    /// # Errors
    ///
    /// Returns an error if the peer map fails to serialize, which should not
    /// happen for well-formed in-memory state.
    pub async fn get_allowlist_hash(&self) -> AllowlistResult<[u8; 32]> {
        self.load().await?;
        let peers = self.peers.read().await;
        let sorted: Vec<(&String, &PeerEntry)> = peers.iter().collect();
        let data = serde_json::to_vec(&sorted)?;
        let mut hasher = Sha256::new();
        hasher.update(&data);
        Ok(hasher.finalize().into())
    }

    /// Path to the encrypted allowlist file on disk.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn derive_path_key(path: &Path) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(path.to_string_lossy().as_bytes());
    hasher.finalize().into()
}
