#![forbid(unsafe_code)]
#![deny(
    warnings,
    dead_code,
    unused,
    unused_imports,
    unreachable_pub,
    clippy::all,
    rustdoc::broken_intra_doc_links
)]
#![allow(clippy::module_name_repetitions)]

//! AES-256-GCM encrypted peer allowlist and Ed25519 peer authentication for
//! XET folder synchronization.
//!
//! See [`AllowlistStore`] for the main entry point.

mod error;
mod model;
mod store;

pub use error::{AllowlistError, AllowlistResult};
pub use model::{AllowlistFile, PeerEntry};
pub use store::AllowlistStore;

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_path() -> std::path::PathBuf {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("allowlist.enc");
        std::mem::forget(dir);
        path
    }

    #[tokio::test]
    async fn add_and_check_peer() {
        let store = AllowlistStore::new(temp_path());
        assert!(!store.is_allowed("peer-a").await.unwrap());

        store.add_peer("peer-a", None, None, None, 1000.0).await.unwrap();
        assert!(store.is_allowed("peer-a").await.unwrap());
        assert!(!store.is_allowed("peer-b").await.unwrap());
    }

    #[tokio::test]
    async fn save_and_reload_round_trips() {
        let path = temp_path();
        {
            let store = AllowlistStore::new(path.clone());
            store.add_peer("peer-a", None, None, Some("alice"), 1000.0).await.unwrap();
            store.save().await.unwrap();
        }

        let reloaded = AllowlistStore::new(path);
        assert!(reloaded.is_allowed("peer-a").await.unwrap());
        assert_eq!(reloaded.get_alias("peer-a").await.unwrap().as_deref(), Some("alice"));
    }

    #[tokio::test]
    async fn alias_set_and_remove() {
        let store = AllowlistStore::new(temp_path());
        store.add_peer("peer-a", None, None, None, 1000.0).await.unwrap();

        assert!(store.set_alias("peer-a", "bob").await.unwrap());
        assert_eq!(store.get_alias("peer-a").await.unwrap().as_deref(), Some("bob"));
        assert!(store.remove_alias("peer-a").await.unwrap());
        assert_eq!(store.get_alias("peer-a").await.unwrap(), None);

        assert!(!store.set_alias("missing", "x").await.unwrap());
    }

    #[tokio::test]
    async fn verify_peer_with_matching_signature() {
        use aes_gcm::aead::OsRng;
        use ed25519_dalek::{Signer, SigningKey};

        let signing_key = SigningKey::generate(&mut OsRng);
        let public_key = signing_key.verifying_key().to_bytes();
        let message = b"sync-update-123";
        let signature = signing_key.sign(message);

        let store = AllowlistStore::new(temp_path());
        store
            .add_peer("peer-a", Some(&public_key), None, None, 1000.0)
            .await
            .unwrap();

        assert!(store
            .verify_peer("peer-a", &public_key, &signature.to_bytes(), message)
            .await
            .unwrap());

        let tampered = b"different-message";
        assert!(!store
            .verify_peer("peer-a", &public_key, &signature.to_bytes(), tampered)
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn verify_peer_rejects_key_mismatch() {
        use aes_gcm::aead::OsRng;
        use ed25519_dalek::{Signer, SigningKey};

        let registered_key = SigningKey::generate(&mut OsRng);
        let attacker_key = SigningKey::generate(&mut OsRng);
        let message = b"payload";
        let signature = attacker_key.sign(message);

        let store = AllowlistStore::new(temp_path());
        store
            .add_peer(
                "peer-a",
                Some(&registered_key.verifying_key().to_bytes()),
                None,
                None,
                1000.0,
            )
            .await
            .unwrap();

        assert!(!store
            .verify_peer(
                "peer-a",
                &attacker_key.verifying_key().to_bytes(),
                &signature.to_bytes(),
                message
            )
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn allowlist_hash_is_stable_and_order_independent() {
        let store_a = AllowlistStore::new(temp_path());
        store_a.add_peer("peer-a", None, None, None, 1.0).await.unwrap();
        store_a.add_peer("peer-b", None, None, None, 2.0).await.unwrap();

        let store_b = AllowlistStore::new(temp_path());
        store_b.add_peer("peer-b", None, None, None, 2.0).await.unwrap();
        store_b.add_peer("peer-a", None, None, None, 1.0).await.unwrap();

        assert_eq!(
            store_a.get_allowlist_hash().await.unwrap(),
            store_b.get_allowlist_hash().await.unwrap()
        );
    }

    #[tokio::test]
    async fn corrupt_file_loads_as_empty() {
        let path = temp_path();
        tokio::fs::write(&path, b"short").await.unwrap();
        let store = AllowlistStore::new(path);
        assert_eq!(store.get_peers().await.unwrap(), Vec::<String>::new());
    }
}
