//! `.tonic` container: create, parse, and compute the stable info-hash.

use std::collections::BTreeMap;

use sha2::{Digest, Sha256};

use crate::bencode::{self, Value};
use crate::error::{TonicError, TonicResult};
use crate::model::{
    ChunkHash, FileEntry, FileMetadata, FileTreeEntry, InfoHash, SyncMode, TonicInfo,
    TonicMetadata, XetMetadata,
};

const TONIC_VERSION: u32 = 1;

/// Options accepted by [`create`] beyond the required folder name, file
/// metadata, and sync mode.
#[derive(Debug, Clone, Default)]
pub struct CreateOptions {
    /// Primary tracker announce URL.
    pub announce: Option<String>,
    /// Tiered tracker announce list.
    pub announce_list: Option<Vec<Vec<String>>>,
    /// Git commit refs anchoring this snapshot.
    pub git_refs: Option<Vec<String>>,
    /// Designated source peer ids (meaningful under `designated` mode).
    pub source_peers: Option<Vec<String>>,
    /// 32-byte commitment hash of the peer allowlist.
    pub allowlist_hash: Option<[u8; 32]>,
    /// Creation timestamp, seconds since epoch. Callers supply this so the
    /// codec stays free of a wall-clock dependency.
    pub created_at: Option<i64>,
    /// Free-form comment.
    pub comment: Option<String>,
}

/// Build a `.tonic` container describing `files` under `folder_name`.
///
/// # Errors
///
/// Returns [`TonicError::InvalidPath`] if any file path escapes the folder
/// root, and [`TonicError::InvalidField`] if `allowlist_hash` (via
/// `options`) is present but not exactly 32 bytes — it always is, since the
/// type is `[u8; 32]`, but the check is retained for symmetry with `parse`.
pub fn create(
    folder_name: impl Into<String>,
    files: Vec<FileMetadata>,
    sync_mode: SyncMode,
    options: CreateOptions,
) -> TonicResult<TonicMetadata> {
    let mut total_length = 0u64;
    let mut entries = Vec::with_capacity(files.len());
    for file in &files {
        let components = split_path(&file.path)?;
        total_length = total_length.saturating_add(file.size);
        entries.push(FileEntry {
            path: components,
            length: file.size,
            file_hash: file.file_hash,
        });
    }
    entries.sort_by(|a, b| a.path.cmp(&b.path));

    let file_tree = build_file_tree(&entries);
    let chunk_hashes: Vec<ChunkHash> = files.iter().flat_map(|f| f.chunk_hashes.clone()).collect();

    Ok(TonicMetadata {
        info: TonicInfo {
            name: folder_name.into(),
            tonic_version: TONIC_VERSION,
            total_length,
            files: entries,
            file_tree,
        },
        xet_metadata: XetMetadata {
            chunk_hashes,
            files,
            piece_metadata: None,
            xorb_hashes: None,
        },
        sync_mode,
        announce: options.announce,
        announce_list: options.announce_list,
        git_refs: options.git_refs,
        source_peers: options.source_peers,
        allowlist_hash: options.allowlist_hash,
        created_at: options.created_at,
        comment: options.comment,
    })
}

fn split_path(path: &str) -> TonicResult<Vec<String>> {
    let mut components = Vec::new();
    for segment in path.split('/') {
        if segment.is_empty() {
            continue;
        }
        if segment == ".." || segment == "." {
            return Err(TonicError::InvalidPath {
                path: path.to_string(),
            });
        }
        components.push(segment.to_string());
    }
    if path.starts_with('/') || components.is_empty() {
        return Err(TonicError::InvalidPath {
            path: path.to_string(),
        });
    }
    Ok(components)
}

fn build_file_tree(entries: &[FileEntry]) -> BTreeMap<String, FileTreeEntry> {
    let mut root: BTreeMap<String, FileTreeEntry> = BTreeMap::new();
    for entry in entries {
        insert_into_tree(&mut root, &entry.path, entry.length, entry.file_hash);
    }
    root
}

fn insert_into_tree(
    node: &mut BTreeMap<String, FileTreeEntry>,
    path: &[String],
    length: u64,
    file_hash: [u8; 32],
) {
    match path.split_first() {
        None => {}
        Some((head, [])) => {
            node.insert(head.clone(), FileTreeEntry::File { length, file_hash });
        }
        Some((head, rest)) => {
            let child = node
                .entry(head.clone())
                .or_insert_with(|| FileTreeEntry::Dir(BTreeMap::new()));
            if let FileTreeEntry::Dir(children) = child {
                insert_into_tree(children, rest, length, file_hash);
            }
        }
    }
}

/// Flatten a nested `file tree` back into `(path, length, file_hash)` triples.
fn flatten_file_tree(
    tree: &BTreeMap<String, FileTreeEntry>,
    prefix: &mut Vec<String>,
    out: &mut Vec<FileEntry>,
) {
    for (name, node) in tree {
        prefix.push(name.clone());
        match node {
            FileTreeEntry::File { length, file_hash } => {
                out.push(FileEntry {
                    path: prefix.clone(),
                    length: *length,
                    file_hash: *file_hash,
                });
            }
            FileTreeEntry::Dir(children) => flatten_file_tree(children, prefix, out),
        }
        prefix.pop();
    }
}

/// Encode a `.tonic` container into its canonical bencoded byte form.
#[must_use]
pub fn encode(meta: &TonicMetadata) -> Vec<u8> {
    bencode::encode(&encode_outer(meta))
}

/// Compute the info-hash: SHA-256 of the bencoded `info` sub-dictionary.
///
/// Deterministic under re-encoding: parsing a `.tonic` and re-encoding it
/// MUST yield the same info-hash, independent of map insertion order, since
/// bencode dictionaries always emit keys sorted by byte value.
#[must_use]
pub fn info_hash(meta: &TonicMetadata) -> InfoHash {
    let info_bytes = bencode::encode(&encode_info(&meta.info));
    let mut hasher = Sha256::new();
    hasher.update(&info_bytes);
    hasher.finalize().into()
}

/// Parse a `.tonic` container from its bencoded byte form.
///
/// # Errors
///
/// Returns an error if the input is not valid bencode, is missing a
/// required field, uses an unrecognized sync mode, carries a malformed
/// allowlist hash, or contains a path that escapes the folder root.
pub fn parse(bytes: &[u8]) -> TonicResult<TonicMetadata> {
    let value = bencode::decode(bytes)?;
    decode_outer(&value)
}

fn encode_outer(meta: &TonicMetadata) -> Value {
    let mut dict = BTreeMap::new();
    dict.insert(b"info".to_vec(), encode_info(&meta.info));
    dict.insert(b"xet metadata".to_vec(), encode_xet(&meta.xet_metadata));
    dict.insert(
        b"sync mode".to_vec(),
        Value::string(meta.sync_mode.as_str()),
    );
    if let Some(announce) = &meta.announce {
        dict.insert(b"announce".to_vec(), Value::string(announce));
    }
    if let Some(list) = &meta.announce_list {
        dict.insert(
            b"announce-list".to_vec(),
            Value::List(
                list.iter()
                    .map(|tier| {
                        Value::List(tier.iter().map(Value::string).collect())
                    })
                    .collect(),
            ),
        );
    }
    if let Some(refs) = &meta.git_refs {
        dict.insert(
            b"git refs".to_vec(),
            Value::List(refs.iter().map(Value::string).collect()),
        );
    }
    if let Some(peers) = &meta.source_peers {
        dict.insert(
            b"source peers".to_vec(),
            Value::List(peers.iter().map(Value::string).collect()),
        );
    }
    if let Some(hash) = &meta.allowlist_hash {
        dict.insert(b"allowlist hash".to_vec(), Value::bytes(hash.to_vec()));
    }
    if let Some(created_at) = meta.created_at {
        dict.insert(b"created at".to_vec(), Value::Int(created_at));
    }
    if let Some(comment) = &meta.comment {
        dict.insert(b"comment".to_vec(), Value::string(comment));
    }
    Value::Dict(dict)
}

fn encode_info(info: &TonicInfo) -> Value {
    let mut dict = BTreeMap::new();
    dict.insert(b"name".to_vec(), Value::string(&info.name));
    dict.insert(
        b"tonic version".to_vec(),
        Value::Int(i64::from(info.tonic_version)),
    );
    dict.insert(
        b"total length".to_vec(),
        Value::Int(i64::try_from(info.total_length).unwrap_or(i64::MAX)),
    );
    dict.insert(
        b"files".to_vec(),
        Value::List(info.files.iter().map(encode_file_entry).collect()),
    );
    dict.insert(
        b"file tree".to_vec(),
        encode_file_tree(&info.file_tree),
    );
    Value::Dict(dict)
}

fn encode_file_entry(entry: &FileEntry) -> Value {
    let mut dict = BTreeMap::new();
    dict.insert(
        b"length".to_vec(),
        Value::Int(i64::try_from(entry.length).unwrap_or(i64::MAX)),
    );
    dict.insert(
        b"path".to_vec(),
        Value::List(entry.path.iter().map(Value::string).collect()),
    );
    dict.insert(
        b"file hash".to_vec(),
        Value::bytes(entry.file_hash.to_vec()),
    );
    Value::Dict(dict)
}

fn encode_file_tree(tree: &BTreeMap<String, FileTreeEntry>) -> Value {
    let mut dict = BTreeMap::new();
    for (name, node) in tree {
        let encoded = match node {
            FileTreeEntry::File { length, file_hash } => {
                let mut leaf = BTreeMap::new();
                let mut inner = BTreeMap::new();
                inner.insert(
                    b"length".to_vec(),
                    Value::Int(i64::try_from(*length).unwrap_or(i64::MAX)),
                );
                inner.insert(b"file hash".to_vec(), Value::bytes(file_hash.to_vec()));
                leaf.insert(Vec::new(), Value::Dict(inner));
                Value::Dict(leaf)
            }
            FileTreeEntry::Dir(children) => encode_file_tree(children),
        };
        dict.insert(name.as_bytes().to_vec(), encoded);
    }
    Value::Dict(dict)
}

fn encode_xet(xet: &XetMetadata) -> Value {
    let mut dict = BTreeMap::new();
    dict.insert(
        b"chunk hashes".to_vec(),
        Value::List(xet.chunk_hashes.iter().map(|h| Value::bytes(h.to_vec())).collect()),
    );
    dict.insert(
        b"files".to_vec(),
        Value::List(xet.files.iter().map(encode_file_metadata).collect()),
    );
    if let Some(piece_metadata) = &xet.piece_metadata {
        dict.insert(b"piece metadata".to_vec(), Value::bytes(piece_metadata.clone()));
    }
    if let Some(xorbs) = &xet.xorb_hashes {
        dict.insert(
            b"xorb hashes".to_vec(),
            Value::List(xorbs.iter().map(|h| Value::bytes(h.to_vec())).collect()),
        );
    }
    Value::Dict(dict)
}

fn encode_file_metadata(file: &FileMetadata) -> Value {
    let mut dict = BTreeMap::new();
    dict.insert(b"path".to_vec(), Value::string(&file.path));
    dict.insert(b"file hash".to_vec(), Value::bytes(file.file_hash.to_vec()));
    dict.insert(
        b"chunk hashes".to_vec(),
        Value::List(
            file.chunk_hashes
                .iter()
                .map(|h| Value::bytes(h.to_vec()))
                .collect(),
        ),
    );
    dict.insert(
        b"size".to_vec(),
        Value::Int(i64::try_from(file.size).unwrap_or(i64::MAX)),
    );
    Value::Dict(dict)
}

fn decode_outer(value: &Value) -> TonicResult<TonicMetadata> {
    let dict = value.as_dict().ok_or(TonicError::MissingField { field: "<root>" })?;

    let info_value = dict.get(b"info".as_slice()).ok_or(TonicError::MissingField { field: "info" })?;
    let info = decode_info(info_value)?;

    let xet_value = dict
        .get(b"xet metadata".as_slice())
        .ok_or(TonicError::MissingField { field: "xet metadata" })?;
    let xet_metadata = decode_xet(xet_value)?;

    let sync_mode_bytes = dict
        .get(b"sync mode".as_slice())
        .ok_or(TonicError::MissingField { field: "sync mode" })?
        .as_str()
        .ok_or(TonicError::InvalidUtf8 { field: "sync mode" })?;
    let sync_mode = SyncMode::parse(sync_mode_bytes)?;

    let announce = dict
        .get(b"announce".as_slice())
        .and_then(Value::as_str)
        .map(str::to_string);

    let announce_list = dict.get(b"announce-list".as_slice()).map(|v| {
        v.as_list()
            .unwrap_or_default()
            .iter()
            .map(|tier| {
                tier.as_list()
                    .unwrap_or_default()
                    .iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect()
            })
            .collect()
    });

    let git_refs = dict.get(b"git refs".as_slice()).map(|v| {
        v.as_list()
            .unwrap_or_default()
            .iter()
            .filter_map(Value::as_str)
            .map(str::to_string)
            .collect()
    });

    let source_peers = dict.get(b"source peers".as_slice()).map(|v| {
        v.as_list()
            .unwrap_or_default()
            .iter()
            .filter_map(Value::as_str)
            .map(str::to_string)
            .collect()
    });

    let allowlist_hash = match dict.get(b"allowlist hash".as_slice()) {
        Some(v) => {
            let bytes = v.as_bytes().ok_or(TonicError::InvalidField {
                field: "allowlist hash",
            })?;
            Some(to_array32(bytes).ok_or(TonicError::InvalidField {
                field: "allowlist hash",
            })?)
        }
        None => None,
    };

    let created_at = dict.get(b"created at".as_slice()).and_then(Value::as_int);
    let comment = dict
        .get(b"comment".as_slice())
        .and_then(Value::as_str)
        .map(str::to_string);

    Ok(TonicMetadata {
        info,
        xet_metadata,
        sync_mode,
        announce,
        announce_list,
        git_refs,
        source_peers,
        allowlist_hash,
        created_at,
        comment,
    })
}

fn decode_info(value: &Value) -> TonicResult<TonicInfo> {
    let dict = value.as_dict().ok_or(TonicError::MissingField { field: "info" })?;
    let name = dict
        .get(b"name".as_slice())
        .ok_or(TonicError::MissingField { field: "info.name" })?
        .as_str()
        .ok_or(TonicError::InvalidUtf8 { field: "info.name" })?
        .to_string();
    let tonic_version = dict
        .get(b"tonic version".as_slice())
        .and_then(Value::as_int)
        .unwrap_or(1);
    let total_length = dict
        .get(b"total length".as_slice())
        .and_then(Value::as_int)
        .unwrap_or(0)
        .max(0) as u64;

    let files_from_list = dict
        .get(b"files".as_slice())
        .map(decode_file_entries)
        .transpose()?;
    let files_from_tree = dict
        .get(b"file tree".as_slice())
        .map(decode_file_tree_entries)
        .transpose()?;

    let (files, file_tree) = match (files_from_tree, files_from_list) {
        (Some(tree), _) => {
            let mut flat = Vec::new();
            flatten_file_tree(&tree, &mut Vec::new(), &mut flat);
            flat.sort_by(|a, b| a.path.cmp(&b.path));
            (flat, tree)
        }
        (None, Some(list)) => {
            let tree = build_file_tree(&list);
            (list, tree)
        }
        (None, None) => (Vec::new(), BTreeMap::new()),
    };

    for entry in &files {
        validate_components(&entry.path)?;
    }

    Ok(TonicInfo {
        name,
        tonic_version: u32::try_from(tonic_version).unwrap_or(1),
        total_length,
        files,
        file_tree,
    })
}

fn validate_components(components: &[String]) -> TonicResult<()> {
    let joined = components.join("/");
    for component in components {
        if component.is_empty() || component == ".." || component == "." {
            return Err(TonicError::InvalidPath { path: joined });
        }
    }
    if components.is_empty() {
        return Err(TonicError::InvalidPath { path: joined });
    }
    Ok(())
}

fn decode_file_entries(value: &Value) -> TonicResult<Vec<FileEntry>> {
    let items = value.as_list().unwrap_or_default();
    let mut out = Vec::with_capacity(items.len());
    for item in items {
        let dict = item.as_dict().ok_or(TonicError::InvalidField { field: "files[]" })?;
        let length = dict
            .get(b"length".as_slice())
            .and_then(Value::as_int)
            .unwrap_or(0)
            .max(0) as u64;
        let path: Vec<String> = dict
            .get(b"path".as_slice())
            .and_then(Value::as_list)
            .unwrap_or_default()
            .iter()
            .filter_map(Value::as_str)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect();
        let file_hash = dict
            .get(b"file hash".as_slice())
            .and_then(Value::as_bytes)
            .and_then(to_array32)
            .unwrap_or([0u8; 32]);
        out.push(FileEntry {
            path,
            length,
            file_hash,
        });
    }
    Ok(out)
}

fn decode_file_tree_entries(value: &Value) -> TonicResult<BTreeMap<String, FileTreeEntry>> {
    let dict = value.as_dict().ok_or(TonicError::InvalidField { field: "file tree" })?;
    let mut out = BTreeMap::new();
    for (name, node) in dict {
        if name.is_empty() {
            continue;
        }
        let name = String::from_utf8_lossy(name).into_owned();
        let node_dict = node.as_dict().ok_or(TonicError::InvalidField { field: "file tree" })?;
        let entry = if let Some(leaf) = node_dict.get(Vec::new().as_slice()) {
            let leaf_dict = leaf
                .as_dict()
                .ok_or(TonicError::InvalidField { field: "file tree" })?;
            let length = leaf_dict
                .get(b"length".as_slice())
                .and_then(Value::as_int)
                .unwrap_or(0)
                .max(0) as u64;
            let file_hash = leaf_dict
                .get(b"file hash".as_slice())
                .and_then(Value::as_bytes)
                .and_then(to_array32)
                .unwrap_or([0u8; 32]);
            FileTreeEntry::File { length, file_hash }
        } else {
            FileTreeEntry::Dir(decode_file_tree_entries(node)?)
        };
        out.insert(name, entry);
    }
    Ok(out)
}

fn to_array32(bytes: &[u8]) -> Option<[u8; 32]> {
    <[u8; 32]>::try_from(bytes).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_files() -> Vec<FileMetadata> {
        vec![
            FileMetadata {
                path: "a.txt".to_string(),
                file_hash: [1u8; 32],
                chunk_hashes: vec![[2u8; 32]],
                size: 5,
            },
            FileMetadata {
                path: "sub/b.bin".to_string(),
                file_hash: [3u8; 32],
                chunk_hashes: vec![[4u8; 32]],
                size: 3,
            },
        ]
    }

    #[test]
    fn create_and_parse_round_trip_info_hash() {
        let meta = create(
            "demo",
            sample_files(),
            SyncMode::BestEffort,
            CreateOptions::default(),
        )
        .unwrap();
        assert_eq!(meta.info.total_length, 8);

        let encoded = encode(&meta);
        let parsed = parse(&encoded).unwrap();
        assert_eq!(info_hash(&meta), info_hash(&parsed));
        assert_eq!(parsed.info.name, "demo");
    }

    #[test]
    fn file_tree_and_files_duality() {
        let meta = create(
            "demo",
            sample_files(),
            SyncMode::BestEffort,
            CreateOptions::default(),
        )
        .unwrap();
        let encoded = encode(&meta);

        // Re-decode using only the `files` list by stripping `file tree`.
        let mut value = bencode::decode(&encoded).unwrap();
        if let Value::Dict(outer) = &mut value
            && let Some(Value::Dict(info)) = outer.get_mut(b"info".as_slice())
        {
            info.remove(b"file tree".as_slice());
        }
        let synthesized = decode_outer(&value).unwrap();

        let mut original_triples: Vec<_> = meta
            .info
            .files
            .iter()
            .map(|f| (f.path.clone(), f.length, f.file_hash))
            .collect();
        let mut synthesized_triples: Vec<_> = synthesized
            .info
            .files
            .iter()
            .map(|f| (f.path.clone(), f.length, f.file_hash))
            .collect();
        original_triples.sort();
        synthesized_triples.sort();
        assert_eq!(original_triples, synthesized_triples);
    }

    #[test]
    fn rejects_unknown_sync_mode() {
        let meta = create(
            "demo",
            sample_files(),
            SyncMode::BestEffort,
            CreateOptions::default(),
        )
        .unwrap();
        let mut value = bencode::decode(&encode(&meta)).unwrap();
        if let Value::Dict(outer) = &mut value {
            outer.insert(b"sync mode".to_vec(), Value::string("quorum"));
        }
        let err = decode_outer(&value).unwrap_err();
        assert!(matches!(err, TonicError::InvalidField { field: "sync mode" }));
    }

    #[test]
    fn rejects_path_traversal() {
        let files = vec![FileMetadata {
            path: "../escape".to_string(),
            file_hash: [0u8; 32],
            chunk_hashes: vec![],
            size: 0,
        }];
        let err = create(
            "demo",
            files,
            SyncMode::BestEffort,
            CreateOptions::default(),
        )
        .unwrap_err();
        assert!(matches!(err, TonicError::InvalidPath { .. }));
    }

    #[test]
    fn empty_folder_has_zero_length_and_empty_tree() {
        let meta = create(
            "empty",
            Vec::new(),
            SyncMode::BestEffort,
            CreateOptions::default(),
        )
        .unwrap();
        assert_eq!(meta.info.total_length, 0);
        assert!(meta.info.file_tree.is_empty());
    }

    proptest::proptest! {
        #[test]
        fn info_hash_is_stable_under_re_encoding(
            names in proptest::collection::vec("[a-z][a-z0-9]{0,8}", 1..4),
            sizes in proptest::collection::vec(0u64..4096, 1..4),
        ) {
            let len = names.len().min(sizes.len());
            let files: Vec<FileMetadata> = names
                .into_iter()
                .zip(sizes)
                .take(len)
                .enumerate()
                .map(|(i, (name, size))| FileMetadata {
                    path: format!("{name}-{i}.bin"),
                    file_hash: [i as u8; 32],
                    chunk_hashes: vec![[i as u8; 32]],
                    size,
                })
                .collect();
            let meta = create("prop", files, SyncMode::Consensus, CreateOptions::default()).unwrap();
            let encoded = encode(&meta);
            let parsed = parse(&encoded).unwrap();
            proptest::prop_assert_eq!(info_hash(&meta), info_hash(&parsed));
        }
    }
}
