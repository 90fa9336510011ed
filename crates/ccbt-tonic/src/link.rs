//! `tonic?:` URI codec — the magnet-link analogue for a folder's info-hash.
//!
//! ```text
//! tonic?:xt=urn:xet:<hex64|base32>&tr=...&tr=...&git=...&peer=...&dn=...&mode=...&allowlist=...
//! ```

use data_encoding::{BASE32_NOPAD, HEXLOWER};
use percent_encoding::{percent_decode_str, utf8_percent_encode, NON_ALPHANUMERIC};

use crate::error::{TonicError, TonicResult};
use crate::model::{InfoHash, SyncMode};

const SCHEME_PREFIX: &str = "tonic?:";
const URN_PREFIX: &str = "urn:xet:";

/// A parsed `tonic?:` link: an info-hash plus optional discovery hints.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TonicLink {
    /// The folder's info-hash.
    pub info_hash: InfoHash,
    /// Tracker announce URLs (`tr=`), in appearance order.
    pub trackers: Vec<String>,
    /// Git refs anchoring a snapshot (`git=`), in appearance order.
    pub git_refs: Vec<String>,
    /// Peer addresses. Populated from `peer=` (repeated) or `peers=`
    /// (comma-separated); if both are present, `peers=` wins.
    pub peers: Vec<String>,
    /// Display name (`dn=`).
    pub display_name: Option<String>,
    /// Requested sync mode (`mode=`), if present and recognized.
    pub mode: Option<SyncMode>,
    /// Opaque allowlist hint (`allowlist=`).
    pub allowlist: Option<String>,
}

impl TonicLink {
    /// Construct a minimal link carrying only an info-hash.
    #[must_use]
    pub fn new(info_hash: InfoHash) -> Self {
        Self {
            info_hash,
            trackers: Vec::new(),
            git_refs: Vec::new(),
            peers: Vec::new(),
            display_name: None,
            mode: None,
            allowlist: None,
        }
    }

    /// Render this link as its canonical `tonic?:` URI string.
    ///
    /// The info-hash is always emitted in lowercase hex.
    #[must_use]
    pub fn to_uri(&self) -> String {
        let mut out = String::from(SCHEME_PREFIX);
        out.push_str("xt=");
        out.push_str(URN_PREFIX);
        out.push_str(&HEXLOWER.encode(&self.info_hash));

        for tracker in &self.trackers {
            out.push_str("&tr=");
            out.push_str(&encode_param(tracker));
        }
        for git_ref in &self.git_refs {
            out.push_str("&git=");
            out.push_str(&encode_param(git_ref));
        }
        for peer in &self.peers {
            out.push_str("&peer=");
            out.push_str(&encode_param(peer));
        }
        if let Some(name) = &self.display_name {
            out.push_str("&dn=");
            out.push_str(&encode_param(name));
        }
        if let Some(mode) = self.mode {
            out.push_str("&mode=");
            out.push_str(mode.as_str());
        }
        if let Some(allowlist) = &self.allowlist {
            out.push_str("&allowlist=");
            out.push_str(&encode_param(allowlist));
        }
        out
    }

    /// Parse a `tonic?:` URI.
    ///
    /// # Errors
    ///
    /// Returns [`TonicError::InvalidLink`] if the scheme prefix is missing,
    /// the `xt` parameter is absent or not a recognized `urn:xet:` form, or
    /// the info-hash is not exactly 32 bytes once decoded.
    pub fn parse(uri: &str) -> TonicResult<Self> {
        let rest = uri.strip_prefix(SCHEME_PREFIX).ok_or(TonicError::InvalidLink {
            reason: "missing tonic?: scheme prefix",
        })?;

        let mut info_hash: Option<InfoHash> = None;
        let mut trackers = Vec::new();
        let mut git_refs = Vec::new();
        let mut peer_params = Vec::new();
        let mut peers_param: Option<Vec<String>> = None;
        let mut display_name = None;
        let mut mode = None;
        let mut allowlist = None;

        for pair in rest.split('&') {
            if pair.is_empty() {
                continue;
            }
            let (key, raw_value) = pair.split_once('=').ok_or(TonicError::InvalidLink {
                reason: "malformed query parameter",
            })?;
            let value = decode_param(raw_value);

            match key {
                "xt" => {
                    info_hash = Some(decode_xt(&value)?);
                }
                "tr" => trackers.push(value),
                "git" => git_refs.push(value),
                "peer" => peer_params.push(value),
                "peers" => {
                    peers_param = Some(
                        value
                            .split(',')
                            .filter(|s| !s.is_empty())
                            .map(str::to_string)
                            .collect(),
                    );
                }
                "dn" => display_name = Some(value),
                "mode" => mode = Some(SyncMode::parse(&value).map_err(|_| TonicError::InvalidField { field: "mode" })?),
                "allowlist" => allowlist = Some(value),
                _ => {} // unknown parameters are ignored
            }
        }

        let info_hash = info_hash.ok_or(TonicError::InvalidLink {
            reason: "missing xt parameter",
        })?;

        Ok(Self {
            info_hash,
            trackers,
            git_refs,
            peers: peers_param.unwrap_or(peer_params),
            display_name,
            mode,
            allowlist,
        })
    }
}

fn decode_xt(value: &str) -> TonicResult<InfoHash> {
    let encoded = value.strip_prefix(URN_PREFIX).ok_or(TonicError::InvalidLink {
        reason: "xt parameter is not a urn:xet: value",
    })?;

    let bytes = if encoded.len() == 64 && encoded.bytes().all(|b| b.is_ascii_hexdigit()) {
        HEXLOWER
            .decode(encoded.to_lowercase().as_bytes())
            .map_err(|_| TonicError::InvalidLink {
                reason: "xt hex value failed to decode",
            })?
    } else {
        BASE32_NOPAD
            .decode(encoded.to_uppercase().as_bytes())
            .map_err(|_| TonicError::InvalidLink {
                reason: "xt base32 value failed to decode",
            })?
    };

    <[u8; 32]>::try_from(bytes.as_slice()).map_err(|_| TonicError::InvalidLink {
        reason: "info-hash must be exactly 32 bytes",
    })
}

fn encode_param(value: &str) -> String {
    utf8_percent_encode(value, NON_ALPHANUMERIC).to_string()
}

fn decode_param(value: &str) -> String {
    percent_decode_str(value).decode_utf8_lossy().into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_hex_uri() {
        let link = TonicLink {
            info_hash: [7u8; 32],
            trackers: vec!["https://tracker.example/announce".to_string()],
            git_refs: vec!["refs/heads/main".to_string()],
            peers: vec!["10.0.0.1:9000".to_string(), "10.0.0.2:9000".to_string()],
            display_name: Some("my folder".to_string()),
            mode: Some(SyncMode::Consensus),
            allowlist: Some("abc123".to_string()),
        };
        let uri = link.to_uri();
        let parsed = TonicLink::parse(&uri).unwrap();
        assert_eq!(parsed, link);
    }

    #[test]
    fn accepts_base32_xt_form() {
        let hash = [9u8; 32];
        let encoded = BASE32_NOPAD.encode(&hash);
        let uri = format!("tonic?:xt=urn:xet:{encoded}");
        let parsed = TonicLink::parse(&uri).unwrap();
        assert_eq!(parsed.info_hash, hash);
    }

    #[test]
    fn peers_param_wins_over_repeated_peer() {
        let uri = "tonic?:xt=urn:xet:0707070707070707070707070707070707070707070707070707070707070707&peer=first&peers=a%2Cb";
        let parsed = TonicLink::parse(uri).unwrap();
        assert_eq!(parsed.peers, vec!["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn unknown_params_are_ignored() {
        let uri = "tonic?:xt=urn:xet:0707070707070707070707070707070707070707070707070707070707070707&future=stuff";
        assert!(TonicLink::parse(uri).is_ok());
    }

    #[test]
    fn rejects_missing_scheme() {
        assert!(TonicLink::parse("magnet:?xt=urn:xet:00").is_err());
    }

    #[test]
    fn rejects_missing_xt() {
        assert!(TonicLink::parse("tonic?:tr=https://example").is_err());
    }

    #[test]
    fn rejects_wrong_length_hash() {
        assert!(TonicLink::parse("tonic?:xt=urn:xet:abcd").is_err());
    }

    #[test]
    fn rejects_unrecognized_mode() {
        let uri = "tonic?:xt=urn:xet:0707070707070707070707070707070707070707070707070707070707070707&mode=quorum";
        let err = TonicLink::parse(uri).unwrap_err();
        assert!(matches!(err, TonicError::InvalidField { field: "mode" }));
    }
}
