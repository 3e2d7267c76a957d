//! services/api/src/adapters/codeforces.rs
//!
//! This module contains the adapter for the Codeforces contest-listing API.
//! It implements the `ContestDirectory` port from the `core` crate: building
//! (optionally signed) upstream requests, validating the response envelope,
//! and filtering the raw contest list down to the canonical upcoming set.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use contest_reminder_core::domain::{AuthParams, Contest, ContestPhase};
use contest_reminder_core::ports::{ContestDirectory, PortError, PortResult};
use rand::Rng;
use serde::Deserialize;
use sha2::{Digest, Sha512};

use crate::cache::SnapshotCache;

const CONTEST_LIST_METHOD: &str = "contest.list";

//=========================================================================================
// Request Signing
//=========================================================================================

const NONCE_LEN: usize = 6;
const NONCE_CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ\
                               abcdefghijklmnopqrstuvwxyz\
                               0123456789";

fn random_nonce() -> String {
    let mut rng = rand::thread_rng();
    (0..NONCE_LEN)
        .map(|_| {
            let idx = rng.gen_range(0..NONCE_CHARSET.len());
            NONCE_CHARSET[idx] as char
        })
        .collect()
}

/// Signs an upstream request with a fresh random nonce.
///
/// Signatures are single-use: each call draws a new nonce, so a signature is
/// either attached to the request it was built for or discarded.
fn sign_request(method: &str, params: &[(String, String)], secret: &str) -> String {
    signature_with_nonce(&random_nonce(), method, params, secret)
}

/// The deterministic half of the signer.
///
/// Params are canonicalized by sorting on the string form of (key, value),
/// so two calls with the same param set in any insertion order produce the
/// same signature. The signing input is `{nonce}/{method}?{query}#{secret}`,
/// hashed with SHA-512; the result is the nonce followed by the hex digest.
fn signature_with_nonce(
    nonce: &str,
    method: &str,
    params: &[(String, String)],
    secret: &str,
) -> String {
    let mut sorted = params.to_vec();
    sorted.sort();

    let query = sorted
        .iter()
        .map(|(key, value)| format!("{key}={value}"))
        .collect::<Vec<_>>()
        .join("&");

    let base = format!("{nonce}/{method}?{query}#{secret}");
    let digest = Sha512::digest(base.as_bytes());
    format!("{nonce}{}", hex_encode(&digest))
}

/// Encodes bytes as a lowercase hex string.
fn hex_encode(bytes: &[u8]) -> String {
    const HEX: &[u8; 16] = b"0123456789abcdef";
    let mut out = String::with_capacity(bytes.len() * 2);
    for byte in bytes {
        out.push(HEX[(byte >> 4) as usize] as char);
        out.push(HEX[(byte & 0x0f) as usize] as char);
    }
    out
}

//=========================================================================================
// Wire Format
//=========================================================================================

#[derive(Deserialize)]
struct ListResponse {
    status: String,
    #[serde(default)]
    comment: Option<String>,
    #[serde(default)]
    result: Option<Vec<RawContest>>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawContest {
    id: i64,
    #[serde(default)]
    name: String,
    phase: String,
    #[serde(default)]
    start_time_seconds: Option<i64>,
    #[serde(default)]
    duration_seconds: Option<i64>,
    #[serde(default)]
    relative_time_seconds: Option<i64>,
}

fn parse_phase(raw: &str) -> ContestPhase {
    match raw {
        "BEFORE" => ContestPhase::Before,
        "CODING" => ContestPhase::Coding,
        "PENDING_SYSTEM_TEST" => ContestPhase::PendingSystemTest,
        "SYSTEM_TEST" => ContestPhase::SystemTest,
        "FINISHED" => ContestPhase::Finished,
        _ => ContestPhase::Unknown,
    }
}

/// Validates the response envelope and reduces the raw list to upcoming
/// contests: phase `BEFORE`, start time (when known) not already in the past,
/// sorted by start ascending with unscheduled contests last.
fn upcoming_from_payload(payload: ListResponse, now: DateTime<Utc>) -> PortResult<Vec<Contest>> {
    if payload.status != "OK" {
        let comment = payload
            .comment
            .unwrap_or_else(|| "Codeforces API returned non-OK status".to_string());
        return Err(PortError::UpstreamRejected(comment));
    }

    let mut upcoming: Vec<Contest> = payload
        .result
        .unwrap_or_default()
        .into_iter()
        .filter_map(|raw| {
            let phase = parse_phase(&raw.phase);
            if !phase.is_upcoming() {
                return None;
            }

            let start_time_utc = raw
                .start_time_seconds
                .and_then(|secs| DateTime::from_timestamp(secs, 0));
            // A contest that started between upstream computation and this
            // check is excluded defensively.
            if matches!(start_time_utc, Some(start) if start < now) {
                return None;
            }

            Some(Contest {
                id: raw.id,
                name: raw.name,
                phase,
                start_time_utc,
                duration_seconds: raw.duration_seconds,
                relative_time_seconds: raw.relative_time_seconds,
            })
        })
        .collect();

    upcoming.sort_by_key(|contest| contest.start_time_utc.unwrap_or(DateTime::<Utc>::MAX_UTC));
    Ok(upcoming)
}

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// An adapter that implements the `ContestDirectory` port against the
/// Codeforces REST API, with a shared snapshot cache for unauthenticated
/// listings.
pub struct CodeforcesAdapter {
    client: reqwest::Client,
    base_url: String,
    cache: SnapshotCache<Vec<Contest>>,
}

impl CodeforcesAdapter {
    /// Creates a new `CodeforcesAdapter`. The `client` is expected to carry
    /// the bounded upstream timeout.
    pub fn new(client: reqwest::Client, base_url: String, cache_ttl: std::time::Duration) -> Self {
        Self {
            client,
            base_url,
            cache: SnapshotCache::new(cache_ttl),
        }
    }

    async fn fetch_upcoming(&self, auth: Option<&AuthParams>) -> PortResult<Vec<Contest>> {
        let mut params: Vec<(String, String)> =
            vec![("gym".to_string(), "false".to_string())];

        if let Some(auth) = auth {
            let now_ts = Utc::now().timestamp();
            params.push(("apiKey".to_string(), auth.api_key.clone()));
            params.push(("time".to_string(), now_ts.to_string()));
            // The signature covers every param added so far, including the
            // timestamp.
            let signature = sign_request(CONTEST_LIST_METHOD, &params, &auth.api_secret);
            params.push(("apiSig".to_string(), signature));
        }

        let url = format!("{}/{}", self.base_url, CONTEST_LIST_METHOD);
        let response = self
            .client
            .get(&url)
            .query(&params)
            .send()
            .await
            .map_err(|e| PortError::UpstreamUnavailable(e.to_string()))?
            .error_for_status()
            .map_err(|e| PortError::UpstreamUnavailable(e.to_string()))?;

        let payload: ListResponse = response
            .json()
            .await
            .map_err(|e| PortError::UpstreamUnavailable(e.to_string()))?;

        upcoming_from_payload(payload, Utc::now())
    }
}

//=========================================================================================
// `ContestDirectory` Trait Implementation
//=========================================================================================

#[async_trait]
impl ContestDirectory for CodeforcesAdapter {
    async fn upcoming_contests(&self, auth: Option<&AuthParams>) -> PortResult<Vec<Contest>> {
        match auth {
            // Signed requests are caller-scoped and time-sensitive; they
            // never go through the shared snapshot.
            Some(auth) => self.fetch_upcoming(Some(auth)).await,
            None => self.cache.get(|| self.fetch_upcoming(None)).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn params(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn signature_is_deterministic_for_a_fixed_nonce() {
        let a = signature_with_nonce(
            "abc123",
            "contest.list",
            &params(&[("gym", "false"), ("apiKey", "key"), ("time", "1700000000")]),
            "secret",
        );
        let b = signature_with_nonce(
            "abc123",
            "contest.list",
            &params(&[("time", "1700000000"), ("gym", "false"), ("apiKey", "key")]),
            "secret",
        );
        assert_eq!(a, b);
    }

    #[test]
    fn signature_changes_with_nonce_and_secret() {
        let pairs = params(&[("gym", "false")]);
        let base = signature_with_nonce("abc123", "contest.list", &pairs, "secret");
        assert_ne!(
            base,
            signature_with_nonce("abc124", "contest.list", &pairs, "secret")
        );
        assert_ne!(
            base,
            signature_with_nonce("abc123", "contest.list", &pairs, "other")
        );
    }

    #[test]
    fn signature_is_nonce_plus_sha512_hex() {
        let token = signature_with_nonce("abc123", "contest.list", &params(&[]), "secret");
        assert!(token.starts_with("abc123"));
        // 6-char nonce + 128 hex chars of SHA-512.
        assert_eq!(token.len(), NONCE_LEN + 128);
        assert!(token[NONCE_LEN..].chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn nonce_is_alphanumeric_with_fixed_length() {
        let nonce = random_nonce();
        assert_eq!(nonce.len(), NONCE_LEN);
        assert!(nonce.chars().all(|c| c.is_ascii_alphanumeric()));
    }

    fn raw(id: i64, phase: &str, start: Option<i64>) -> RawContest {
        RawContest {
            id,
            name: format!("Round #{id}"),
            phase: phase.to_string(),
            start_time_seconds: start,
            duration_seconds: Some(7200),
            relative_time_seconds: start.map(|s| 1_700_000_000 - s),
        }
    }

    fn payload(status: &str, comment: Option<&str>, result: Vec<RawContest>) -> ListResponse {
        ListResponse {
            status: status.to_string(),
            comment: comment.map(str::to_string),
            result: Some(result),
        }
    }

    #[test]
    fn running_contests_are_excluded_regardless_of_start_time() {
        let now = Utc.with_ymd_and_hms(2026, 2, 16, 12, 0, 0).unwrap();
        let future = now.timestamp() + 3600;
        let contests = upcoming_from_payload(
            payload(
                "OK",
                None,
                vec![raw(1, "CODING", Some(future)), raw(2, "BEFORE", Some(future))],
            ),
            now,
        )
        .unwrap();

        assert_eq!(contests.len(), 1);
        assert_eq!(contests[0].id, 2);
        assert_eq!(contests[0].phase, ContestPhase::Before);
    }

    #[test]
    fn contests_that_already_started_are_excluded() {
        let now = Utc.with_ymd_and_hms(2026, 2, 16, 12, 0, 0).unwrap();
        let contests = upcoming_from_payload(
            payload(
                "OK",
                None,
                vec![
                    raw(1, "BEFORE", Some(now.timestamp() - 60)),
                    raw(2, "BEFORE", Some(now.timestamp() + 60)),
                ],
            ),
            now,
        )
        .unwrap();

        assert_eq!(contests.len(), 1);
        assert_eq!(contests[0].id, 2);
    }

    #[test]
    fn sorted_by_start_with_unscheduled_last() {
        let now = Utc.with_ymd_and_hms(2026, 2, 16, 12, 0, 0).unwrap();
        let contests = upcoming_from_payload(
            payload(
                "OK",
                None,
                vec![
                    raw(1, "BEFORE", None),
                    raw(2, "BEFORE", Some(now.timestamp() + 7200)),
                    raw(3, "BEFORE", Some(now.timestamp() + 3600)),
                ],
            ),
            now,
        )
        .unwrap();

        let ids: Vec<i64> = contests.iter().map(|c| c.id).collect();
        assert_eq!(ids, vec![3, 2, 1]);
    }

    #[test]
    fn non_ok_status_surfaces_the_upstream_comment() {
        let now = Utc.with_ymd_and_hms(2026, 2, 16, 12, 0, 0).unwrap();
        let err = upcoming_from_payload(
            payload("FAILED", Some("apiKey: Incorrect signature"), vec![]),
            now,
        )
        .unwrap_err();

        assert!(
            matches!(err, PortError::UpstreamRejected(comment) if comment == "apiKey: Incorrect signature")
        );
    }

    #[test]
    fn non_ok_status_without_comment_gets_a_default_message() {
        let now = Utc.with_ymd_and_hms(2026, 2, 16, 12, 0, 0).unwrap();
        let err = upcoming_from_payload(payload("FAILED", None, vec![]), now).unwrap_err();
        assert!(matches!(err, PortError::UpstreamRejected(_)));
    }

    #[test]
    fn unknown_phase_strings_are_not_upcoming() {
        assert_eq!(parse_phase("MAGIC"), ContestPhase::Unknown);
        assert!(!ContestPhase::Unknown.is_upcoming());
    }
}
