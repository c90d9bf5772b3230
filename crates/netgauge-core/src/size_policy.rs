use std::num::IntErrorKind;

use tracing::warn;

/// 10 MiB.
pub const DEFAULT_DOWNLOAD_SIZE: u64 = 10 * 1024 * 1024;
/// 100 MiB.
pub const MAX_DOWNLOAD_SIZE: u64 = 100 * 1024 * 1024;
/// 100 MiB.
pub const MAX_UPLOAD_SIZE: u64 = 100 * 1024 * 1024;

pub const DEFAULT_DOWNLOAD_SIZE_VAR: &str = "NETGAUGE_DEFAULT_DOWNLOAD_SIZE";
pub const MAX_DOWNLOAD_SIZE_VAR: &str = "NETGAUGE_MAX_DOWNLOAD_SIZE";
pub const MAX_UPLOAD_SIZE_VAR: &str = "NETGAUGE_MAX_UPLOAD_SIZE";

/// Byte limits for transfers, resolved once at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SizeLimits {
    pub default_download: u64,
    pub max_download: u64,
    pub max_upload: u64,
}

impl Default for SizeLimits {
    fn default() -> Self {
        Self {
            default_download: DEFAULT_DOWNLOAD_SIZE,
            max_download: MAX_DOWNLOAD_SIZE,
            max_upload: MAX_UPLOAD_SIZE,
        }
    }
}

impl SizeLimits {
    /// Build limits from a variable lookup (normally the process
    /// environment). Each value falls back to its built-in on its own.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let resolve = |name: &str, fallback: u64| match lookup(name) {
            None => fallback,
            Some(raw) => parse_positive(&raw).unwrap_or_else(|| {
                warn!("{}={:?} is not a positive integer, using {}", name, raw, fallback);
                fallback
            }),
        };

        Self {
            default_download: resolve(DEFAULT_DOWNLOAD_SIZE_VAR, DEFAULT_DOWNLOAD_SIZE),
            max_download: resolve(MAX_DOWNLOAD_SIZE_VAR, MAX_DOWNLOAD_SIZE),
            max_upload: resolve(MAX_UPLOAD_SIZE_VAR, MAX_UPLOAD_SIZE),
        }
    }

    /// Effective download size for a raw `size` hint.
    ///
    /// Missing, non-numeric, zero and negative hints mean "use the
    /// default". The result is then clamped down to `max_download`.
    pub fn resolve_download_size(&self, requested: Option<&str>) -> u64 {
        let size = requested
            .and_then(parse_positive)
            .unwrap_or(self.default_download);
        size.min(self.max_download).max(1)
    }
}

/// Base-10 integer strictly greater than zero. Values past `u64::MAX`
/// saturate so they still clamp to the maximum.
fn parse_positive(raw: &str) -> Option<u64> {
    let raw = raw.trim();
    let digits = match raw.as_bytes().first() {
        Some(b'-') => return None,
        Some(b'+') => &raw[1..],
        _ => raw,
    };
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }

    let value = match digits.parse::<u64>() {
        Ok(v) => v,
        Err(e) if *e.kind() == IntErrorKind::PosOverflow => u64::MAX,
        Err(_) => return None,
    };
    (value > 0).then_some(value)
}
