//! OS identifier detection
//!
//! The OS identifier is the first segment of every cache key, so jobs on
//! different runners never share entries.

use crate::cache::key::validate_key_segment;
use crate::error::{SlotCacheError, SlotCacheResult};
use tracing::debug;

/// Environment variable CI runners use to advertise their OS
pub const RUNNER_OS_VAR: &str = "RUNNER_OS";

/// Pick the OS identifier for this job
///
/// Order: explicit value (flag or `SLOTCACHE_OS`), configured value,
/// `RUNNER_OS` (lowercased, ignored when empty), then the OS this binary
/// was built for.
pub fn detect_os(explicit: Option<&str>, configured: Option<&str>) -> SlotCacheResult<String> {
    let os = if let Some(os) = explicit {
        os.to_string()
    } else if let Some(os) = configured {
        os.to_string()
    } else {
        match std::env::var(RUNNER_OS_VAR) {
            Ok(os) if !os.is_empty() => os.to_lowercase(),
            _ => std::env::consts::OS.to_string(),
        }
    };

    validate_os(&os)?;
    debug!("Using OS identifier {}", os);
    Ok(os)
}

/// Check an OS identifier can be embedded in a key
pub fn validate_os(os: &str) -> SlotCacheResult<()> {
    if os.is_empty() {
        return Err(SlotCacheError::EmptyOsIdentifier);
    }
    validate_key_segment(os).map_err(|reason| SlotCacheError::InvalidOsIdentifier {
        os: os.to_string(),
        reason,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn explicit_wins() {
        assert_eq!(detect_os(Some("windows"), Some("linux")).unwrap(), "windows");
    }

    #[test]
    fn configured_beats_environment() {
        assert_eq!(detect_os(None, Some("macos")).unwrap(), "macos");
    }

    #[test]
    #[serial]
    fn runner_os_lowercased() {
        std::env::set_var(RUNNER_OS_VAR, "Linux");
        let os = detect_os(None, None);
        std::env::remove_var(RUNNER_OS_VAR);
        assert_eq!(os.unwrap(), "linux");
    }

    #[test]
    #[serial]
    fn falls_back_to_build_os() {
        std::env::remove_var(RUNNER_OS_VAR);
        assert_eq!(detect_os(None, None).unwrap(), std::env::consts::OS);
    }

    #[test]
    #[serial]
    fn empty_runner_os_ignored() {
        std::env::set_var(RUNNER_OS_VAR, "");
        let os = detect_os(None, None);
        std::env::remove_var(RUNNER_OS_VAR);
        assert_eq!(os.unwrap(), std::env::consts::OS);
    }

    #[test]
    fn rejects_bad_identifiers() {
        assert!(matches!(
            detect_os(Some(""), None),
            Err(SlotCacheError::EmptyOsIdentifier)
        ));
        assert!(matches!(
            detect_os(Some("linux/arm"), None),
            Err(SlotCacheError::InvalidOsIdentifier { .. })
        ));
    }
}
