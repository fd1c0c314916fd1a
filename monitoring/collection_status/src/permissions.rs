//! Monitor privilege pre-check.

use monitoring_shared_types::StatusError;
use monitoring_source_interface::{PrivilegeChecker, MONITOR_PRIVILEGE};
use tracing::{debug, warn};

/// Whether the caller may read monitoring data.
///
/// Without security there is nothing to check. A cluster that lacks the
/// privilege API altogether is treated as permissive; any other failure
/// denies access.
pub async fn has_necessary_permissions(checker: &dyn PrivilegeChecker) -> bool {
    if !checker.security_enabled().await {
        debug!("Security disabled, skipping privilege check");
        return true;
    }

    match checker.has_cluster_privilege(MONITOR_PRIVILEGE).await {
        Ok(granted) => granted,
        Err(StatusError::SecurityEndpointUnavailable(reason)) => {
            debug!(reason = %reason, "Privilege API unavailable, allowing access");
            true
        }
        Err(e) => {
            warn!(error = %e, "Privilege check failed, assuming no access");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use monitoring_sources::{MockPrivilegeChecker, PrivilegeOutcome};

    #[tokio::test]
    async fn test_permission_resolution() {
        let cases = [
            (true, PrivilegeOutcome::Granted, true),
            (true, PrivilegeOutcome::Denied, false),
            (true, PrivilegeOutcome::EndpointMissing, true),
            (true, PrivilegeOutcome::Fails, false),
            (false, PrivilegeOutcome::Fails, true),
        ];
        for (security_enabled, outcome, expected) in cases {
            let checker = MockPrivilegeChecker::new(security_enabled, outcome);
            assert_eq!(
                has_necessary_permissions(&checker).await,
                expected,
                "security_enabled={} outcome={:?}",
                security_enabled,
                outcome
            );
        }
    }

    #[tokio::test]
    async fn test_security_disabled_skips_request() {
        let checker = MockPrivilegeChecker::new(false, PrivilegeOutcome::Denied);
        assert!(has_necessary_permissions(&checker).await);
        assert!(checker.checked_privileges().await.is_empty());
    }
}
