//! Endpoint selection between the zone-scoped single-script API and the
//! account-scoped multi-script API.

use crate::error::{Result, WorkersError};
use crate::types::{WorkerRequestParams, WorkerRoute};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiMode {
    /// One script per zone, addressed by zone ID.
    SingleScript,
    /// Many named scripts per account.
    MultiScript,
}

impl ApiMode {
    /// A script name selects multi-script mode even when a zone ID is also given.
    pub fn for_params(params: &WorkerRequestParams) -> Self {
        if params.script_name().is_some() {
            ApiMode::MultiScript
        } else {
            ApiMode::SingleScript
        }
    }

    pub fn for_route(route: &WorkerRoute) -> Self {
        if route.script_name().is_some() {
            ApiMode::MultiScript
        } else {
            ApiMode::SingleScript
        }
    }

    /// Listing has no route to inspect, so the configured account decides.
    pub fn for_listing(account_id: Option<&str>) -> Self {
        if non_empty(account_id).is_some() {
            ApiMode::MultiScript
        } else {
            ApiMode::SingleScript
        }
    }

    /// Path segment for the route collection under a zone.
    pub fn route_segment(self) -> &'static str {
        match self {
            ApiMode::SingleScript => "filters",
            ApiMode::MultiScript => "routes",
        }
    }
}

/// Resolved endpoint for a script operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScriptTarget<'a> {
    Zone {
        zone_id: &'a str,
    },
    Account {
        account_id: &'a str,
        script_name: &'a str,
    },
}

impl<'a> ScriptTarget<'a> {
    pub fn resolve(params: &'a WorkerRequestParams, account_id: Option<&'a str>) -> Result<Self> {
        match ApiMode::for_params(params) {
            ApiMode::MultiScript => Ok(ScriptTarget::Account {
                account_id: require_account_id(account_id)?,
                script_name: params.script_name().unwrap_or_default(),
            }),
            ApiMode::SingleScript => {
                let zone_id = params.zone_id().ok_or(WorkersError::ZoneIdRequired)?;
                Ok(ScriptTarget::Zone { zone_id })
            }
        }
    }

    pub fn mode(&self) -> ApiMode {
        match self {
            ScriptTarget::Zone { .. } => ApiMode::SingleScript,
            ScriptTarget::Account { .. } => ApiMode::MultiScript,
        }
    }

    pub fn path(&self) -> String {
        match self {
            ScriptTarget::Zone { zone_id } => format!("/zones/{}/workers/script", zone_id),
            ScriptTarget::Account {
                account_id,
                script_name,
            } => format!("/accounts/{}/workers/scripts/{}", account_id, script_name),
        }
    }
}

/// Multi-script operations need an account; never fall back to single-script.
pub fn require_account_id(account_id: Option<&str>) -> Result<&str> {
    non_empty(account_id).ok_or(WorkersError::AccountIdRequired)
}

/// Resolve the route collection path for a create/update of `route`.
pub fn route_collection_path(
    zone_id: &str,
    route: &WorkerRoute,
    account_id: Option<&str>,
) -> Result<String> {
    let mode = ApiMode::for_route(route);
    if mode == ApiMode::MultiScript {
        require_account_id(account_id)?;
    }
    Ok(zone_route_path(zone_id, mode))
}

pub fn zone_route_path(zone_id: &str, mode: ApiMode) -> String {
    format!("/zones/{}/workers/{}", zone_id, mode.route_segment())
}

pub fn account_scripts_path(account_id: &str) -> String {
    format!("/accounts/{}/workers/scripts", account_id)
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zone_only_is_single_script() {
        let params = WorkerRequestParams::for_zone("foo");
        let target = ScriptTarget::resolve(&params, None).unwrap();
        assert_eq!(target.mode(), ApiMode::SingleScript);
        assert_eq!(target.path(), "/zones/foo/workers/script");
    }

    #[test]
    fn test_zone_only_ignores_configured_account() {
        let params = WorkerRequestParams::for_zone("foo");
        let target = ScriptTarget::resolve(&params, Some("acct")).unwrap();
        assert_eq!(target.path(), "/zones/foo/workers/script");
    }

    #[test]
    fn test_script_name_selects_account_endpoint() {
        let params = WorkerRequestParams::for_script("bar");
        let target = ScriptTarget::resolve(&params, Some("foo")).unwrap();
        assert_eq!(target.mode(), ApiMode::MultiScript);
        assert_eq!(target.path(), "/accounts/foo/workers/scripts/bar");
    }

    #[test]
    fn test_script_name_wins_over_zone() {
        let params = WorkerRequestParams {
            zone_id: Some("zone".to_string()),
            script_name: Some("bar".to_string()),
        };
        let target = ScriptTarget::resolve(&params, Some("foo")).unwrap();
        assert_eq!(target.path(), "/accounts/foo/workers/scripts/bar");
    }

    #[test]
    fn test_script_name_without_account_fails() {
        let params = WorkerRequestParams {
            zone_id: Some("zone".to_string()),
            script_name: Some("bar".to_string()),
        };
        assert!(matches!(
            ScriptTarget::resolve(&params, None),
            Err(WorkersError::AccountIdRequired)
        ));
        assert!(matches!(
            ScriptTarget::resolve(&params, Some("")),
            Err(WorkersError::AccountIdRequired)
        ));
    }

    #[test]
    fn test_missing_zone_fails() {
        let params = WorkerRequestParams::default();
        assert!(matches!(
            ScriptTarget::resolve(&params, Some("foo")),
            Err(WorkersError::ZoneIdRequired)
        ));
    }

    #[test]
    fn test_route_paths_by_mode() {
        let filter = WorkerRoute::new("app1.example.com/*").enabled(true);
        assert_eq!(
            route_collection_path("foo", &filter, None).unwrap(),
            "/zones/foo/workers/filters"
        );
        assert_eq!(
            route_collection_path("foo", &filter, Some("acct")).unwrap(),
            "/zones/foo/workers/filters"
        );

        let routed = WorkerRoute::new("app1.example.com/*").with_script("test_script");
        assert_eq!(
            route_collection_path("foo", &routed, Some("acct")).unwrap(),
            "/zones/foo/workers/routes"
        );
        assert!(matches!(
            route_collection_path("foo", &routed, None),
            Err(WorkersError::AccountIdRequired)
        ));
    }

    #[test]
    fn test_listing_mode_follows_account() {
        assert_eq!(ApiMode::for_listing(None), ApiMode::SingleScript);
        assert_eq!(ApiMode::for_listing(Some("")), ApiMode::SingleScript);
        assert_eq!(ApiMode::for_listing(Some("foo")), ApiMode::MultiScript);
    }
}
