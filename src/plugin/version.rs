//! Version selection against a catalog listing.

use super::{CatalogPlugin, PluginError, PluginResult, PluginVersion};

/// Pick the release to install.
///
/// With no requested version the catalog's first entry (the latest) wins.
/// Otherwise the first entry whose version string is exactly `requested` is
/// returned; there is no range or semver matching.
pub fn select_version<'a>(
    plugin: &'a CatalogPlugin,
    requested: Option<&str>,
) -> PluginResult<&'a PluginVersion> {
    let not_found = |version: &str| PluginError::VersionNotFound {
        plugin_id: plugin.id.clone(),
        version: version.to_string(),
    };

    match requested.filter(|v| !v.is_empty()) {
        None => plugin.versions.first().ok_or_else(|| not_found("latest")),
        Some(requested) => plugin
            .versions
            .iter()
            .find(|v| v.version == requested)
            .ok_or_else(|| not_found(requested)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plugin(versions: &[&str]) -> CatalogPlugin {
        CatalogPlugin {
            id: "clock-panel".to_string(),
            versions: versions.iter().map(|v| PluginVersion::new(*v)).collect(),
            ..Default::default()
        }
    }

    #[test]
    fn test_no_version_selects_first() {
        let plugin = plugin(&["1.0.0", "0.9.0"]);
        assert_eq!(select_version(&plugin, None).unwrap().version, "1.0.0");
        assert_eq!(select_version(&plugin, Some("")).unwrap().version, "1.0.0");
    }

    #[test]
    fn test_single_version_list() {
        let plugin = plugin(&["0.1.0"]);
        assert_eq!(select_version(&plugin, None).unwrap().version, "0.1.0");
    }

    #[test]
    fn test_exact_match() {
        let plugin = plugin(&["1.0.0", "0.9.0"]);
        let selected = select_version(&plugin, Some("0.9.0")).unwrap();
        assert_eq!(selected, &plugin.versions[1]);
    }

    #[test]
    fn test_no_partial_match() {
        let plugin = plugin(&["1.0.0", "0.9.0"]);
        assert!(select_version(&plugin, Some("1.0")).is_err());
        assert!(select_version(&plugin, Some("v1.0.0")).is_err());
    }

    #[test]
    fn test_unknown_version() {
        let plugin = plugin(&["1.0.0", "0.9.0"]);
        let err = select_version(&plugin, Some("2.0.0")).unwrap_err();
        assert!(matches!(
            err,
            PluginError::VersionNotFound { ref plugin_id, ref version }
                if plugin_id == "clock-panel" && version == "2.0.0"
        ));
    }

    #[test]
    fn test_empty_catalog() {
        assert!(select_version(&plugin(&[]), None).is_err());
    }
}
