//! Installed-app launcher used by the billing action.

use crate::error::AppError;
use serde::{Deserialize, Serialize};

/// Opens desktop applications by key.
pub trait AppLauncher: Send + Sync {
    /// Activate the app registered under `app_key` with the given query.
    ///
    /// Returns `AppError::MissingCollaborator` when no such app is installed.
    fn open_app(&self, app_key: &str, query: &[(&str, &str)]) -> Result<(), AppError>;
}

/// An app installed on the desktop.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstalledApp {
    pub key: String,
    pub name: String,
    /// Entry URL of the app.
    pub url: String,
}

/// Append `query` to `url`, percent-encoding keys and values.
pub fn launch_url(url: &str, query: &[(&str, &str)]) -> String {
    if query.is_empty() {
        return url.to_string();
    }
    let encoded: Vec<String> = query
        .iter()
        .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
        .collect();
    let separator = if url.contains('?') { '&' } else { '?' };
    format!("{}{}{}", url, separator, encoded.join("&"))
}

/// Launcher backed by the list of installed apps.
///
/// Resolves the key, builds the launch URL and hands it to `open`.
pub struct AppRegistry<F> {
    apps: Vec<InstalledApp>,
    open: F,
}

impl<F> AppRegistry<F>
where
    F: Fn(&str) -> Result<(), AppError> + Send + Sync,
{
    pub fn new(apps: Vec<InstalledApp>, open: F) -> Self {
        Self { apps, open }
    }

    pub fn find(&self, key: &str) -> Option<&InstalledApp> {
        self.apps.iter().find(|app| app.key == key)
    }
}

impl<F> AppLauncher for AppRegistry<F>
where
    F: Fn(&str) -> Result<(), AppError> + Send + Sync,
{
    fn open_app(&self, app_key: &str, query: &[(&str, &str)]) -> Result<(), AppError> {
        let app = self
            .find(app_key)
            .ok_or_else(|| AppError::missing_collaborator(app_key))?;
        let url = launch_url(&app.url, query);
        log::info!("[launcher] Opening {} at {}", app.key, url);
        (self.open)(&url)
    }
}

/// Launcher for hosts without any installed apps.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoLauncher;

impl AppLauncher for NoLauncher {
    fn open_app(&self, app_key: &str, _query: &[(&str, &str)]) -> Result<(), AppError> {
        Err(AppError::missing_collaborator(app_key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    fn costcenter() -> InstalledApp {
        InstalledApp {
            key: "system-costcenter".to_string(),
            name: "Cost Center".to_string(),
            url: "https://costcenter.example.com".to_string(),
        }
    }

    #[test]
    fn test_launch_url_encodes_query() {
        assert_eq!(
            launch_url("https://a.example.com", &[("openRecharge", "true")]),
            "https://a.example.com?openRecharge=true"
        );
        assert_eq!(
            launch_url("https://a.example.com/?x=1", &[("q", "a b")]),
            "https://a.example.com/?x=1&q=a%20b"
        );
        assert_eq!(launch_url("https://a.example.com", &[]), "https://a.example.com");
    }

    #[test]
    fn test_registry_opens_known_app() {
        let opened = Arc::new(Mutex::new(Vec::new()));
        let sink = opened.clone();
        let registry = AppRegistry::new(vec![costcenter()], move |url: &str| {
            sink.lock().unwrap().push(url.to_string());
            Ok(())
        });

        registry
            .open_app("system-costcenter", &[("openRecharge", "true")])
            .unwrap();
        assert_eq!(
            opened.lock().unwrap().as_slice(),
            &["https://costcenter.example.com?openRecharge=true".to_string()]
        );
    }

    #[test]
    fn test_registry_missing_app() {
        let registry = AppRegistry::new(Vec::new(), |_: &str| Ok(()));
        let err = registry.open_app("system-costcenter", &[]).unwrap_err();
        assert!(err.is_missing_collaborator());
        assert!(NoLauncher.open_app("x", &[]).unwrap_err().is_missing_collaborator());
    }
}
