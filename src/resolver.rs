//! File/URL resolution across include directories.
//!
//! A file identifier may be a plain name, a relative or absolute path, or a
//! URL. URLs are never fetched: only the base filename of the URL's path
//! takes part in the search, so a remote schema reference resolves to a local
//! copy when one is present on the include path.

use std::path::PathBuf;

use log::{debug, error};
use url::Url;

/// True if `name` parses as an absolute URL with a scheme.
pub fn is_url(name: &str) -> bool {
    Url::parse(name).is_ok()
}

/// The filename to search for: URLs contribute only their path's base name.
fn search_name(name: &str) -> String {
    match Url::parse(name) {
        Ok(parsed) => {
            let path = parsed.path();
            path.rsplit('/')
                .next()
                .filter(|s| !s.is_empty())
                .unwrap_or(path)
                .to_string()
        }
        Err(_) => name.to_string(),
    }
}

/// Ordered include-directory search. First match wins.
#[derive(Debug, Clone, Default)]
pub struct Resolver {
    includes: Vec<PathBuf>,
}

impl Resolver {
    pub fn new(includes: Vec<PathBuf>) -> Self {
        Self { includes }
    }

    /// Resolve `name` to an existing path, or `None` (logged, not fatal).
    ///
    /// A name that already exists relative to the current directory, or that
    /// is an absolute path, is taken as-is; otherwise each include directory
    /// is tried in order.
    pub fn resolve(&self, name: &str) -> Option<PathBuf> {
        let wanted = search_name(name);

        let mut path = PathBuf::from(&wanted);
        if !(path.exists() || path.is_absolute()) {
            for include in &self.includes {
                path = include.join(&wanted);
                if path.exists() {
                    break;
                }
            }
        }

        if path.exists() {
            debug!("file {} found at {}", name, path.display());
            Some(path)
        } else {
            error!("file {} not found in {:?}", name, self.includes);
            None
        }
    }
}
