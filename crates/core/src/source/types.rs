//! Provider settings shared by all storage sources.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Credentials and endpoint settings handed to a source constructor.
///
/// Each provider reads only the fields it needs. Values come from the
/// configuration file, the environment, or the trigger payload (SAS flows).
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceSettings {
    /// Azure storage account name.
    #[serde(default)]
    pub account_name: Option<String>,
    /// Azure shared account key.
    #[serde(default)]
    pub account_key: Option<String>,
    /// Azure SAS token (query string form, with or without leading `?`).
    #[serde(default)]
    pub sas_token: Option<String>,
    /// S3 access key id.
    #[serde(default)]
    pub access_key_id: Option<String>,
    /// S3 secret access key.
    #[serde(default)]
    pub secret_access_key: Option<String>,
    /// Default region for region-scoped providers.
    #[serde(default)]
    pub region: Option<String>,
    /// Custom endpoint (S3-compatible stores).
    #[serde(default)]
    pub endpoint: Option<String>,
    /// Root directory for the local filesystem provider.
    #[serde(default)]
    pub local_root: Option<PathBuf>,
}

impl SourceSettings {
    /// Returns a copy where every field set in `overrides` wins.
    pub fn merged_with(&self, overrides: &SourceSettings) -> SourceSettings {
        fn pick<T: Clone>(base: &Option<T>, over: &Option<T>) -> Option<T> {
            over.clone().or_else(|| base.clone())
        }

        SourceSettings {
            account_name: pick(&self.account_name, &overrides.account_name),
            account_key: pick(&self.account_key, &overrides.account_key),
            sas_token: pick(&self.sas_token, &overrides.sas_token),
            access_key_id: pick(&self.access_key_id, &overrides.access_key_id),
            secret_access_key: pick(&self.secret_access_key, &overrides.secret_access_key),
            region: pick(&self.region, &overrides.region),
            endpoint: pick(&self.endpoint, &overrides.endpoint),
            local_root: pick(&self.local_root, &overrides.local_root),
        }
    }
}

// Secrets never reach logs.
impl fmt::Debug for SourceSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn redact(value: &Option<String>) -> &'static str {
            if value.is_some() {
                "<redacted>"
            } else {
                "<unset>"
            }
        }

        f.debug_struct("SourceSettings")
            .field("account_name", &self.account_name)
            .field("account_key", &redact(&self.account_key))
            .field("sas_token", &redact(&self.sas_token))
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &redact(&self.secret_access_key))
            .field("region", &self.region)
            .field("endpoint", &self.endpoint)
            .field("local_root", &self.local_root)
            .finish()
    }
}
