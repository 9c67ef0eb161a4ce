use serde::Deserialize;

use crate::error::NormalizeError;

/// Default per-owner capacity ceiling.
pub const DEFAULT_MAX_ACCOUNTS_PER_CSM: i64 = 83;

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct NormalizeConfig {
    #[serde(default = "default_name")]
    pub name: String,
    #[serde(default = "default_ceiling")]
    pub max_accounts_per_csm: i64,
    /// Input CSV, relative to the config file.
    #[serde(default)]
    pub input: Option<String>,
    #[serde(default)]
    pub columns: ColumnMapping,
    /// Extra owners appended after the ones found in the table.
    #[serde(default)]
    pub roster: Vec<String>,
    /// Cell values read as "missing" in the parent and owner columns.
    #[serde(default = "default_null_markers")]
    pub null_markers: Vec<String>,
    #[serde(default)]
    pub output: OutputConfig,
}

fn default_name() -> String {
    "normalize".into()
}

fn default_ceiling() -> i64 {
    DEFAULT_MAX_ACCOUNTS_PER_CSM
}

fn default_null_markers() -> Vec<String> {
    ["", "NaN", "nan", "None", "null", "NULL"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

impl Default for NormalizeConfig {
    fn default() -> Self {
        Self {
            name: default_name(),
            max_accounts_per_csm: default_ceiling(),
            input: None,
            columns: ColumnMapping::default(),
            roster: Vec::new(),
            null_markers: default_null_markers(),
            output: OutputConfig::default(),
        }
    }
}

// ---------------------------------------------------------------------------
// Column mapping
// ---------------------------------------------------------------------------

/// Names of the input columns the normalizer reads. `owner` is also the
/// column it overwrites.
#[derive(Debug, Clone, Deserialize)]
pub struct ColumnMapping {
    #[serde(default = "default_account_id")]
    pub account_id: String,
    #[serde(default = "default_parent_account_id")]
    pub parent_account_id: String,
    #[serde(default = "default_owner")]
    pub owner: String,
}

fn default_account_id() -> String {
    "account_id".into()
}

fn default_parent_account_id() -> String {
    "parent_account_id".into()
}

fn default_owner() -> String {
    "csm".into()
}

impl Default for ColumnMapping {
    fn default() -> Self {
        Self {
            account_id: default_account_id(),
            parent_account_id: default_parent_account_id(),
            owner: default_owner(),
        }
    }
}

// ---------------------------------------------------------------------------
// Output
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Deserialize)]
pub struct OutputConfig {
    #[serde(default)]
    pub csv: Option<String>,
    #[serde(default)]
    pub json: Option<String>,
}

// ---------------------------------------------------------------------------
// Parse + Validate
// ---------------------------------------------------------------------------

impl NormalizeConfig {
    pub fn from_toml(input: &str) -> Result<Self, NormalizeError> {
        let config: NormalizeConfig =
            toml::from_str(input).map_err(|e| NormalizeError::ConfigParse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Config with the default columns and the given ceiling.
    pub fn with_ceiling(max_accounts_per_csm: i64) -> Self {
        Self {
            max_accounts_per_csm,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<(), NormalizeError> {
        if self.max_accounts_per_csm <= 0 {
            return Err(NormalizeError::InvalidCeiling(self.max_accounts_per_csm));
        }

        let cols = [
            ("account_id", &self.columns.account_id),
            ("parent_account_id", &self.columns.parent_account_id),
            ("owner", &self.columns.owner),
        ];
        for (field, name) in &cols {
            if name.trim().is_empty() {
                return Err(NormalizeError::ConfigValidation(format!(
                    "columns.{field} must not be empty"
                )));
            }
        }
        for (i, (field_a, a)) in cols.iter().enumerate() {
            for (field_b, b) in &cols[i + 1..] {
                if a == b {
                    return Err(NormalizeError::ConfigValidation(format!(
                        "columns.{field_a} and columns.{field_b} both map to '{a}'"
                    )));
                }
            }
        }

        for (i, owner) in self.roster.iter().enumerate() {
            if owner.trim().is_empty() {
                return Err(NormalizeError::ConfigValidation(format!(
                    "roster[{i}] must not be empty"
                )));
            }
            if self.is_null(owner) {
                return Err(NormalizeError::ConfigValidation(format!(
                    "roster[{i}] '{owner}' is listed in null_markers"
                )));
            }
        }

        Ok(())
    }

    /// Ceiling as a count. Only meaningful after `validate()`.
    pub fn ceiling(&self) -> usize {
        usize::try_from(self.max_accounts_per_csm).unwrap_or(0)
    }

    pub fn is_null(&self, value: &str) -> bool {
        is_null_marker(value, &self.null_markers)
    }
}

pub(crate) fn is_null_marker(value: &str, markers: &[String]) -> bool {
    let value = value.trim();
    value.is_empty() || markers.iter().any(|m| m == value)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
