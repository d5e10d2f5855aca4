//! Layered conversion options.
//!
//! The effective configuration for a cell is merged from five layers,
//! lowest to highest precedence: built-in defaults, the external settings
//! file, notebook-level metadata, cell-level metadata, and the inline
//! override following a load directive. Later layers overwrite identical
//! keys; unknown keys ride along untouched so hosts can pass their own
//! options through the same channel.
//!
//! The settings file is a flat `key = value` INI file. Its values arrive
//! as strings and are normalized: escape sequences are decoded, then the
//! boolean token vocabulary is coerced. Metadata layers are already JSON
//! and are taken as-is.

use std::collections::BTreeMap;
use std::path::Path;

use config::{Config, File, FileFormat};
use serde_json::{Map, Value};

use crate::error::ConvertError;

/// JSON object type used for configuration layers.
pub type OptionMap = Map<String, Value>;

/// Reformat code-cell source before rendering.
pub const BLACKIFY: &str = "blackify";
/// Run the cell through the execution session.
pub const EXECUTE: &str = "execute";
/// Render error outputs instead of aborting the conversion.
pub const ALLOW_ERRORS: &str = "allow_errors";
/// Render the stored traceback verbatim instead of the one-line summary.
pub const FULL_TRACEBACK: &str = "full_traceback";
/// Template for the code-block fragment (`language`, `source`).
pub const SOURCE_TEMPLATE: &str = "source_template";
/// Template for execute-result fragments (`data`).
pub const EXECUTE_RESULT_TEMPLATE: &str = "execute_result_template";
/// Template for stream fragments (`name`, `text`).
pub const STREAM_TEMPLATE: &str = "stream_template";
/// Template for error summary fragments (`ename`, `evalue`, `traceback`).
pub const EXCEPTION_TEMPLATE: &str = "exception_template";

const DEFAULT_SOURCE_TEMPLATE: &str = "```{{ language }}\n{{ source }}\n```";
const DEFAULT_EXECUTE_RESULT_TEMPLATE: &str = "```text\n[result]\n{{ data }}\n```";
const DEFAULT_STREAM_TEMPLATE: &str = "```text\n[{{ name }}]\n{{ text }}\n```";
const DEFAULT_EXCEPTION_TEMPLATE: &str = "```text\n[{{ ename }}]\n{{ evalue }}\n```";

/// Settings-file values coerced to `true`. Exact matches only.
pub const TRUTHY_TOKENS: &[&str] = &["True", "true", "Yes", "yes", "1", "HELL YEAH!"];

/// Settings-file values coerced to `false`. Exact matches only.
pub const FALSY_TOKENS: &[&str] = &["False", "false", "No", "no", "0", "Are you joking?"];

/// Built-in defaults covering every recognized option.
pub fn defaults() -> OptionMap {
    let mut map = OptionMap::new();
    map.insert(BLACKIFY.into(), Value::Bool(true));
    map.insert(EXECUTE.into(), Value::Bool(true));
    map.insert(ALLOW_ERRORS.into(), Value::Bool(false));
    map.insert(FULL_TRACEBACK.into(), Value::Bool(false));
    map.insert(SOURCE_TEMPLATE.into(), DEFAULT_SOURCE_TEMPLATE.into());
    map.insert(
        EXECUTE_RESULT_TEMPLATE.into(),
        DEFAULT_EXECUTE_RESULT_TEMPLATE.into(),
    );
    map.insert(STREAM_TEMPLATE.into(), DEFAULT_STREAM_TEMPLATE.into());
    map.insert(EXCEPTION_TEMPLATE.into(), DEFAULT_EXCEPTION_TEMPLATE.into());
    map
}

/// Read the settings file and normalize its values into a layer.
pub fn load_settings(path: &Path) -> Result<OptionMap, ConvertError> {
    let raw: BTreeMap<String, String> = Config::builder()
        .add_source(File::from(path).format(FileFormat::Ini))
        .build()?
        .try_deserialize()?;

    Ok(raw
        .into_iter()
        .map(|(key, value)| (key, normalize(&value)))
        .collect())
}

/// Normalize one raw settings value: decode escapes, then coerce the
/// boolean token vocabulary. Anything unrecognized stays a string.
pub fn normalize(raw: &str) -> Value {
    let decoded = un_escape(raw);
    if TRUTHY_TOKENS.contains(&decoded.as_str()) {
        Value::Bool(true)
    } else if FALSY_TOKENS.contains(&decoded.as_str()) {
        Value::Bool(false)
    } else {
        Value::String(decoded)
    }
}

/// Decode the escape sequences an INI value may carry. Unknown escapes
/// are kept as written.
fn un_escape(value: &str) -> String {
    let mut decoded = String::with_capacity(value.len());
    let mut chars = value.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            decoded.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => decoded.push('\n'),
            Some('t') => decoded.push('\t'),
            Some('r') => decoded.push('\r'),
            Some('\\') => decoded.push('\\'),
            Some(other) => {
                decoded.push('\\');
                decoded.push(other);
            }
            None => decoded.push('\\'),
        }
    }
    decoded
}

/// The two conversion-wide layers (defaults and settings), ready to merge
/// per-cell layers on top.
#[derive(Debug, Clone)]
pub struct Resolver {
    base: OptionMap,
}

impl Resolver {
    /// Resolver over the built-in defaults alone.
    pub fn new() -> Self {
        Self { base: defaults() }
    }

    /// Resolver with a settings layer above the defaults.
    pub fn with_settings(settings: OptionMap) -> Self {
        let mut base = defaults();
        base.extend(settings);
        Self { base }
    }

    /// Merge the per-cell layers for one cell, highest precedence last.
    ///
    /// `inline` is the literal mapping found after a load directive; it is
    /// scoped to the cell layer.
    pub fn resolve(
        &self,
        notebook: Option<&OptionMap>,
        cell: Option<&OptionMap>,
        inline: Option<&OptionMap>,
    ) -> CellConfig {
        let mut options = self.base.clone();
        for layer in [notebook, cell, inline].into_iter().flatten() {
            for (key, value) in layer {
                options.insert(key.clone(), value.clone());
            }
        }
        CellConfig { options }
    }
}

impl Default for Resolver {
    fn default() -> Self {
        Self::new()
    }
}

/// Fully merged options for one cell's conversion.
#[derive(Debug, Clone)]
pub struct CellConfig {
    options: OptionMap,
}

impl CellConfig {
    /// Raw value of an option, from whichever layer supplied it.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.options.get(key)
    }

    /// Boolean view of an option. Metadata layers can supply any JSON
    /// type, so this follows the notebook ecosystem's truthiness: absent,
    /// null, false, zero, and empty values are false; everything else is
    /// true.
    pub fn flag(&self, key: &str) -> bool {
        match self.options.get(key) {
            None | Some(Value::Null) => false,
            Some(Value::Bool(flag)) => *flag,
            Some(Value::Number(n)) => n.as_f64().unwrap_or(0.0) != 0.0,
            Some(Value::String(s)) => !s.is_empty(),
            Some(Value::Array(items)) => !items.is_empty(),
            Some(Value::Object(map)) => !map.is_empty(),
        }
    }

    pub fn blackify(&self) -> bool {
        self.flag(BLACKIFY)
    }

    pub fn execute(&self) -> bool {
        self.flag(EXECUTE)
    }

    pub fn allow_errors(&self) -> bool {
        self.flag(ALLOW_ERRORS)
    }

    pub fn full_traceback(&self) -> bool {
        self.flag(FULL_TRACEBACK)
    }

    pub fn source_template(&self) -> &str {
        self.template(SOURCE_TEMPLATE, DEFAULT_SOURCE_TEMPLATE)
    }

    pub fn execute_result_template(&self) -> &str {
        self.template(EXECUTE_RESULT_TEMPLATE, DEFAULT_EXECUTE_RESULT_TEMPLATE)
    }

    pub fn stream_template(&self) -> &str {
        self.template(STREAM_TEMPLATE, DEFAULT_STREAM_TEMPLATE)
    }

    pub fn exception_template(&self) -> &str {
        self.template(EXCEPTION_TEMPLATE, DEFAULT_EXCEPTION_TEMPLATE)
    }

    /// A template option; non-string values fall back to the default.
    fn template(&self, key: &str, fallback: &'static str) -> &str {
        match self.options.get(key) {
            Some(Value::String(template)) => template,
            _ => fallback,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::io::Write;

    fn layer(pairs: &[(&str, Value)]) -> OptionMap {
        pairs
            .iter()
            .map(|(key, value)| (key.to_string(), value.clone()))
            .collect()
    }

    #[test]
    fn defaults_cover_every_option() {
        let map = defaults();
        for key in [
            BLACKIFY,
            EXECUTE,
            ALLOW_ERRORS,
            FULL_TRACEBACK,
            SOURCE_TEMPLATE,
            EXECUTE_RESULT_TEMPLATE,
            STREAM_TEMPLATE,
            EXCEPTION_TEMPLATE,
        ] {
            assert!(map.contains_key(key), "missing default for {key}");
        }
        assert_eq!(map.len(), 8);
    }

    #[test]
    fn later_layers_win() {
        let resolver = Resolver::with_settings(layer(&[(EXECUTE, json!(false))]));

        // Settings over defaults.
        assert!(!resolver.resolve(None, None, None).execute());

        // Notebook over settings.
        let notebook = layer(&[(EXECUTE, json!(true))]);
        assert!(resolver.resolve(Some(&notebook), None, None).execute());

        // Cell over notebook.
        let cell = layer(&[(EXECUTE, json!(false))]);
        assert!(!resolver.resolve(Some(&notebook), Some(&cell), None).execute());

        // Inline over cell.
        let inline = layer(&[(EXECUTE, json!(true))]);
        assert!(resolver
            .resolve(Some(&notebook), Some(&cell), Some(&inline))
            .execute());
    }

    #[test]
    fn overrides_replace_regardless_of_type() {
        let resolver = Resolver::new();
        let cell = layer(&[(SOURCE_TEMPLATE, json!(true)), (EXECUTE, json!("yes please"))]);
        let config = resolver.resolve(None, Some(&cell), None);

        // A non-string template falls back to the default fence.
        assert_eq!(config.source_template(), "```{{ language }}\n{{ source }}\n```");
        // A non-empty string is truthy.
        assert!(config.execute());
    }

    #[test]
    fn unknown_keys_are_preserved() {
        let resolver = Resolver::with_settings(layer(&[("site_theme", json!("dark"))]));
        let cell = layer(&[("custom", json!({"nested": 1}))]);
        let config = resolver.resolve(None, Some(&cell), None);

        assert_eq!(config.get("site_theme"), Some(&json!("dark")));
        assert_eq!(config.get("custom"), Some(&json!({"nested": 1})));
    }

    #[test]
    fn flag_truthiness() {
        let resolver = Resolver::new();
        let cell = layer(&[
            ("a", json!(null)),
            ("b", json!(0)),
            ("c", json!("")),
            ("d", json!([])),
            ("e", json!(2)),
            ("f", json!("x")),
            ("g", json!([1])),
        ]);
        let config = resolver.resolve(None, Some(&cell), None);

        for falsy in ["a", "b", "c", "d", "missing"] {
            assert!(!config.flag(falsy), "{falsy} should be false");
        }
        for truthy in ["e", "f", "g"] {
            assert!(config.flag(truthy), "{truthy} should be true");
        }
    }

    #[test]
    fn normalize_coerces_boolean_tokens() {
        for token in TRUTHY_TOKENS {
            assert_eq!(normalize(token), json!(true), "token {token:?}");
        }
        for token in FALSY_TOKENS {
            assert_eq!(normalize(token), json!(false), "token {token:?}");
        }

        // Exact matches only: near-misses stay strings.
        assert_eq!(normalize("TRUE"), json!("TRUE"));
        assert_eq!(normalize("yes!"), json!("yes!"));
        assert_eq!(normalize(" yes"), json!(" yes"));
    }

    #[test]
    fn normalize_decodes_escapes_first() {
        assert_eq!(normalize("a\\nb"), json!("a\nb"));
        assert_eq!(normalize("tab\\there"), json!("tab\there"));
        assert_eq!(normalize("back\\\\slash"), json!("back\\slash"));
        // Unknown escapes and a trailing backslash are kept as written.
        assert_eq!(normalize("\\q"), json!("\\q"));
        assert_eq!(normalize("end\\"), json!("end\\"));
    }

    #[test]
    fn loads_and_normalizes_settings_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "execute = no").unwrap();
        writeln!(file, "allow_errors = HELL YEAH!").unwrap();
        writeln!(file, "stream_template = [{{{{ name }}}}]\\n{{{{ text }}}}").unwrap();
        file.flush().unwrap();

        let settings = load_settings(file.path()).unwrap();

        assert_eq!(settings.get(EXECUTE), Some(&json!(false)));
        assert_eq!(settings.get(ALLOW_ERRORS), Some(&json!(true)));
        let template = settings.get(STREAM_TEMPLATE).and_then(Value::as_str).unwrap();
        assert!(template.contains('\n'), "escapes decoded, got {template:?}");
    }

    #[test]
    fn metadata_layers_override_loaded_settings() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "execute = Are you joking?").unwrap();
        writeln!(file, "blackify = no").unwrap();
        file.flush().unwrap();

        let resolver = Resolver::with_settings(load_settings(file.path()).unwrap());

        // The coerced tokens land below the metadata layers.
        let config = resolver.resolve(None, None, None);
        assert!(!config.execute());
        assert!(!config.blackify());

        let notebook = layer(&[(EXECUTE, json!(true))]);
        let cell = layer(&[(EXECUTE, json!(false))]);
        let inline = layer(&[(EXECUTE, json!(true))]);
        let config = resolver.resolve(Some(&notebook), Some(&cell), Some(&inline));
        assert!(config.execute(), "inline override outranks the cell layer");
        assert!(!config.blackify(), "untouched keys keep the settings value");
    }

    #[test]
    fn missing_settings_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = load_settings(&dir.path().join("no-such.ini"));
        assert!(matches!(result, Err(crate::error::ConvertError::Settings(_))));
    }
}
