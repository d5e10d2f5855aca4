//! Serde model for the notebook JSON format (nbformat 4).
//!
//! Cells are tagged by `cell_type` and output records by `output_type`.
//! Text fields (`source`, stream `text`) may be stored as a single string
//! or as a list of line strings; both forms deserialize to one `String`
//! with the line boundaries preserved.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// JSON object type used for notebook and cell metadata.
pub type JsonMap = Map<String, Value>;

/// Metadata key that carries conversion overrides at the notebook and cell
/// level.
pub const OVERRIDE_KEY: &str = "offprint";

/// Language assumed when a notebook declares no kernel metadata.
pub const DEFAULT_LANGUAGE: &str = "python";

/// A parsed notebook: ordered cells plus notebook-level metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notebook {
    #[serde(default)]
    pub cells: Vec<Cell>,

    #[serde(default)]
    pub metadata: NotebookMetadata,

    #[serde(default = "default_nbformat")]
    pub nbformat: u32,

    #[serde(default)]
    pub nbformat_minor: u32,
}

fn default_nbformat() -> u32 {
    4
}

/// Notebook-level metadata. Kernel and language records are modeled;
/// everything else is carried through untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NotebookMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kernelspec: Option<KernelSpec>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language_info: Option<LanguageInfo>,

    #[serde(flatten)]
    pub extra: JsonMap,
}

/// The kernel a notebook was last run with.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KernelSpec {
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,

    #[serde(flatten)]
    pub extra: JsonMap,
}

/// The language the notebook's code cells are written in.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LanguageInfo {
    pub name: String,

    #[serde(flatten)]
    pub extra: JsonMap,
}

impl Notebook {
    /// Parse notebook JSON.
    pub fn parse(source: &str) -> Result<Self, NotebookError> {
        Ok(serde_json::from_str(source)?)
    }

    /// Kernel language declared by the notebook, if any. `language_info`
    /// wins over the kernelspec when both are present.
    pub fn language(&self) -> Option<&str> {
        self.metadata
            .language_info
            .as_ref()
            .map(|info| info.name.as_str())
            .or_else(|| {
                self.metadata
                    .kernelspec
                    .as_ref()
                    .and_then(|spec| spec.language.as_deref())
            })
    }

    /// Kernel language, falling back to [`DEFAULT_LANGUAGE`].
    pub fn language_or_default(&self) -> &str {
        self.language().unwrap_or(DEFAULT_LANGUAGE)
    }

    /// Notebook-level conversion override mapping, if present.
    pub fn override_map(&self) -> Option<&JsonMap> {
        self.metadata.extra.get(OVERRIDE_KEY).and_then(Value::as_object)
    }
}

/// One notebook cell, tagged by `cell_type`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "cell_type", rename_all = "snake_case")]
pub enum Cell {
    Code(CodeCell),
    Markdown(MarkdownCell),
    Raw(RawCell),
}

impl Cell {
    /// A synthesized raw cell carrying already-rendered content.
    pub fn raw(source: impl Into<String>) -> Self {
        Cell::Raw(RawCell {
            source: source.into(),
            metadata: JsonMap::new(),
            id: None,
        })
    }
}

/// A code cell: source, metadata, and the outputs captured when it last
/// ran.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CodeCell {
    #[serde(with = "text")]
    pub source: String,

    #[serde(default)]
    pub metadata: JsonMap,

    #[serde(default)]
    pub outputs: Vec<Output>,

    #[serde(default)]
    pub execution_count: Option<i64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
}

impl CodeCell {
    /// Cell-level conversion override mapping, if present.
    pub fn override_map(&self) -> Option<&JsonMap> {
        self.metadata.get(OVERRIDE_KEY).and_then(Value::as_object)
    }

    /// Cell-level conversion override mapping, created on demand. A
    /// non-object value under the key is replaced.
    pub fn override_map_mut(&mut self) -> &mut JsonMap {
        let entry = self
            .metadata
            .entry(OVERRIDE_KEY.to_string())
            .or_insert_with(|| Value::Object(JsonMap::new()));
        if !entry.is_object() {
            *entry = Value::Object(JsonMap::new());
        }
        entry.as_object_mut().expect("entry was just made an object")
    }
}

/// A prose cell.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MarkdownCell {
    #[serde(with = "text")]
    pub source: String,

    #[serde(default)]
    pub metadata: JsonMap,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
}

/// A cell whose source passes through to the exported document verbatim.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawCell {
    #[serde(with = "text")]
    pub source: String,

    #[serde(default)]
    pub metadata: JsonMap,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
}

/// One output record captured from running a code cell, tagged by
/// `output_type`. Record kinds outside the known set land in `Other` with
/// their JSON preserved, so callers decide how strict to be.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "output_type", rename_all = "snake_case")]
pub enum Output {
    ExecuteResult {
        #[serde(default)]
        data: JsonMap,

        #[serde(default)]
        metadata: JsonMap,

        #[serde(default)]
        execution_count: Option<i64>,
    },

    Stream {
        name: String,

        #[serde(with = "text")]
        text: String,
    },

    Error {
        ename: String,
        evalue: String,

        #[serde(default)]
        traceback: Vec<String>,
    },

    #[serde(untagged)]
    Other(Value),
}

impl Output {
    /// The `output_type` tag of an unrecognized record.
    pub fn other_kind(&self) -> Option<&str> {
        match self {
            Output::Other(value) => value.get("output_type").and_then(Value::as_str),
            _ => None,
        }
    }
}

/// The `text/plain` entry of an output data mapping, lines joined.
pub fn plain_text(data: &JsonMap) -> Option<String> {
    data.get("text/plain").and_then(join_lines)
}

/// Join a string-or-list-of-lines JSON value. Notebook line lists already
/// carry their own newlines, so joining is plain concatenation.
fn join_lines(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Array(lines) => {
            let mut joined = String::new();
            for line in lines {
                joined.push_str(line.as_str()?);
            }
            Some(joined)
        }
        _ => None,
    }
}

/// Serde adapter for string-or-list-of-lines text fields. Always
/// serializes back as a single string.
mod text {
    use serde::{Deserialize, Deserializer, Serializer};
    use serde_json::Value;

    pub fn serialize<S: Serializer>(value: &str, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(value)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
        let value = Value::deserialize(deserializer)?;
        super::join_lines(&value)
            .ok_or_else(|| serde::de::Error::custom("expected a string or a list of strings"))
    }
}

/// Errors that can occur when reading a notebook.
#[derive(Debug, thiserror::Error)]
pub enum NotebookError {
    #[error("Invalid notebook JSON: {0}")]
    Json(#[from] serde_json::Error),
}
