// src/transform/mod.rs

use glob::glob;
use quick_xml::events::Event;
use quick_xml::Reader;
use serde_json::{Map, Value};
use std::ffi::OsStr;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

use crate::error::ScrapeError;

#[derive(Debug, Error)]
pub enum TransformError {
    #[error("XML parse error: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("bad attribute: {0}")]
    Attr(#[from] quick_xml::events::attributes::AttrError),

    #[error("document has no root element")]
    EmptyDocument,

    #[error("closing tag without a matching open tag")]
    Unbalanced,

    #[error("file name is not valid UTF-8")]
    BadFileName,

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Default, PartialEq, Eq)]
pub struct TransformSummary {
    pub converted: usize,
    pub failed: usize,
}

struct Node {
    name: String,
    attributes: Map<String, Value>,
    children: Vec<Value>,
    text: String,
}

impl Node {
    fn new(name: String) -> Self {
        Self {
            name,
            attributes: Map::new(),
            children: Vec::new(),
            text: String::new(),
        }
    }

    fn into_value(self) -> Value {
        let mut obj = Map::new();
        obj.insert("name".to_string(), Value::String(self.name));
        if !self.attributes.is_empty() {
            obj.insert("attributes".to_string(), Value::Object(self.attributes));
        }
        if !self.text.is_empty() {
            obj.insert("text".to_string(), Value::String(self.text));
        }
        if !self.children.is_empty() {
            obj.insert("children".to_string(), Value::Array(self.children));
        }
        Value::Object(obj)
    }
}

fn read_node(e: &quick_xml::events::BytesStart<'_>) -> Result<Node, TransformError> {
    let mut node = Node::new(String::from_utf8_lossy(e.local_name().as_ref()).to_string());
    for attr in e.attributes() {
        let attr = attr?;
        node.attributes.insert(
            String::from_utf8_lossy(attr.key.as_ref()).to_string(),
            Value::String(
                attr.unescape_value()
                    .map_err(quick_xml::Error::from)?
                    .to_string(),
            ),
        );
    }
    Ok(node)
}

/// Convert an XML document into a JSON tree. Each element becomes an
/// object with `name`, plus `attributes`, `text`, and `children` keys when
/// present; sibling order is preserved by the `children` array.
pub fn xml_to_value(xml: &str) -> Result<Value, TransformError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut stack: Vec<Node> = Vec::new();
    let mut root: Option<Value> = None;
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) => stack.push(read_node(&e)?),
            Event::Empty(e) => {
                let value = read_node(&e)?.into_value();
                match stack.last_mut() {
                    Some(parent) => parent.children.push(value),
                    None if root.is_none() => root = Some(value),
                    None => {}
                }
            }
            Event::End(_) => {
                let node = stack.pop().ok_or(TransformError::Unbalanced)?;
                let value = node.into_value();
                match stack.last_mut() {
                    Some(parent) => parent.children.push(value),
                    None if root.is_none() => root = Some(value),
                    None => {}
                }
            }
            Event::Text(e) => {
                if let Some(current) = stack.last_mut() {
                    let text = e.unescape().map_err(quick_xml::Error::from)?;
                    current.text.push_str(text.trim());
                }
            }
            Event::CData(e) => {
                if let Some(current) = stack.last_mut() {
                    current.text.push_str(&String::from_utf8_lossy(&e));
                }
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    root.ok_or(TransformError::EmptyDocument)
}

fn transform_file(path: &Path, output_dir: &Path) -> Result<PathBuf, TransformError> {
    let xml = fs::read_to_string(path)?;
    let value = xml_to_value(&xml)?;
    let stem = path
        .file_stem()
        .and_then(OsStr::to_str)
        .ok_or(TransformError::BadFileName)?;
    let out_path = output_dir.join(format!("{stem}.json"));
    fs::write(&out_path, serde_json::to_string_pretty(&value)?)?;
    Ok(out_path)
}

/// Convert every extracted payload in `extract_dir` to JSON under
/// `output_dir`, overwriting previous outputs. Re-running is idempotent:
/// there is no "already converted" marker, just equivalent overwrites.
/// A file that fails to parse is logged and skipped, never fatal.
#[instrument(level = "info", skip(extract_dir, output_dir))]
pub fn transform_all(extract_dir: &Path, output_dir: &Path) -> Result<TransformSummary, ScrapeError> {
    fs::create_dir_all(output_dir)?;
    let mut summary = TransformSummary::default();

    let pattern = format!("{}/*.xml", extract_dir.display());
    for path in glob(&pattern)?.filter_map(Result::ok) {
        match transform_file(&path, output_dir) {
            Ok(out_path) => {
                debug!(from = %path.display(), to = %out_path.display(), "converted");
                summary.converted += 1;
            }
            Err(e) => {
                warn!(file = %path.display(), error = %e, "transform failed; continuing");
                summary.failed += 1;
            }
        }
    }

    info!(converted = summary.converted, failed = summary.failed, "transform pass done");
    Ok(summary)
}
