use docsearch_core::{CorpusError, Document};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

const EXTENSIONS: &[&str] = &["json", "jsonl", "js"];

/// Load every record under `input` (a file, or a directory walked in path order).
pub fn load(input: &Path) -> Result<Vec<Document>, CorpusError> {
    let mut docs = Vec::new();
    for file in corpus_files(input)? {
        let raw = fs::read_to_string(&file).map_err(|source| CorpusError::Io { path: file.clone(), source })?;
        let before = docs.len();
        if file.extension().and_then(|s| s.to_str()) == Some("jsonl") {
            parse_jsonl(&raw, &mut docs)?;
        } else {
            parse_json(&file, &raw, &mut docs)?;
        }
        tracing::info!(file = %file.display(), records = docs.len() - before, "read corpus file");
    }
    Ok(docs)
}

fn corpus_files(input: &Path) -> Result<Vec<PathBuf>, CorpusError> {
    if input.is_file() {
        return Ok(vec![input.to_path_buf()]);
    }
    if !input.is_dir() {
        return Err(CorpusError::Io {
            path: input.to_path_buf(),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "no such file or directory"),
        });
    }
    let mut files = Vec::new();
    for entry in WalkDir::new(input).sort_by_file_name() {
        let entry = entry.map_err(|e| CorpusError::Io { path: input.to_path_buf(), source: e.into() })?;
        let p = entry.path();
        if p.is_file() && p.extension().and_then(|s| s.to_str()).is_some_and(|ext| EXTENSIONS.contains(&ext)) {
            files.push(p.to_path_buf());
        }
    }
    Ok(files)
}

fn parse_jsonl(raw: &str, docs: &mut Vec<Document>) -> Result<(), CorpusError> {
    for line in raw.lines() {
        if line.trim().is_empty() { continue; }
        let index = docs.len();
        let doc = serde_json::from_str(line).map_err(|e| CorpusError::Malformed { index, reason: e.to_string() })?;
        docs.push(doc);
    }
    Ok(())
}

/// Accepts a bare array, a `{"docs": [...]}` object, or the same wrapped in a
/// script assignment (`var documenterSearchIndex = {...}`).
fn parse_json(path: &Path, raw: &str, docs: &mut Vec<Document>) -> Result<(), CorpusError> {
    let parse_err = |reason: String| CorpusError::Parse { path: path.to_path_buf(), reason };
    let start = raw.find(|c: char| c == '{' || c == '[').ok_or_else(|| parse_err("no JSON value found".into()))?;
    let body = raw[start..].trim_end().trim_end_matches(';');
    let value: serde_json::Value = serde_json::from_str(body).map_err(|e| parse_err(e.to_string()))?;

    let records = match value {
        serde_json::Value::Array(arr) => arr,
        serde_json::Value::Object(mut obj) => match obj.remove("docs") {
            Some(serde_json::Value::Array(arr)) => arr,
            _ => return Err(parse_err("expected a \"docs\" array".into())),
        },
        _ => return Err(parse_err("expected an array or object".into())),
    };
    for record in records {
        let index = docs.len();
        let doc = serde_json::from_value(record).map_err(|e| CorpusError::Malformed { index, reason: e.to_string() })?;
        docs.push(doc);
    }
    Ok(())
}

/// Fold repeated `page` records that share a location into the first one.
///
/// Site generators emit one record per prose block, all pointing at the page
/// itself. Anchored records are left untouched, so a repeated anchor is still
/// reported by the builder.
pub fn merge_page_blocks(docs: Vec<Document>) -> Vec<Document> {
    let mut out: Vec<Document> = Vec::with_capacity(docs.len());
    let mut first: HashMap<(String, String), usize> = HashMap::new();
    let mut merged = 0usize;
    for doc in docs {
        if doc.category.is_page() {
            let key = (doc.location.clone(), doc.page.clone());
            if let Some(&at) = first.get(&key) {
                let target = &mut out[at];
                if !doc.text.is_empty() {
                    if !target.text.is_empty() {
                        target.text.push('\n');
                    }
                    target.text.push_str(&doc.text);
                }
                merged += 1;
                continue;
            }
            first.insert(key, out.len());
        }
        out.push(doc);
    }
    tracing::info!(merged, records = out.len(), "merged page blocks");
    out
}
