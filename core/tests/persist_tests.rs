use docsearch_core::persist::{self, load_index, save_index, Encoding, IndexPaths, FORMAT_VERSION, MAGIC};
use docsearch_core::{Document, IndexBuilder, IndexFormatError, InvertedIndex, SearchEngine, SearchOptions, TokenizerConfig};
use std::sync::Arc;
use tempfile::tempdir;

fn corpus() -> Vec<Document> {
    vec![
        Document::page("color_laws/", "Color Laws", "Color Laws", "CCM89 is very common for stellar observations."),
        Document::section("color_laws/#Usage", "Color Laws", "Usage"),
        Document::new("color_laws/#DustExtinction.OD94", "Color Laws", "DustExtinction.OD94", "type", "O'Donnell (1994) dust law."),
        Document::page("dust_maps/", "Dust Maps", "Dust Maps", "SFD98Map gives dust reddening in magnitudes."),
    ]
}

fn build() -> InvertedIndex {
    IndexBuilder::default().build(&corpus()).unwrap()
}

fn answers(index: InvertedIndex) -> Vec<Vec<(String, f32)>> {
    let engine = SearchEngine::new(Arc::new(index), SearchOptions::default());
    ["dust", "dust law", "ccm89", "usage", "reddening magnitudes", "absent"]
        .iter()
        .map(|q| engine.search(q, 10).unwrap().into_iter().map(|h| (h.location, h.score)).collect())
        .collect()
}

#[test]
fn round_trip_preserves_results() {
    for encoding in [Encoding::Binary, Encoding::Json] {
        let index = build();
        let restored = persist::deserialize(&persist::serialize(&index, encoding).unwrap()).unwrap();
        assert_eq!(restored, index);
        assert_eq!(answers(restored), answers(build()));
    }
}

#[test]
fn serialization_is_stable() {
    for encoding in [Encoding::Binary, Encoding::Json] {
        let a = persist::serialize(&build(), encoding).unwrap();
        let b = persist::serialize(&IndexBuilder::default().with_threads(2).with_shard_size(1).build(&corpus()).unwrap(), encoding).unwrap();
        assert_eq!(a, b);
    }
}

#[test]
fn rejects_unknown_header() {
    assert!(matches!(persist::deserialize(b"hello world"), Err(IndexFormatError::BadMagic)));
    assert!(matches!(persist::deserialize(b""), Err(IndexFormatError::BadMagic)));
}

#[test]
fn rejects_other_versions() {
    let mut bytes = persist::serialize(&build(), Encoding::Binary).unwrap();
    bytes[4..8].copy_from_slice(&(FORMAT_VERSION + 1).to_le_bytes());
    match persist::deserialize(&bytes) {
        Err(IndexFormatError::UnsupportedVersion { found, expected }) => {
            assert_eq!(found, FORMAT_VERSION + 1);
            assert_eq!(expected, FORMAT_VERSION);
        }
        other => panic!("expected version error, got {other:?}"),
    }

    let json = String::from_utf8(persist::serialize(&build(), Encoding::Json).unwrap()).unwrap();
    let bumped = json.replacen(&format!("\"version\": {FORMAT_VERSION}"), "\"version\": 99", 1);
    assert!(matches!(persist::deserialize(bumped.as_bytes()), Err(IndexFormatError::UnsupportedVersion { found: 99, .. })));
}

#[test]
fn rejects_truncated_blob() {
    let bytes = persist::serialize(&build(), Encoding::Binary).unwrap();
    let cut = &bytes[..bytes.len() - 7];
    assert!(matches!(persist::deserialize(cut), Err(IndexFormatError::Corrupt(_))));
    assert!(matches!(persist::deserialize(&bytes[..MAGIC.len() + 4]), Err(IndexFormatError::Corrupt(_))));
}

#[test]
fn rejects_inconsistent_json() {
    let json = String::from_utf8(persist::serialize(&build(), Encoding::Json).unwrap()).unwrap();
    let mut value: serde_json::Value = serde_json::from_str(&json).unwrap();
    value["index"]["docs"][0]["length"] = serde_json::json!(999);
    let tampered = serde_json::to_vec(&value).unwrap();
    assert!(matches!(persist::deserialize(&tampered), Err(IndexFormatError::Inconsistent(_))));
}

#[test]
fn rejects_repeated_location() {
    let json = String::from_utf8(persist::serialize(&build(), Encoding::Json).unwrap()).unwrap();
    let mut value: serde_json::Value = serde_json::from_str(&json).unwrap();
    value["index"]["docs"][3]["location"] = value["index"]["docs"][0]["location"].clone();
    let tampered = serde_json::to_vec(&value).unwrap();
    match persist::deserialize(&tampered) {
        Err(IndexFormatError::Inconsistent(msg)) => assert!(msg.contains("color_laws/"), "{msg}"),
        other => panic!("expected inconsistent index, got {other:?}"),
    }
}

#[test]
fn tokenizer_settings_travel_with_the_index() {
    let config = TokenizerConfig { min_token_length: 3, stem: true, ..Default::default() };
    let docs = vec![
        Document::page("laws/", "Laws", "Extinction laws", "Av of dust law models"),
        Document::page("maps/", "Maps", "Dust maps", "Galactic reddening"),
    ];
    let index = IndexBuilder::new(config.clone()).build(&docs).unwrap();
    for encoding in [Encoding::Binary, Encoding::Json] {
        let restored = persist::deserialize(&persist::serialize(&index, encoding).unwrap()).unwrap();
        assert_eq!(restored.tokenizer().config(), &config);

        let engine = SearchEngine::new(Arc::new(restored), SearchOptions::default());
        // "model" and "laws" only meet "models" and "law" through stemming.
        let hits = engine.search("model laws", 10).unwrap();
        assert_eq!(hits.iter().map(|h| h.location.as_str()).collect::<Vec<_>>(), vec!["laws/"]);
        // Two-letter words were never indexed and are dropped from queries too.
        assert!(engine.search("av", 10).unwrap().is_empty());
    }
}

#[test]
fn save_and_load_directory() {
    let dir = tempdir().unwrap();
    let paths = IndexPaths::new(dir.path());
    let path = save_index(&paths, &build(), Encoding::Json).unwrap();
    assert!(path.ends_with("index.json"));
    assert_eq!(load_index(&paths).unwrap(), build());

    // Switching encodings replaces the previous file.
    save_index(&paths, &build(), Encoding::Binary).unwrap();
    assert!(!paths.index_file(Encoding::Json).exists());
    assert_eq!(load_index(&paths).unwrap(), build());
}

#[test]
fn missing_index_is_reported() {
    let dir = tempdir().unwrap();
    assert!(matches!(load_index(&IndexPaths::new(dir.path())), Err(IndexFormatError::Missing(_))));
}
