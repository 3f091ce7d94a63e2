//! End-to-end tests over a small C fixture: load locations, walk the id
//! space, render and apply patches.

use f1x::{
    decode, encode, enumerate, expression_to_string, load_candidate_locations, rank,
    visualize_element, visualize_f1xid, DefectClass, F1xId, IdSpace, LoadError, ParseError,
    SearchConfig, SearchSpaceElement, SourcePatch, Transformation, Type,
};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

fn fixture(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures")
        .join(name)
}

/// Copy the C fixture into a scratch directory so tests may patch it.
fn scratch_source() -> (TempDir, PathBuf) {
    let dir = TempDir::new().unwrap();
    let file = dir.path().join("clamp.c");
    fs::copy(fixture("clamp.c"), &file).unwrap();
    (dir, file)
}

#[test]
fn test_load_fixture() {
    let locations = load_candidate_locations(fixture("locations.json")).unwrap();
    assert_eq!(locations.len(), 2);
    assert_eq!(locations[0].defect, DefectClass::Condition);
    assert_eq!(expression_to_string(&locations[0].original), "(x > max)");
    assert_eq!(locations[1].defect, DefectClass::Expression);
    assert_eq!(locations[1].components.len(), 2);
}

#[test]
fn test_alternative_operator_candidate() {
    let locations = load_candidate_locations(fixture("locations.json")).unwrap();
    let loc = &locations[0];

    // pair (x, max) combined with >=
    let id = F1xId::new(4, 0, 6, 0, 0);
    let element = SearchSpaceElement::decode(loc, id).unwrap();
    assert_eq!(expression_to_string(element.patch()), "(x >= max)");
    assert_eq!(element.meta().transformation, Transformation::Alternative);
    assert_eq!(element.meta().distance, 1);
    assert_eq!(visualize_f1xid(element.id()), "4:0:6:0:0");

    let reencoded = encode(element.patch(), loc).unwrap();
    assert_eq!(&decode(&reencoded, loc).unwrap(), element.patch());
}

#[test]
fn test_ranked_enumeration_starts_with_original() {
    let locations = load_candidate_locations(fixture("locations.json")).unwrap();
    let mut elements = enumerate(&locations[0], &SearchConfig::default());
    assert!(!elements.is_empty());
    rank(&mut elements);

    assert_eq!(elements[0].meta().transformation, Transformation::None);
    assert_eq!(elements[0].meta().distance, 0);
    assert!(elements.iter().all(|e| e.patch().ty == Type::Boolean));

    let space = IdSpace::for_location(&locations[0], SearchConfig::default().param_limit);
    assert!(elements.iter().all(|e| space.contains(e.id())));
}

#[test]
fn test_expression_location_with_parameter() {
    let locations = load_candidate_locations(fixture("locations.json")).unwrap();
    let loc = &locations[1];

    let element = SearchSpaceElement::decode(loc, F1xId::new(0, 1, 0, 0, 2)).unwrap();
    assert_eq!(expression_to_string(element.patch()), "(x + 1)");

    let elements = enumerate(loc, &SearchConfig::default());
    assert!(elements.iter().all(|e| e.patch().ty == Type::Integer));
    assert!(elements
        .iter()
        .any(|e| expression_to_string(e.patch()) == "(x + 1)"));
}

#[test]
fn test_visualize_and_apply() {
    let (_dir, file) = scratch_source();
    let locations = load_candidate_locations(fixture("locations.json")).unwrap();
    let element = SearchSpaceElement::decode(&locations[0], F1xId::new(4, 0, 6, 0, 0)).unwrap();

    let diff = visualize_element(&element, &file).unwrap();
    assert!(diff.contains("-    if (x > max)"));
    assert!(diff.contains("+    if ((x >= max))"));

    let original = fs::read_to_string(&file).unwrap();
    let applied = SourcePatch::for_element(&element, &file)
        .unwrap()
        .apply()
        .unwrap();
    assert!(fs::read_to_string(&file)
        .unwrap()
        .contains("if ((x >= max))"));
    applied.revert().unwrap();
    assert_eq!(fs::read_to_string(&file).unwrap(), original);
}

#[test]
fn test_malformed_location_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("broken.json");
    let mut doc: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(fixture("locations.json")).unwrap()).unwrap();
    doc["locations"][1]
        .as_object_mut()
        .unwrap()
        .remove("defect");
    fs::write(&path, doc.to_string()).unwrap();

    match load_candidate_locations(&path).unwrap_err() {
        LoadError::Parse { path: reported, source } => {
            assert_eq!(reported, path);
            assert_eq!(
                source,
                ParseError::MissingField {
                    context: "locations[1]".to_string(),
                    field: "defect",
                }
            );
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_missing_location_file() {
    let err = load_candidate_locations("/nonexistent/locations.json").unwrap_err();
    assert!(matches!(err, LoadError::Io { .. }));
}
