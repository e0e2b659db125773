use eml_doc::{
    Action, BoundingBox, Confirmation, Edit, Eml, Error, Field, FieldValue, GeographicCoverage,
    License, Party, ValueTree,
};
use std::cell::Cell;
use std::rc::Rc;

const FIXTURE: &str = "tests/documents/eml.xml";

fn scalar_text(tree: &ValueTree, tags: &[&str]) -> Option<String> {
    let mut current = tree;
    for tag in tags {
        current = current.get(tag)?;
    }
    current.as_scalar().map(|scalar| scalar.to_string())
}

#[test]
fn edit_existing_document() {
    let mut eml = Eml::open(FIXTURE).unwrap();
    assert_eq!(eml.get(Field::Creator).unwrap().len(), 2);

    eml.set(FieldValue::Title("Elk Counts 2024".to_string()))
        .unwrap();
    eml.set(FieldValue::Creator(Party {
        given_name: Some("Jane".to_string()),
        sur_name: Some("Wapiti".to_string()),
        ..Party::default()
    }))
    .unwrap();
    eml.set(FieldValue::TemporalCoverage {
        begin: "2024-01-01".to_string(),
        end: "2024-12-31".to_string(),
    })
    .unwrap();
    eml.set(FieldValue::IntRights(License::CcZero)).unwrap();
    eml.stamp_version().unwrap();

    let doc = eml.document();
    let coverage = doc.find(&"dataset/coverage".parse().unwrap());
    assert_eq!(coverage.len(), 1);
    let names: Vec<&str> = coverage[0]
        .child_elements(doc)
        .iter()
        .map(|elem| elem.full_name(doc))
        .collect();
    assert_eq!(names, vec!["geographicCoverage", "temporalCoverage"]);

    let creators = eml.get_trees(Field::Creator).unwrap();
    assert_eq!(creators.len(), 1);
    assert_eq!(
        scalar_text(&creators[0], &["creator", "individualName", "surName"]),
        Some("Wapiti".to_string())
    );

    let temporal = eml.get_trees(Field::TemporalCoverage).unwrap();
    assert_eq!(
        scalar_text(
            &temporal[0],
            &["temporalCoverage", "rangeOfDates", "endDate", "calendarDate"]
        ),
        Some("2024-12-31".to_string())
    );

    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("edited.xml");
    eml.save(&file).unwrap();

    let reopened = Eml::open(&file).unwrap();
    let doc = reopened.document();
    let root = doc.root_element().unwrap();
    assert_eq!(root.attribute(doc, "system"), Some("knb"));
    assert_eq!(
        reopened.get_trees(Field::Title).unwrap(),
        vec![ValueTree::single("title", "Elk Counts 2024")]
    );
    assert_eq!(reopened.get(Field::Keywords).unwrap().len(), 1);
    assert_eq!(reopened.get(Field::Version).unwrap().len(), 1);
    assert_eq!(
        reopened.get_trees(Field::Cui).unwrap(),
        vec![ValueTree::single("CUI", "PUBLIC")]
    );
}

#[test]
fn build_from_scratch() {
    let mut eml = Eml::new();
    eml.set(FieldValue::GeographicCoverage(vec![
        GeographicCoverage {
            description: "North unit".to_string(),
            bounds: BoundingBox {
                west: -103.6,
                east: -103.3,
                north: 47.0,
                south: 46.8,
            },
        },
        GeographicCoverage {
            description: "South unit".to_string(),
            bounds: BoundingBox {
                west: -103.6,
                east: -103.2,
                north: 46.9,
                south: 46.5,
            },
        },
    ]))
    .unwrap();
    eml.set(FieldValue::Abstract(vec![
        "First paragraph.".to_string(),
        "Second paragraph.".to_string(),
    ]))
    .unwrap();

    assert_eq!(eml.get(Field::GeographicCoverage).unwrap().len(), 2);
    let doc = eml.document();
    assert_eq!(doc.find(&"dataset".parse().unwrap()).len(), 1);
    assert_eq!(doc.find(&"dataset/coverage".parse().unwrap()).len(), 1);
    assert_eq!(doc.find(&"dataset/abstract/para".parse().unwrap()).len(), 2);

    let xml = doc.write_str().unwrap();
    assert!(xml.contains(r#"<eml:eml xmlns:eml="https://eml.ecoinformatics.org/eml-2.2.0" system="eml-doc">"#));
    assert!(xml.contains("<westBoundingCoordinate>-103.6</westBoundingCoordinate>"));
}

#[test]
fn declined_delete_keeps_field() {
    let asked = Rc::new(Cell::new(0));
    let counter = Rc::clone(&asked);
    let mut eml = Eml::open(FIXTURE)
        .unwrap()
        .with_confirmation(move |confirmation: &Confirmation| {
            counter.set(counter.get() + 1);
            assert_eq!(confirmation.action, Action::Delete);
            assert_eq!(confirmation.existing.len(), 2);
            false
        });
    assert_eq!(eml.delete(Field::Creator).unwrap(), Edit::Declined);
    assert_eq!(asked.get(), 1);
    assert_eq!(eml.get(Field::Creator).unwrap().len(), 2);
    assert!(matches!(eml.delete(Field::Doi), Err(Error::NoSuchNode(_))));
    assert_eq!(asked.get(), 1);
}

#[test]
fn save_rejects_other_extensions() {
    let eml = Eml::open(FIXTURE).unwrap();
    let dir = tempfile::tempdir().unwrap();
    let err = eml.save(dir.path().join("edited.json")).unwrap_err();
    assert!(matches!(err, Error::InvalidFileName(_)));
    assert!(!dir.path().join("edited.json").exists());
}

#[test]
fn blank_creator_keeps_existing_creators() {
    let mut eml = Eml::open(FIXTURE).unwrap();
    let before = eml.document().write_str().unwrap();
    let err = eml
        .set(FieldValue::Creator(Party {
            sur_name: Some("  ".to_string()),
            ..Party::default()
        }))
        .unwrap_err();
    assert!(matches!(err, Error::InvalidValue(_)));
    assert_eq!(eml.get(Field::Creator).unwrap().len(), 2);
    assert_eq!(eml.document().write_str().unwrap(), before);
}
