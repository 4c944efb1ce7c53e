use ndserial::csv::{self, CsvCollectionSerializer, CsvOptions, CsvSerializer};
use ndserial::{value, Error, Value};
use std::io::Cursor;

#[test]
fn test_collection_serializer_renders_correct_rows() {
    let example = value!({
        "one": {"foo": "baz1", "bar": "inga1"},
        "three": {"foo": "baz3", "bar": "inga3"},
        "two": {"foo": "baz2", "bar": "inga2"}
    });
    let ordering = ["one", "two", "three"].map(String::from).to_vec();
    let serializer = CsvCollectionSerializer::new(example, Some(ordering)).unwrap();

    let text = csv::dumps(&Value::Array(
        serializer.render().unwrap().into_iter().map(Value::Array).collect(),
    ))
    .unwrap();
    assert_eq!(text, ",bar,foo\none,inga1,baz1\ntwo,inga2,baz2\nthree,inga3,baz3\n");
}

#[test]
fn test_collection_serializer_without_ordering_uses_insertion_order() {
    let example = value!({"b": {"x": 1}, "a": {"x": 2}});
    let rows = CsvCollectionSerializer::new(example, None)
        .unwrap()
        .body()
        .unwrap();
    assert_eq!(rows, vec![vec![value!("b"), value!(1)], vec![value!("a"), value!(2)]]);
}

#[test]
fn test_collection_of_non_mappings_is_rejected() {
    let err = CsvCollectionSerializer::new(value!([1, 2]), None).unwrap_err();
    assert!(matches!(err, Error::Malformed(_)));
    let err = CsvCollectionSerializer::new(value!([]), None).unwrap_err();
    assert!(matches!(err, Error::Malformed(_)));
}

#[test]
fn test_load_from_stream_and_path() {
    let text = "id,label\n1,alpha\n2,\"beta, gamma\"\n";
    let mut cursor = Cursor::new(text.as_bytes().to_vec());
    let rows = csv::load(&mut cursor, &CsvOptions::new()).unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[1].get("label"), Some(&value!("beta, gamma")));

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("table.csv");
    std::fs::write(&path, text).unwrap();
    assert_eq!(csv::load(&path, &CsvOptions::new()).unwrap(), rows);
}

#[test]
fn test_dump_then_load() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("out.csv");
    csv::dump(&value!([["x", "y"], [1, 2.5], [-3, null]]), &path).unwrap();

    let rows = csv::load(&path, &CsvOptions::new()).unwrap();
    assert_eq!(rows[0].get("y"), Some(&value!("2.5")));
    assert_eq!(rows[1].get("x"), Some(&value!("-3")));
    assert_eq!(rows[1].get("y"), Some(&value!("")));
}

#[test]
fn test_header_transformer() {
    let options = CsvOptions::new().with_header_transformer(|names| {
        names.into_iter().map(|n| format!("col_{}", n)).collect()
    });
    let rows = csv::loads("a,b\n1,2\n", &options).unwrap();
    assert_eq!(rows[0].get("col_b"), Some(&value!("2")));
}

#[test]
fn test_ragged_row_reports_line() {
    let err = csv::loads("a,b,c\n1,2,3\n4,5,6\n7,8\n", &CsvOptions::new()).unwrap_err();
    assert!(err
        .to_string()
        .contains("Header row contains 3 items but line 4 contains 2"));
}
