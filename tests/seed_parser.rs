use pgmodel::seed::{
    load_seed, parse_seed_declarations, parse_seed_manifest, render_seed_declarations, SeedData,
    SeedRow, SeedValue,
};
use pgmodel::Error;

fn row(fields: &[(&str, SeedValue)]) -> SeedRow {
    fields
        .iter()
        .map(|(k, v)| (k.to_string(), v.clone()))
        .collect()
}

fn str_val(s: &str) -> SeedValue {
    SeedValue::Str(s.to_string())
}

fn reason_of(err: Error) -> (String, String) {
    match err {
        Error::SeedFormat {
            declaration,
            reason,
        } => (declaration, reason),
        other => panic!("expected a seed format error, got {other}"),
    }
}

#[test]
fn declarations_fixture() {
    let data = load_seed("tests/fixtures/seed.ts").unwrap();
    assert_eq!(data.keys().collect::<Vec<_>>(), ["planets", "droids"]);

    let planets = &data["planets"];
    assert_eq!(planets.len(), 2);
    assert_eq!(
        planets[0],
        row(&[
            ("name", str_val("Tatooine")),
            ("climate", str_val("arid")),
            ("terrain", str_val("desert")),
            ("diameter", SeedValue::Int(10465)),
            ("status", str_val("charted")),
        ])
    );
    assert_eq!(planets[1]["terrain"], str_val("tundra, ice caves"));

    assert_eq!(
        data["droids"],
        vec![row(&[("model", str_val("R2-D2")), ("active", SeedValue::Bool(true))])]
    );
}

#[test]
fn manifest_fixture_matches_declarations() {
    let manifest = load_seed("tests/fixtures/seed.toml").unwrap();
    let declarations = load_seed("tests/fixtures/seed.ts").unwrap();
    assert_eq!(manifest.len(), 1);
    assert_eq!(manifest["planets"], declarations["planets"]);
}

#[test]
fn let_var_and_literals() {
    let data = parse_seed_declarations(
        "let a = [{ x: 1.5, y: null, z: -3 }]\nvar b = [{ q: 'it\\'s' }]",
    )
    .unwrap();
    assert_eq!(
        data["a"][0],
        row(&[
            ("x", SeedValue::Float(1.5)),
            ("y", SeedValue::Null),
            ("z", SeedValue::Int(-3)),
        ])
    );
    assert_eq!(data["b"][0]["q"], str_val("it's"));
}

#[test]
fn empty_table() {
    let data = parse_seed_declarations("const planets = [];").unwrap();
    assert!(data["planets"].is_empty());
}

#[test]
fn empty_input() {
    assert!(parse_seed_declarations("").unwrap().is_empty());
    assert!(parse_seed_declarations("// nothing here\n").unwrap().is_empty());
}

#[test]
fn missing_assignment() {
    let err = parse_seed_declarations("const planets [{ name: 'Hoth' }]").unwrap_err();
    let (declaration, reason) = reason_of(err);
    assert!(declaration.starts_with("planets"), "{}", declaration);
    assert_eq!(reason, "missing assignment");
}

#[test]
fn unparsable_array() {
    let err = parse_seed_declarations("const planets = [{ name: }]").unwrap_err();
    let (declaration, _) = reason_of(err);
    assert_eq!(declaration, "planets=[{name:}]");

    let err = parse_seed_declarations("const planets = { name: 'Hoth' }").unwrap_err();
    let (_, reason) = reason_of(err);
    assert_eq!(reason, "expected `name = [ ... ]`");
}

#[test]
fn unbalanced_brackets() {
    let err = parse_seed_declarations("const planets = [{ name: 'Hoth' }").unwrap_err();
    let (_, reason) = reason_of(err);
    assert_eq!(reason, "unbalanced brackets");

    let err = parse_seed_declarations("const planets = [{ name: 'Hoth' }]]").unwrap_err();
    let (_, reason) = reason_of(err);
    assert_eq!(reason, "unbalanced brackets");
}

#[test]
fn unterminated_string() {
    let err = parse_seed_declarations("const planets = [{ name: 'Hoth }]").unwrap_err();
    let (_, reason) = reason_of(err);
    assert_eq!(reason, "unterminated string literal");
}

#[test]
fn text_outside_declaration() {
    let err = parse_seed_declarations("planets = [];").unwrap_err();
    let (declaration, reason) = reason_of(err);
    assert_eq!(declaration, "planets=[]");
    assert_eq!(reason, "text outside a declaration");
}

#[test]
fn duplicate_table() {
    let err = parse_seed_declarations("const a = [];\nconst a = [];").unwrap_err();
    let (_, reason) = reason_of(err);
    assert!(reason.contains("more than once"), "{}", reason);
}

#[test]
fn nested_values_are_rejected() {
    let err = parse_seed_declarations("const a = [{ tags: ['x'] }]").unwrap_err();
    let (_, reason) = reason_of(err);
    assert!(reason.contains("`tags`"), "{}", reason);
}

#[test]
fn declarations_round_trip() {
    let mut data = SeedData::new();
    data.insert(
        "planets".to_string(),
        vec![
            row(&[
                ("name", str_val("Yavin IV")),
                ("note", str_val("say \"hi\"\tthen\nleave")),
                ("diameter", SeedValue::Int(10200)),
            ]),
            row(&[
                ("name", str_val("Bespin")),
                ("note", SeedValue::Null),
                ("diameter", SeedValue::Int(118000)),
            ]),
        ],
    );
    data.insert(
        "flags".to_string(),
        vec![row(&[("on", SeedValue::Bool(false)), ("ratio", SeedValue::Float(0.25))])],
    );

    let text = render_seed_declarations(&data);
    assert_eq!(parse_seed_declarations(&text).unwrap(), data);
}

#[test]
fn manifest_errors() {
    let err = parse_seed_manifest("planets = 3").unwrap_err();
    let (declaration, reason) = reason_of(err);
    assert_eq!(declaration, "[[planets]]");
    assert_eq!(reason, "expected an array of tables");

    let err = parse_seed_manifest("[[planets]]\ntags = [\"a\"]").unwrap_err();
    let (_, reason) = reason_of(err);
    assert!(reason.contains("`tags`"), "{}", reason);

    assert!(matches!(
        parse_seed_manifest("[[planets]\n").unwrap_err(),
        Error::SeedFormat { .. }
    ));
}

#[test]
fn manifest_datetimes_become_strings() {
    let data = parse_seed_manifest("[[events]]\nat = 2024-05-04T12:00:00Z\n").unwrap();
    assert_eq!(data["events"][0]["at"], str_val("2024-05-04T12:00:00Z"));
}

#[test]
fn wide_numbers_keep_their_digits() {
    let data =
        parse_seed_declarations("const planets = [{ id: 12345678901234567890123, mass: 0.1000000000000000000001 }];")
            .unwrap();
    assert_eq!(
        data["planets"][0]["id"],
        SeedValue::Number("12345678901234567890123".to_string())
    );
    assert_eq!(
        data["planets"][0]["mass"],
        SeedValue::Number("0.1000000000000000000001".to_string())
    );

    let sql = pgmodel::sql::insert_query(&data["planets"], "planets").unwrap();
    assert_eq!(
        sql,
        "INSERT INTO planets (id, mass) VALUES ('12345678901234567890123', '0.1000000000000000000001')"
    );

    let text = render_seed_declarations(&data);
    assert_eq!(parse_seed_declarations(&text).unwrap(), data);
}
