use pgmodel::seed::{SeedRow, SeedTable, SeedValue};
use pgmodel::sql::{
    create_enum_query, create_table_query, insert_query, rewrite_check_condition,
};
use pgmodel::introspect::{apply_constraint, CatalogConstraint, ConstraintKind};
use pgmodel::{lint_schema, Association, ColumnMetadata, Error, Schema, TableMetadata};

fn planets() -> Schema {
    Schema::load("tests/fixtures/planets.models.toml").unwrap()
}

fn rows(data: &[&[(&str, SeedValue)]]) -> SeedTable {
    data.iter()
        .map(|fields| {
            fields
                .iter()
                .map(|(k, v)| (k.to_string(), v.clone()))
                .collect::<SeedRow>()
        })
        .collect()
}

fn text(s: &str) -> SeedValue {
    SeedValue::Str(s.to_string())
}

#[test]
fn create_table_with_constraints() {
    let schema = planets();
    let query = create_table_query("planets", &schema.tables["planets"]).unwrap();
    assert_eq!(
        query.create,
        "CREATE TABLE IF NOT EXISTS planets (id SERIAL PRIMARY KEY NOT NULL, \
         name varchar(50) NOT NULL UNIQUE, climate text, terrain text, \
         diameter integer NOT NULL DEFAULT 0, status planet_status)"
    );
    assert!(query.foreign_keys.is_empty());
    assert_eq!(
        query.checks,
        [
            "ALTER TABLE planets ADD CONSTRAINT \"climate_known\" CHECK (climate in ('arid', 'temperate', 'frozen'))",
            "ALTER TABLE planets ADD CONSTRAINT \"diameter_positive\" CHECK (diameter >= 0)",
        ]
    );
}

#[test]
fn foreign_keys_are_deferred() {
    let schema = planets();
    let query = create_table_query("moons", &schema.tables["moons"]).unwrap();
    assert_eq!(
        query.create,
        "CREATE TABLE IF NOT EXISTS moons (id SERIAL PRIMARY KEY NOT NULL, name text NOT NULL, planet_id integer NOT NULL)"
    );
    assert_eq!(
        query.foreign_keys,
        ["ALTER TABLE moons ADD CONSTRAINT moons_planet_id_fkey0 FOREIGN KEY (\"planet_id\") REFERENCES planets(id)"]
    );

    let statements: Vec<&str> = query.statements().collect();
    assert_eq!(statements.len(), 2);
    assert!(statements[0].starts_with("CREATE TABLE"));
    assert_eq!(query.to_string().lines().count(), 2);
    assert!(query.to_string().lines().all(|l| l.ends_with(';')));
}

#[test]
fn foreign_key_index_increments_per_table() {
    let columns: TableMetadata = [
        (
            "origin",
            ColumnMetadata::sql("integer").association(Association::new("a", "planets", "id")),
        ),
        (
            "destination",
            ColumnMetadata::sql("integer").association(Association::new("b", "planets", "id")),
        ),
    ]
    .into_iter()
    .collect();
    let query = create_table_query("routes", &columns).unwrap();
    assert!(query.foreign_keys[0].contains("routes_origin_fkey0"));
    assert!(query.foreign_keys[1].contains("routes_destination_fkey1"));
}

#[test]
fn auto_increment_overrides_declared_type() {
    let columns: TableMetadata = [("id", ColumnMetadata::sql("bigint").auto_increment().length(8))]
        .into_iter()
        .collect();
    let query = create_table_query("t", &columns).unwrap();
    assert_eq!(query.create, "CREATE TABLE IF NOT EXISTS t (id SERIAL)");
}

#[test]
fn length_is_not_applied_twice() {
    let columns: TableMetadata = [("code", ColumnMetadata::sql("varchar(3)").length(3))]
        .into_iter()
        .collect();
    let query = create_table_query("t", &columns).unwrap();
    assert_eq!(query.create, "CREATE TABLE IF NOT EXISTS t (code varchar(3))");
}

#[test]
fn multi_condition_check_is_conjoined() {
    let columns: TableMetadata = [(
        "size",
        ColumnMetadata::sql("text").check("size_ok", ["size = ['s', 'm']", "size <> 'xl'"]),
    )]
    .into_iter()
    .collect();
    let query = create_table_query("shirts", &columns).unwrap();
    assert_eq!(
        query.checks,
        ["ALTER TABLE shirts ADD CONSTRAINT \"size_ok\" CHECK (size in ('s', 'm') AND size <> 'xl')"]
    );
}

#[test]
fn malformed_descriptors_fail() {
    let columns: TableMetadata = [(
        "planet_id",
        ColumnMetadata::sql("integer").association(Association::new("fk", "", "id")),
    )]
    .into_iter()
    .collect();
    let err = create_table_query("moons", &columns).unwrap_err();
    assert!(
        matches!(err, Error::ConstraintGeneration { ref table, ref column, .. } if table == "moons" && column == "planet_id")
    );

    let columns: TableMetadata = [(
        "size",
        ColumnMetadata::sql("text").check("empty", Vec::<&str>::new()),
    )]
    .into_iter()
    .collect();
    assert!(matches!(
        create_table_query("shirts", &columns).unwrap_err(),
        Error::ConstraintGeneration { .. }
    ));

    let columns: TableMetadata = [(
        "size",
        ColumnMetadata::sql("text").check("bad", ["size = []"]),
    )]
    .into_iter()
    .collect();
    assert!(matches!(
        create_table_query("shirts", &columns).unwrap_err(),
        Error::ConstraintGeneration { .. }
    ));
}

#[test]
fn check_condition_rewrite() {
    assert_eq!(
        rewrite_check_condition("climate = [1, 2]").unwrap(),
        "climate in (1, 2)"
    );
    assert_eq!(
        rewrite_check_condition("diameter > 0").unwrap(),
        "diameter > 0"
    );
    assert_eq!(
        rewrite_check_condition("(climate = ANY (ARRAY['arid'::text, 'frozen'::text]))").unwrap(),
        "(climate = ANY (ARRAY['arid'::text, 'frozen'::text]))"
    );
    assert!(rewrite_check_condition("climate = []").is_err());
    assert!(rewrite_check_condition("  ").is_err());
}

#[test]
fn enum_type() {
    let labels = vec!["charted".to_string(), "uncharted".to_string()];
    assert_eq!(
        create_enum_query("planet_status", &labels).unwrap(),
        "CREATE TYPE planet_status AS ENUM ('charted', 'uncharted')"
    );
    let labels = vec!["o'clock".to_string()];
    assert!(create_enum_query("times", &labels).is_err());
}

#[test]
fn insert_quotes_every_value() {
    let table = rows(&[
        &[
            ("name", text("Tatooine")),
            ("diameter", SeedValue::Int(10465)),
            ("habitable", SeedValue::Bool(true)),
        ],
        &[
            ("name", text("Hoth")),
            ("diameter", SeedValue::Int(7200)),
            ("habitable", SeedValue::Null),
        ],
    ]);
    assert_eq!(
        insert_query(&table, "planets").unwrap(),
        "INSERT INTO planets (name, diameter, habitable) VALUES \
         ('Tatooine', '10465', 'true'), ('Hoth', '7200', NULL)"
    );
}

#[test]
fn insert_uses_first_row_column_order() {
    let table = rows(&[
        &[("a", text("1")), ("b", text("2"))],
        &[("b", text("4")), ("a", text("3"))],
    ]);
    assert_eq!(
        insert_query(&table, "t").unwrap(),
        "INSERT INTO t (a, b) VALUES ('1', '2'), ('3', '4')"
    );
}

#[test]
fn insert_rejects_apostrophes() {
    let table = rows(&[&[("name", text("Ord Mantell's"))]]);
    match insert_query(&table, "planets").unwrap_err() {
        Error::UnsupportedLiteral {
            table,
            column,
            value,
        } => {
            assert_eq!(table, "planets");
            assert_eq!(column, "name");
            assert_eq!(value, "Ord Mantell's");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn insert_rejects_ragged_rows() {
    let table = rows(&[&[("a", text("1")), ("b", text("2"))], &[("a", text("3"))]]);
    assert!(matches!(
        insert_query(&table, "t").unwrap_err(),
        Error::SeedFormat { ref reason, .. } if reason.contains("row 1")
    ));

    let table = rows(&[&[("a", text("1"))], &[("c", text("3"))]]);
    assert!(matches!(
        insert_query(&table, "t").unwrap_err(),
        Error::SeedFormat { ref reason, .. } if reason.contains("`a`")
    ));

    assert!(matches!(
        insert_query(&Vec::new(), "t").unwrap_err(),
        Error::SeedFormat { .. }
    ));
}

#[test]
fn introspected_in_check_recreates() {
    let mut schema = Schema::default();
    let mut columns: TableMetadata = [
        ("id", ColumnMetadata::sql("integer").not_null(true).primary_key()),
        ("climate", ColumnMetadata::sql("text")),
    ]
    .into_iter()
    .collect();
    apply_constraint(
        &mut columns,
        CatalogConstraint {
            name: "climate_known".into(),
            kind: ConstraintKind::Check,
            column: "climate".into(),
            definition: "CHECK ((climate = ANY (ARRAY['arid'::text, 'frozen'::text])))".into(),
            foreign_table: None,
            foreign_column: None,
        },
    );
    schema.tables.insert("planets".into(), columns);

    assert_eq!(lint_schema(&schema), Vec::<String>::new());
    let query = create_table_query("planets", &schema.tables["planets"]).unwrap();
    assert_eq!(
        query.checks,
        ["ALTER TABLE planets ADD CONSTRAINT \"climate_known\" CHECK ((climate = ANY (ARRAY['arid'::text, 'frozen'::text])))"]
    );
}
