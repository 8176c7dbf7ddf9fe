use pretty_assertions::assert_eq;

use tabspec_convert::{ConvertConfig, LoadConfig, Loader};
use tabspec_core::{Error, IntervalUnit, LogicalType, Mode, Spec, WarningCode};
use tabspec_sql::{BuildOptions, Dialect, SqlConverter, SqlLoader};
use tabspec_text::from_yaml_str;

const ORDERS_YAML: &str = r#"
name: warehouse.orders
columns:
  - name: id
    type: bigint
    constraints:
      not_null: true
      primary_key: true
  - name: customer_id
    type: int32
    constraints:
      foreign_key:
        references:
          table: customers
          columns: [id]
  - name: code
    type: string
    params: {length: 12}
  - name: total
    type: decimal
    params: {precision: 10, scale: 2}
  - name: ratio
    type: double
  - name: shipped
    type: boolean
    constraints:
      default: false
  - name: day
    type: date
  - name: note
    type: string
    constraints:
      default: none
"#;

const WIDE_YAML: &str = r#"
name: lake.db.events
external: true
columns:
  - name: id
    type: uint64
    constraints:
      not_null: true
      identity: {always: true, start: 1, increment: 1}
  - name: kind
    type: string
    params: {length: 20}
  - name: at
    type: timestamptz
  - name: seen
    type: timestamp_ntz
  - name: payload
    type: variant
  - name: tags
    type: array
    params: {size: 3}
    element:
      type: string
  - name: attrs
    type: map
    key:
      type: string
    value:
      type: uint8
  - name: place
    type: geography
    params: {srid: 4326}
  - name: address
    type: struct
    fields:
      - name: city
        type: string
      - name: geo
        type: geometry
        params: {srid: 4326}
storage:
  format: parquet
  location: s3://lake/events
  tbl_properties:
    owner: data-eng
partitioned_by:
  - column: at
    transform: date_trunc
    transform_args: [day]
"#;

const NESTED_YAML: &str = r#"
name: metrics
columns:
  - name: id
    type: int64
    constraints:
      not_null: true
  - name: period
    type: interval
    params: {interval_start: year, interval_end: month}
  - name: point
    type: struct
    fields:
      - name: x
        type: double
      - name: labels
        type: array
        element:
          type: string
  - name: counts
    type: map
    key:
      type: string
    value:
      type: int32
  - name: readings
    type: array
    element:
      type: int32
"#;

const GENERATED_YAML: &str = r#"
name: t
columns:
  - name: id
    type: bigint
  - name: id_text
    type: string
    generated_as:
      column: id
      transform: cast
      transform_args: [text]
"#;

fn converter(dialect: &str) -> SqlConverter {
    SqlConverter::new(
        Dialect::by_name(dialect).unwrap(),
        BuildOptions::default(),
        ConvertConfig::new(),
    )
}

#[test]
fn primary_key_ddl_is_stable() {
    let spec = from_yaml_str(
        r#"
name: t
columns:
  - name: id
    type: bigint
    constraints:
      not_null: true
      primary_key: true
"#,
    )
    .unwrap();

    for _ in 0..3 {
        let converted = converter("generic").convert(&spec).unwrap();
        assert_eq!(
            converted.target,
            "CREATE TABLE t (id BIGINT NOT NULL, CONSTRAINT pk_t PRIMARY KEY (id))"
        );
        assert!(converted.warnings.is_empty());
    }
}

#[test]
fn every_dialect_renders_the_wide_table() {
    let spec = from_yaml_str(WIDE_YAML).unwrap();
    for name in Dialect::names() {
        let converted = converter(name).convert(&spec).unwrap();
        assert!(
            converted.target.starts_with("CREATE "),
            "{name}: {}",
            converted.target
        );
        assert!(!converted.warnings.is_empty(), "{name} needed no rewrites");
    }
}

#[test]
fn generic_keeps_table_clauses() {
    let spec = from_yaml_str(WIDE_YAML).unwrap();
    let sql = converter("generic").convert(&spec).unwrap().target;

    assert!(sql.starts_with("CREATE EXTERNAL TABLE lake.db.events ("));
    assert!(sql.contains("id DECIMAL(20, 0) NOT NULL GENERATED ALWAYS AS IDENTITY (START WITH 1 INCREMENT BY 1)"));
    assert!(sql.contains("tags ARRAY<TEXT>"));
    assert!(sql.contains("place GEOGRAPHY(4326)"));
    assert!(sql.ends_with(
        "STORED AS PARQUET PARTITIONED BY (DATE_TRUNC('day', at)) LOCATION 's3://lake/events' \
         TBLPROPERTIES ('owner'='data-eng')"
    ));
}

#[test]
fn spark_spelling() {
    let spec = from_yaml_str(WIDE_YAML).unwrap();
    let converted = converter("spark").convert(&spec).unwrap();
    let sql = &converted.target;

    assert!(sql.contains("kind STRING"));
    assert!(sql.contains("at TIMESTAMP_LTZ"));
    assert!(sql.contains("seen TIMESTAMP_NTZ"));
    assert!(sql.contains("attrs MAP<STRING, SMALLINT>"));
    assert!(sql.contains("address STRUCT<city: STRING, geo: BINARY>"));
    assert!(sql.contains("USING parquet"));

    let kind = converted
        .warnings
        .iter()
        .find(|w| w.field_path == "kind")
        .unwrap();
    assert_eq!(kind.code, WarningCode::DialectLegalized);
    assert_eq!(kind.source_type, "VARCHAR(20)");
    assert_eq!(kind.resulting_type, "TEXT");
    assert_eq!(kind.reason, "spark does not support string length; replaced with TEXT");
}

#[test]
fn duckdb_drops_what_it_cannot_hold() {
    let spec = from_yaml_str(WIDE_YAML).unwrap();
    let converted = converter("duckdb").convert(&spec).unwrap();

    assert_eq!(
        converted.target,
        "CREATE TABLE lake.db.events (id UBIGINT NOT NULL, kind VARCHAR(20), at TIMESTAMPTZ, \
         seen TIMESTAMP, payload JSON, tags VARCHAR[3], attrs MAP(VARCHAR, UTINYINT), place BLOB, \
         address STRUCT(city VARCHAR, geo GEOMETRY))"
    );

    let dropped: Vec<&str> = converted
        .warnings
        .iter()
        .filter(|w| w.code == WarningCode::FeatureDropped)
        .map(|w| w.source_type.as_str())
        .collect();
    assert_eq!(
        dropped,
        vec!["IDENTITY", "EXTERNAL", "file format", "PARTITIONED BY", "LOCATION", "TBLPROPERTIES"]
    );
}

#[test]
fn postgres_collapses_nested_types() {
    let spec = from_yaml_str(WIDE_YAML).unwrap();
    let sql = converter("postgres").convert(&spec).unwrap().target;

    assert!(sql.contains("payload JSONB"));
    assert!(sql.contains("attrs JSONB"));
    assert!(sql.contains("address JSONB"));
    assert!(sql.contains("tags TEXT[3]"));
    assert!(sql.contains("place GEOGRAPHY,"));
}

#[test]
fn strict_mode_rejects_the_first_violation() {
    let spec = from_yaml_str(WIDE_YAML).unwrap();
    let strict = converter("spark").convert_with_mode(&spec, Mode::Strict);
    match strict {
        Err(Error::UnsupportedFeature {
            target,
            feature,
            field_path,
            ..
        }) => {
            assert_eq!(target, "spark");
            assert_eq!(feature, "string length");
            assert_eq!(field_path, "kind");
        }
        other => panic!("expected unsupported feature, got {other:?}"),
    }
}

#[test]
fn legalization_is_idempotent() {
    let spec = from_yaml_str(WIDE_YAML).unwrap();
    for name in Dialect::names() {
        let pipeline = converter(name);
        let once = pipeline.legalized(&spec, Mode::Coerce).unwrap().target;

        let mut twice = once.clone();
        let warnings = pipeline.dialect().legalize(&mut twice, Mode::Coerce).unwrap();
        assert!(warnings.is_empty(), "{name}: {warnings:?}");
        assert_eq!(twice, once);
    }
}

#[test]
fn pretty_layout() {
    let spec = from_yaml_str(ORDERS_YAML).unwrap();
    let sql = converter("generic")
        .with_pretty(true)
        .convert(&spec)
        .unwrap()
        .target;
    let lines: Vec<&str> = sql.lines().collect();
    assert_eq!(lines[0], "CREATE TABLE warehouse.orders (");
    assert_eq!(lines[1], "  id BIGINT NOT NULL,");
    assert_eq!(lines.last(), Some(&")"));
}

#[test]
fn ddl_round_trip() {
    let spec = from_yaml_str(ORDERS_YAML).unwrap();
    let sql = converter("generic").convert(&spec).unwrap().target;

    let config = LoadConfig::new().mode(Mode::Strict);
    let loaded = SqlLoader::new().load(&sql, &config).unwrap();
    assert!(loaded.warnings.is_empty());
    assert_eq!(loaded.spec, spec);
}

#[test]
fn loader_reads_dialect_spellings() {
    let loaded = SqlLoader::for_dialect("postgres")
        .unwrap()
        .load(
            "CREATE TABLE t (id INTEGER NOT NULL, tags TEXT[], ratio DOUBLE PRECISION, doc JSONB)",
            &LoadConfig::new(),
        )
        .unwrap();
    let expected: Spec = from_yaml_str(
        r#"
name: t
columns:
  - name: id
    type: int32
    constraints:
      not_null: true
  - name: tags
    type: array
    element:
      type: string
  - name: ratio
    type: double
  - name: doc
    type: json
"#,
    )
    .unwrap();
    assert_eq!(loaded.spec, expected);
}

#[test]
fn nested_and_interval_columns_round_trip_per_dialect() {
    let spec = from_yaml_str(NESTED_YAML).unwrap();
    let strict = LoadConfig::new().mode(Mode::Strict);

    for name in Dialect::names() {
        let sql = converter(name).convert(&spec).unwrap().target;
        let loaded = SqlLoader::for_dialect(name)
            .unwrap()
            .load(&sql, &strict)
            .unwrap_or_else(|e| panic!("{name}: {e}\n{sql}"));
        assert!(loaded.warnings.is_empty(), "{name}: {:?}", loaded.warnings);

        // Lossy rewrites: duckdb has no interval fields, postgres stores nested values as JSONB
        let mut expected = spec.columns().to_vec();
        match *name {
            "duckdb" => {
                expected[1].data_type =
                    LogicalType::interval(IntervalUnit::Day, Some(IntervalUnit::Second)).unwrap();
            }
            "postgres" => {
                expected[2].data_type = LogicalType::Json;
                expected[3].data_type = LogicalType::Json;
            }
            _ => {}
        }
        assert_eq!(loaded.spec.name(), "metrics");
        assert_eq!(loaded.spec.columns(), expected.as_slice(), "{name}: {sql}");
    }
}

#[test]
fn postgres_generated_columns_are_stored() {
    let spec = from_yaml_str(GENERATED_YAML).unwrap();
    let strict = LoadConfig::new().mode(Mode::Strict);

    let generic = converter("generic").convert(&spec).unwrap().target;
    assert_eq!(
        generic,
        "CREATE TABLE t (id BIGINT, id_text TEXT GENERATED ALWAYS AS (CAST(id AS TEXT)))"
    );

    let postgres = converter("postgres").convert(&spec).unwrap().target;
    assert_eq!(
        postgres,
        "CREATE TABLE t (id BIGINT, id_text TEXT GENERATED ALWAYS AS (CAST(id AS TEXT)) STORED)"
    );
    let loaded = SqlLoader::for_dialect("postgres")
        .unwrap()
        .load(&postgres, &strict)
        .unwrap();
    assert_eq!(loaded.spec, spec);
}
