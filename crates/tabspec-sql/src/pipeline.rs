//! Build → legalize → render

use tabspec_convert::{ConvertConfig, Converted, Converter};
use tabspec_core::{Mode, Result, Settings, Spec};

use crate::ast::CreateTable;
use crate::builder::{BuildOptions, SqlTarget};
use crate::dialect::Dialect;
use crate::render::render;

/// Converts specs into dialect-specific DDL
///
/// Warnings from every stage are returned together, builder warnings first.
#[derive(Debug)]
pub struct SqlConverter {
    converter: Converter<SqlTarget>,
    dialect: Dialect,
    pretty: bool,
}

impl SqlConverter {
    pub fn new(dialect: Dialect, options: BuildOptions, config: ConvertConfig<SqlTarget>) -> Self {
        Self {
            converter: Converter::new(SqlTarget::new(options), config),
            dialect,
            pretty: false,
        }
    }

    /// Converter for the dialect, mode and `[sql]` options in `settings`
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        Self::from_settings_with(settings, ConvertConfig::new())
    }

    /// Like [`SqlConverter::from_settings`], keeping the column selection
    /// and overrides of `config`; its mode is replaced by the configured one
    pub fn from_settings_with(settings: &Settings, config: ConvertConfig<SqlTarget>) -> Result<Self> {
        let dialect = Dialect::by_name(&settings.dialect)?;
        let options = BuildOptions {
            or_replace: settings.sql.or_replace,
            if_not_exists: settings.sql.if_not_exists,
            ignore_catalog: settings.sql.ignore_catalog,
            ignore_database: settings.sql.ignore_database,
        };
        let config = config.mode(settings.mode);
        Ok(Self::new(dialect, options, config).with_pretty(settings.sql.pretty))
    }

    pub fn with_pretty(mut self, pretty: bool) -> Self {
        self.pretty = pretty;
        self
    }

    pub fn dialect(&self) -> &Dialect {
        &self.dialect
    }

    pub fn convert(&self, spec: &Spec) -> Result<Converted<String>> {
        self.convert_with_mode(spec, self.converter.config().mode)
    }

    pub fn convert_with_mode(&self, spec: &Spec, mode: Mode) -> Result<Converted<String>> {
        let Converted { target, warnings } = self.legalized(spec, mode)?;
        let sql = render(&target, self.dialect.grammar(), self.pretty)?;
        Ok(Converted {
            target: sql,
            warnings,
        })
    }

    /// The tree after building and legalization, before rendering
    pub fn legalized(&self, spec: &Spec, mode: Mode) -> Result<Converted<CreateTable>> {
        let Converted {
            target: mut table,
            mut warnings,
        } = self.converter.convert_with_mode(spec, mode)?;

        tracing::debug!(
            "Legalizing {} for dialect {} ({} rules)",
            table.name,
            self.dialect.name(),
            self.dialect.rules().len()
        );
        warnings.extend(self.dialect.legalize(&mut table, mode)?);

        Ok(Converted {
            target: table,
            warnings,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tabspec_core::{Column, LogicalType, WarningCode};

    #[test]
    fn settings_drive_the_pipeline() {
        let settings: Settings = toml::from_str(
            r#"
mode = "coerce"
dialect = "duckdb"

[sql]
or_replace = true
"#,
        )
        .unwrap();
        let converter = SqlConverter::from_settings(&settings).unwrap();
        assert_eq!(converter.dialect().name(), "duckdb");

        let spec = Spec::builder("t")
            .column(Column::new("h", LogicalType::float(16).unwrap()))
            .column(Column::new("v", LogicalType::Variant))
            .build()
            .unwrap();
        let converted = converter.convert(&spec).unwrap();
        assert_eq!(converted.target, "CREATE OR REPLACE TABLE t (h FLOAT, v JSON)");

        let codes: Vec<WarningCode> = converted.warnings.iter().map(|w| w.code).collect();
        assert_eq!(codes, vec![WarningCode::TypeParameterCoerced, WarningCode::DialectLegalized]);
    }

    #[test]
    fn settings_keep_the_column_selection() {
        let settings = Settings {
            mode: Mode::Coerce,
            ..Settings::default()
        };
        let config = ConvertConfig::new().mode(Mode::Strict).ignore_columns(["h"]);
        let converter = SqlConverter::from_settings_with(&settings, config).unwrap();

        let spec = Spec::builder("t")
            .column(Column::new("id", LogicalType::int64()))
            .column(Column::new("h", LogicalType::float(16).unwrap()))
            .build()
            .unwrap();
        let converted = converter.convert(&spec).unwrap();
        assert_eq!(converted.target, "CREATE TABLE t (id BIGINT)");
        assert!(converted.warnings.is_empty());
    }

    #[test]
    fn unknown_dialect_in_settings() {
        let settings = Settings {
            dialect: "teradata".into(),
            ..Settings::default()
        };
        assert!(SqlConverter::from_settings(&settings).is_err());
    }
}
