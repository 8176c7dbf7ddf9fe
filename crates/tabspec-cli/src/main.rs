use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use std::path::{Path, PathBuf};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use arrow_schema::Schema;
use tabspec_convert::{
    ArrowTarget, ConvertConfig, Converted, Converter, LoadConfig, Loader, ModelTarget, Target,
    TargetKind,
};
use tabspec_core::{CoercionWarning, Mode, Settings, Spec};
use tabspec_sql::{SqlConverter, SqlLoader};

/// tabspec - one table spec, many schemas
#[derive(Parser)]
#[command(name = "tabspec")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to config file (default: tabspec.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check that a spec file is well formed
    Validate {
        /// Spec file (.yaml, .yml or .json)
        spec: PathBuf,
    },

    /// Convert a spec into a target schema
    Convert {
        /// Spec file (.yaml, .yml or .json)
        spec: PathBuf,

        /// Target schema
        #[arg(long, default_value = "sql")]
        to: TargetKind,

        /// SQL dialect (overrides the config file)
        #[arg(short, long)]
        dialect: Option<String>,

        /// strict or coerce (overrides the config file)
        #[arg(short, long)]
        mode: Option<Mode>,

        /// Convert only these columns
        #[arg(long, value_delimiter = ',')]
        include: Vec<String>,

        /// Convert every column except these
        #[arg(long, value_delimiter = ',')]
        ignore: Vec<String>,

        /// Multi-line DDL
        #[arg(long)]
        pretty: bool,

        /// Write the result here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Read a CREATE TABLE statement into a spec
    LoadDdl {
        /// File holding a single CREATE TABLE statement
        ddl: PathBuf,

        /// SQL dialect to parse with (overrides the config file)
        #[arg(short, long)]
        dialect: Option<String>,

        /// strict or coerce (overrides the config file)
        #[arg(short, long)]
        mode: Option<Mode>,

        /// Spec name (default: the table name in the statement)
        #[arg(long)]
        name: Option<String>,

        /// Output encoding
        #[arg(short, long, value_enum, default_value = "yaml")]
        format: OutputFormat,

        /// Write the spec here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Json,
    Yaml,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "tabspec=debug" } else { "tabspec=info" };
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)))
        .init();

    let settings = load_settings(cli.config.as_deref(), cli.verbose)?;

    match cli.command {
        Commands::Validate { spec } => validate_command(&spec),
        Commands::Convert {
            spec,
            to,
            dialect,
            mode,
            include,
            ignore,
            pretty,
            output,
        } => {
            let mut settings = settings;
            if let Some(dialect) = dialect {
                settings.dialect = dialect;
            }
            if let Some(mode) = mode {
                settings.mode = mode;
            }
            settings.sql.pretty |= pretty;
            let columns = ColumnFilter { include, ignore };
            convert_command(&settings, &spec, to, &columns, output.as_deref())
        }
        Commands::LoadDdl {
            ddl,
            dialect,
            mode,
            name,
            format,
            output,
        } => {
            let dialect = dialect.unwrap_or_else(|| settings.dialect.clone());
            let mode = mode.unwrap_or(settings.mode);
            load_ddl_command(&ddl, &dialect, mode, name, format, output.as_deref())
        }
    }
}

/// Explicit `--config`, then `tabspec.toml` in the working directory, then defaults
fn load_settings(path: Option<&Path>, verbose: bool) -> Result<Settings> {
    if let Some(path) = path {
        return Settings::from_file(path)
            .with_context(|| format!("Failed to load config from {}", path.display()));
    }
    let default_path = Path::new("tabspec.toml");
    if default_path.exists() {
        return Settings::from_file(default_path).context("Failed to load tabspec.toml");
    }
    if verbose {
        eprintln!("{}", "No config file found, using defaults".yellow());
    }
    Ok(Settings::default())
}

fn load_spec(path: &Path) -> Result<Spec> {
    tabspec_text::from_path(path).with_context(|| format!("Invalid spec {}", path.display()))
}

fn validate_command(path: &Path) -> Result<()> {
    let spec = load_spec(path)?;
    let fingerprint = spec.fingerprint()?;
    println!(
        "{} {} v{} ({} columns, {} table constraints)",
        "✓".green(),
        spec.name().bold(),
        spec.version(),
        spec.columns().len(),
        spec.table_constraints().len()
    );
    println!("  {} {}", "fingerprint:".dimmed(), fingerprint);
    Ok(())
}

#[derive(Debug, Default)]
struct ColumnFilter {
    include: Vec<String>,
    ignore: Vec<String>,
}

impl ColumnFilter {
    fn apply<T: Target>(&self, mut config: ConvertConfig<T>) -> ConvertConfig<T> {
        if !self.include.is_empty() {
            config = config.include_columns(self.include.iter().cloned());
        }
        if !self.ignore.is_empty() {
            config = config.ignore_columns(self.ignore.iter().cloned());
        }
        config
    }
}

fn convert_command(
    settings: &Settings,
    path: &Path,
    to: TargetKind,
    columns: &ColumnFilter,
    output: Option<&Path>,
) -> Result<()> {
    to.require()?;
    let spec = load_spec(path)?;
    tracing::info!("Converting {} to {} (mode={})", spec.name(), to, settings.mode);

    let converted = match to {
        TargetKind::Sql => {
            let config = columns.apply(ConvertConfig::new());
            SqlConverter::from_settings_with(settings, config)?.convert(&spec)?
        }
        TargetKind::Columnar => {
            let target = ArrowTarget::new().with_large_types(settings.columnar.large_types);
            let config = columns.apply(ConvertConfig::new().mode(settings.mode));
            let Converted { target, warnings } = Converter::new(target, config).convert(&spec)?;
            Converted {
                target: describe_schema(&target),
                warnings,
            }
        }
        TargetKind::Model => {
            let mut target = ModelTarget::new();
            if let Some(name) = &settings.model.name {
                target = target.with_model_name(name.as_str());
            }
            let config = columns.apply(ConvertConfig::new().mode(settings.mode));
            let Converted { target, warnings } = Converter::new(target, config).convert(&spec)?;
            Converted {
                target: serde_json::to_string_pretty(&target.to_json_schema())?,
                warnings,
            }
        }
    };

    report_warnings(&converted.warnings);
    emit(&converted.target, output)
}

/// One line per field: `name: type [not null]`
fn describe_schema(schema: &Schema) -> String {
    schema
        .fields()
        .iter()
        .map(|field| {
            let nullability = if field.is_nullable() { "" } else { " not null" };
            format!("{}: {}{}", field.name(), field.data_type(), nullability)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn load_ddl_command(
    path: &Path,
    dialect: &str,
    mode: Mode,
    name: Option<String>,
    format: OutputFormat,
    output: Option<&Path>,
) -> Result<()> {
    let sql = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    let mut config = LoadConfig::new().mode(mode);
    if let Some(name) = name {
        config = config.name(name);
    }
    let loaded = SqlLoader::for_dialect(dialect)?
        .load(&sql, &config)
        .with_context(|| format!("Failed to load {}", path.display()))?;

    report_warnings(&loaded.warnings);
    let text = match format {
        OutputFormat::Json => tabspec_text::to_json_string(&loaded.spec)?,
        OutputFormat::Yaml => tabspec_text::to_yaml_string(&loaded.spec)?,
    };
    emit(&text, output)
}

fn report_warnings(warnings: &[CoercionWarning]) {
    if warnings.is_empty() {
        return;
    }
    eprintln!("{} {} coercion(s) applied", "⚠".yellow(), warnings.len());
    for warning in warnings {
        eprintln!("    {}", warning.to_string().yellow());
    }
}

fn emit(text: &str, output: Option<&Path>) -> Result<()> {
    match output {
        Some(path) => {
            std::fs::write(path, format!("{}\n", text))
                .with_context(|| format!("Failed to write {}", path.display()))?;
            eprintln!("{} {}", "Written to:".green(), path.display());
        }
        None => println!("{}", text),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const SPEC: &str = r#"
name: t
columns:
  - name: id
    type: bigint
    constraints:
      not_null: true
      primary_key: true
  - name: note
    type: string
"#;

    #[test]
    fn parses_convert_flags() {
        let cli = Cli::try_parse_from([
            "tabspec", "convert", "t.yaml", "--to", "model", "--mode", "strict", "--include",
            "a,b",
        ])
        .unwrap();
        match cli.command {
            Commands::Convert {
                to, mode, include, ..
            } => {
                assert_eq!(to, TargetKind::Model);
                assert_eq!(mode, Some(Mode::Strict));
                assert_eq!(include, vec!["a", "b"]);
            }
            _ => panic!("expected convert"),
        }
        assert!(Cli::try_parse_from(["tabspec", "convert", "t.yaml", "--to", "parquet"]).is_err());
    }

    #[test]
    fn converts_spec_file_to_ddl() {
        let dir = tempfile::tempdir().unwrap();
        let spec_path = dir.path().join("t.yaml");
        let out_path = dir.path().join("t.sql");
        std::fs::write(&spec_path, SPEC).unwrap();

        let columns = ColumnFilter {
            include: vec!["id".into()],
            ignore: Vec::new(),
        };
        convert_command(&Settings::default(), &spec_path, TargetKind::Sql, &columns, Some(&out_path))
            .unwrap();

        assert_eq!(
            std::fs::read_to_string(&out_path).unwrap(),
            "CREATE TABLE t (id BIGINT NOT NULL, CONSTRAINT pk_t PRIMARY KEY (id))\n"
        );
    }

    #[test]
    fn loads_ddl_file_to_yaml() {
        let dir = tempfile::tempdir().unwrap();
        let ddl_path = dir.path().join("t.sql");
        let out_path = dir.path().join("t.yaml");
        std::fs::write(&ddl_path, "CREATE TABLE t (id BIGINT NOT NULL, note TEXT)").unwrap();

        load_ddl_command(&ddl_path, "generic", Mode::Strict, None, OutputFormat::Yaml, Some(&out_path))
            .unwrap();

        let spec = tabspec_text::from_path(&out_path).unwrap();
        assert_eq!(spec.name(), "t");
        assert_eq!(spec.column_names(), vec!["id", "note"]);
    }

    #[test]
    fn missing_config_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("absent.toml");
        assert!(load_settings(Some(&missing), false).is_err());
    }
}
