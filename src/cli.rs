use clap::{Parser, Subcommand};
use nu_plugin_sectors::algo::payload::{make_property_updates, PropertySettings};
use nu_plugin_sectors::algo::subcategory::{resolve_rules, SubcategoryRules};
use nu_plugin_sectors::algo::stages::parse_date;
use nu_plugin_sectors::algo::table::Table;
use nu_plugin_sectors::algo::taxonomy::{resolve_taxonomy, TaxonomyKind};
use nu_plugin_sectors::crm::rate_limit::{RateLimiter, DEFAULT_BATCH_SIZE};
use nu_plugin_sectors::crm::{CrmWriter, JsonLinesWriter, ObjectKind};
use nu_plugin_sectors::pipeline::{attach_ids, ClassifyConfig, RollupConfig, StageConfig};
use nu_plugin_sectors::{ops, Error, Result};
use serde_json::Value;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Parser)]
#[command(
    name = "sectors",
    version,
    about = "Industry and tag taxonomy normalization for CRM imports"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Split a delimited field into one normalized token per row
    Explode {
        /// CSV file to read (default: JSON rows on stdin)
        #[arg(short, long)]
        input: Option<PathBuf>,
        #[arg(short, long, default_value = "industries")]
        field: String,
        #[arg(long, default_value = "id")]
        id: String,
        /// Regex between phrases; surrounding whitespace is absorbed
        #[arg(short, long, default_value = ",")]
        delimiter: String,
    },
    /// Map free text onto the taxonomy, one row per entity
    Classify {
        #[arg(short, long)]
        input: Option<PathBuf>,
        /// Taxonomy: industries or tags
        #[arg(short, long, default_value = "industries")]
        kind: String,
        /// Field to classify (default: same as --kind)
        #[arg(short, long)]
        field: Option<String>,
        #[arg(long, default_value = "id")]
        id: String,
        #[arg(short, long, default_value = ",")]
        delimiter: String,
        /// Taxonomy JSON file
        #[arg(short, long)]
        taxonomy: Option<String>,
        /// Subcategory rules JSON file
        #[arg(short, long)]
        rules: Option<String>,
        /// Output column (default: pf_inds or pf_tags)
        #[arg(short, long)]
        column: Option<String>,
        /// Column checked by the taxonomy's description rules
        #[arg(long)]
        description: Option<String>,
        /// Scalar columns carried onto each entity
        #[arg(long, value_delimiter = ',')]
        keep: Vec<String>,
        /// Keep subcategories next to their parents
        #[arg(long)]
        no_resolve: bool,
        /// Also emit entities that matched no category
        #[arg(short, long)]
        all: bool,
    },
    /// Classify sub-entities and roll them up through a link table
    Rollup {
        /// Sub-entity CSV (default: JSON rows on stdin)
        #[arg(short, long)]
        input: Option<PathBuf>,
        /// CSV linking rollup ids to sub-entity keys
        #[arg(short, long)]
        links: PathBuf,
        #[arg(short, long, default_value = "industries")]
        kind: String,
        #[arg(short, long)]
        field: Option<String>,
        #[arg(short, long, default_value = ",")]
        delimiter: String,
        /// Sub-entity column the links refer to
        #[arg(long, default_value = "href")]
        entity_key: String,
        /// Rollup id column in the link table
        #[arg(long, default_value = "id")]
        link_id: String,
        /// Sub-entity key column in the link table
        #[arg(long, default_value = "startup_href")]
        link_key: String,
        /// Column checked by the taxonomy's description rules
        /// (default: description, when present)
        #[arg(long)]
        description: Option<String>,
        #[arg(short, long)]
        taxonomy: Option<String>,
        #[arg(short, long)]
        rules: Option<String>,
    },
    /// Distinct funding stages per investor after a cutoff date
    Stages {
        #[arg(short, long)]
        input: Option<PathBuf>,
        #[arg(long, default_value = "id")]
        id: String,
        #[arg(short, long, default_value = "stage")]
        stage: String,
        #[arg(long, default_value = "date")]
        date: String,
        /// Only count rounds strictly after this date
        #[arg(long, default_value = "2019-12-31")]
        since: String,
        #[arg(short, long, default_value = "stage")]
        column: String,
    },
    /// Build CRM update payloads from one column
    Properties {
        #[arg(short, long)]
        input: Option<PathBuf>,
        #[arg(long, default_value = "id")]
        id: String,
        #[arg(short, long, default_value = "pf_inds")]
        column: String,
    },
    /// Distinct checkbox options for a multi-valued column
    Options {
        #[arg(short, long)]
        input: Option<PathBuf>,
        #[arg(short, long, default_value = "pf_inds")]
        column: String,
    },
    /// Write one column to the CRM in rate-limited batches
    Push {
        #[arg(short, long)]
        input: Option<PathBuf>,
        /// CRM object: company or contact
        #[arg(short, long, default_value = "company")]
        object: String,
        #[arg(long, default_value = "id")]
        id: String,
        #[arg(short, long, default_value = "pf_inds")]
        column: String,
        /// CRM export CSV to pull record ids from
        #[arg(long)]
        export: Option<PathBuf>,
        /// Join keys as input_column=export_column (repeatable)
        #[arg(long = "join")]
        join: Vec<String>,
        /// Record id column in the export
        #[arg(long, default_value = "id")]
        export_id: String,
        #[arg(long, default_value_t = DEFAULT_BATCH_SIZE)]
        batch_size: usize,
        /// Seconds to wait between batches
        #[arg(long, default_value_t = 10)]
        cooldown_secs: u64,
        /// Print the calls as JSON lines instead of sending them
        #[arg(long)]
        dry_run: bool,
        #[arg(long, env = "HUBSPOT_TOKEN", hide_env_values = true)]
        token: Option<String>,
    },
    /// Register a column's distinct values as checkbox options
    Register {
        #[arg(short, long)]
        input: Option<PathBuf>,
        #[arg(short, long, default_value = "company")]
        object: String,
        #[arg(short, long, default_value = "pf_inds")]
        column: String,
        /// Property label (default: column name)
        #[arg(long)]
        label: Option<String>,
        #[arg(long, default_value = "companyinformation")]
        group: String,
        /// Property data type
        #[arg(long, default_value = "enumeration")]
        data_type: String,
        /// Widget: checkbox, select, radio
        #[arg(long, default_value = "checkbox")]
        field_type: String,
        /// Display order of the property in its group
        #[arg(long, default_value_t = 1)]
        order: i64,
        /// Show the property on forms
        #[arg(long)]
        form_required: bool,
        /// Values can only be set through the API
        #[arg(long)]
        read_only: bool,
        /// Include in global search (on unless --not-searchable)
        #[arg(long)]
        not_searchable: bool,
        #[arg(long)]
        dry_run: bool,
        #[arg(long, env = "HUBSPOT_TOKEN", hide_env_values = true)]
        token: Option<String>,
    },
    /// Print the resolved taxonomy (or rule table) as JSON
    Taxonomy {
        #[arg(short, long, default_value = "industries")]
        kind: String,
        #[arg(short, long)]
        taxonomy: Option<String>,
        /// Print the subcategory rules instead
        #[arg(long)]
        rules: bool,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    if let Err(e) = run(cli.command) {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

fn run(command: Commands) -> Result<()> {
    match command {
        Commands::Explode {
            input,
            field,
            id,
            delimiter,
        } => {
            let rows = read_rows(input.as_deref())?;
            print_json(&ops::op_explode(&rows, &id, &field, &delimiter)?)
        }
        Commands::Classify {
            input,
            kind,
            field,
            id,
            delimiter,
            taxonomy,
            rules,
            column,
            description,
            keep,
            no_resolve,
            all,
        } => {
            let kind = parse_kind(&kind)?;
            let mut config = ClassifyConfig::for_kind(kind);
            config.field = field.unwrap_or_else(|| kind.name().into());
            config.id_column = id;
            config.delimiter = delimiter;
            if let Some(column) = column {
                config.output_column = column;
            }
            config.description_column = description;
            config.carry_columns = keep;
            if no_resolve {
                config.resolve_subcategories = false;
            }

            let table = read_table(input.as_deref())?;
            let tax = resolve_taxonomy(kind, taxonomy.as_deref())?;
            let rules = load_rules_for(&config, rules.as_deref())?;
            print_json(&ops::op_classify_table(&table, &config, &tax, &rules, all)?)
        }
        Commands::Rollup {
            input,
            links,
            kind,
            field,
            delimiter,
            entity_key,
            link_id,
            link_key,
            description,
            taxonomy,
            rules,
        } => {
            let kind = parse_kind(&kind)?;
            let mut classify = ClassifyConfig::for_kind(kind);
            classify.field = field.unwrap_or_else(|| kind.name().into());
            classify.delimiter = delimiter;
            classify.description_column = description;
            let mut config = RollupConfig::for_kind(kind);
            config.entity_key = entity_key;
            config.link_id_column = link_id;
            config.link_key_column = link_key;

            let table = read_table(input.as_deref())?;
            let links = Table::from_csv_path(&links)?;
            let tax = resolve_taxonomy(kind, taxonomy.as_deref())?;
            let rules = load_rules_for(&classify, rules.as_deref())?;
            print_json(&ops::op_rollup(&table, &links, &classify, &config, &tax, &rules)?)
        }
        Commands::Stages {
            input,
            id,
            stage,
            date,
            since,
            column,
        } => {
            let since = parse_date(&since)
                .ok_or_else(|| Error::InvalidInput(format!("unrecognized date '{since}'")))?;
            let config = StageConfig {
                id_column: id,
                stage_column: stage,
                date_column: date,
                output_column: column,
                since,
            };
            let rows = read_rows(input.as_deref())?;
            print_json(&ops::op_stages(&rows, &config)?)
        }
        Commands::Properties { input, id, column } => {
            let rows = read_rows(input.as_deref())?;
            print_json(&ops::op_properties(&rows, &id, &column)?)
        }
        Commands::Options { input, column } => {
            let rows = read_rows(input.as_deref())?;
            print_json(&ops::op_options(&rows, &column)?)
        }
        Commands::Push {
            input,
            object,
            id,
            column,
            export,
            join,
            export_id,
            batch_size,
            cooldown_secs,
            dry_run,
            token,
        } => {
            let kind = parse_object(&object)?;
            let limiter = RateLimiter::new(batch_size, Duration::from_secs(cooldown_secs))?;
            let mut table = read_table(input.as_deref())?;
            let mut id_column = id;

            if let Some(export) = export {
                let pairs = parse_join(&join)?;
                let left: Vec<&str> = pairs.iter().map(|(l, _)| l.as_str()).collect();
                let right: Vec<&str> = pairs.iter().map(|(_, r)| r.as_str()).collect();
                let export = Table::from_csv_path(&export)?;
                let attached = attach_ids(&table, &export, &left, &right, &export_id)?;
                table = attached.table;
                id_column = attached.id_column;
            }

            let updates = make_property_updates(&table, &id_column, &column)?;
            let mut writer = crm_writer(token, dry_run)?;
            let report = limiter.dispatch(writer.as_mut(), kind, &updates)?;
            tracing::info!(
                batches = report.batches,
                items = report.items,
                sleeps = report.sleeps,
                "push complete"
            );
            Ok(())
        }
        Commands::Register {
            input,
            object,
            column,
            label,
            group,
            data_type,
            field_type,
            order,
            form_required,
            read_only,
            not_searchable,
            dry_run,
            token,
        } => {
            let kind = parse_object(&object)?;
            let rows = read_rows(input.as_deref())?;
            let label = label.unwrap_or_else(|| column.clone());
            let settings = PropertySettings {
                data_type,
                field_type,
                group_name: group,
                display_order: order,
                form_required,
                read_only,
                searchable: !not_searchable,
            };
            let definition = ops::op_definition(&rows, &column, &label, &settings)?;
            let mut writer = crm_writer(token, dry_run)?;
            writer.register_property_options(kind, &definition)?;
            tracing::info!(
                property = %definition.name,
                options = definition.options.len(),
                "registered property options"
            );
            Ok(())
        }
        Commands::Taxonomy {
            kind,
            taxonomy,
            rules,
        } => {
            if rules {
                let rules = resolve_rules(taxonomy.as_deref())?;
                return print_json(&serde_json::to_value(rules)?);
            }
            let kind = parse_kind(&kind)?;
            let tax = resolve_taxonomy(kind, taxonomy.as_deref())?;
            print_json(&serde_json::to_value(tax)?)
        }
    }
}

fn parse_kind(s: &str) -> Result<TaxonomyKind> {
    TaxonomyKind::from_str(s)
        .ok_or_else(|| Error::InvalidInput(format!("unknown kind '{s}', use industries or tags")))
}

fn parse_object(s: &str) -> Result<ObjectKind> {
    ObjectKind::from_str(s)
        .ok_or_else(|| Error::InvalidInput(format!("unknown object '{s}', use company or contact")))
}

fn parse_join(pairs: &[String]) -> Result<Vec<(String, String)>> {
    if pairs.is_empty() {
        return Err(Error::InvalidInput(
            "--export needs at least one --join input_column=export_column".into(),
        ));
    }
    pairs
        .iter()
        .map(|p| {
            p.split_once('=')
                .map(|(l, r)| (l.trim().to_string(), r.trim().to_string()))
                .ok_or_else(|| Error::InvalidInput(format!("bad join '{p}', expected left=right")))
        })
        .collect()
}

fn load_rules_for(config: &ClassifyConfig, path: Option<&str>) -> Result<SubcategoryRules> {
    if config.resolve_subcategories {
        resolve_rules(path)
    } else {
        Ok(SubcategoryRules::default())
    }
}

fn crm_writer(token: Option<String>, dry_run: bool) -> Result<Box<dyn CrmWriter>> {
    if dry_run {
        return Ok(Box::new(JsonLinesWriter::new(io::stdout())));
    }
    let token = token.ok_or_else(|| {
        Error::InvalidInput("HUBSPOT_TOKEN is not set; pass --token or --dry-run".into())
    })?;
    hubspot_writer(token)
}

#[cfg(feature = "crm")]
fn hubspot_writer(token: String) -> Result<Box<dyn CrmWriter>> {
    Ok(Box::new(
        nu_plugin_sectors::crm::hubspot::HubSpotClient::new(token)?,
    ))
}

#[cfg(not(feature = "crm"))]
fn hubspot_writer(_token: String) -> Result<Box<dyn CrmWriter>> {
    Err(Error::InvalidInput(
        "built without the crm feature; use --dry-run".into(),
    ))
}

/// CSV file when given, else JSON rows on stdin.
fn read_table(input: Option<&Path>) -> Result<Table> {
    match input {
        Some(path) => Table::from_csv_path(path),
        None => Ok(Table::from_json_rows(&read_stdin_json()?)),
    }
}

fn read_rows(input: Option<&Path>) -> Result<Vec<Value>> {
    match input {
        Some(path) => Ok(Table::from_csv_path(path)?.to_json_rows()),
        None => read_stdin_json(),
    }
}

fn read_stdin_json() -> Result<Vec<Value>> {
    let mut buf = String::new();
    io::stdin().read_to_string(&mut buf)?;
    if buf.trim().is_empty() {
        return Ok(vec![]);
    }
    let parsed: Value = serde_json::from_str(&buf)?;
    Ok(match parsed {
        Value::Array(arr) => arr,
        single => vec![single],
    })
}

fn print_json(value: &Value) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
