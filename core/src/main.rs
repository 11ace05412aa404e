//! Column mapping walkthrough
//!
//! Creates one table with column mapping mode 'name' and one without,
//! then runs the same rename and drop against both and reads the rows
//! written before the changes back through the current schema.

use std::collections::BTreeMap;
use std::fs;

use anyhow::Context;
use colmap_core::{
    ColmapResult, ColumnDef, Config, DataFile, DataType, HistoryExport, MappingMode, PhysicalSlot,
    ReadInstruction, SchemaLog, Table, TableProperties,
};
use colored::Colorize;
use comfy_table::Table as Grid;
use tracing_subscriber::{filter::EnvFilter, fmt};

const SAMPLE_ROWS: [(&str, &str, &str); 3] = [
    ("1", "Alice", "Engineering"),
    ("2", "Bob", "Sales"),
    ("3", "Carol", "Marketing"),
];

/// Rows of one data file keyed by physical slot
struct MemoryFile {
    file: DataFile,
    rows: Vec<BTreeMap<PhysicalSlot, String>>,
}

fn main() -> anyhow::Result<()> {
    // Initialize logging
    fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = Config::load_from_path("colmap.toml").context("failed to load configuration")?;
    fs::create_dir_all(&config.log.dir)
        .with_context(|| format!("failed to create {}", config.log.dir.display()))?;

    println!("{}", "Column Mapping Walkthrough".bright_blue().bold());
    println!("  Schema logs: {}", config.log.dir.display().to_string().bright_cyan());
    println!(
        "  Default mapping mode: {}",
        config.table.default_mapping_mode.to_string().bright_cyan()
    );

    let with_cm = create_table(
        &config,
        "customer_with_cm",
        "first name",
        TableProperties::new().with_mapping_mode(MappingMode::Name),
    )?;
    let with_cm_file = write_rows(&with_cm, "first name", "part-00000.parquet")?;
    describe(&with_cm);

    step(
        "CREATE TABLE customer_without_cm AS SELECT id, `first name`, department",
        Table::create(
            "customer_without_cm",
            customer_columns("first name"),
            TableProperties::new().or_default_mode(config.table.default_mapping_mode),
        ),
    );

    let without_cm = create_table(
        &config,
        "customer_without_cm",
        "firstname",
        TableProperties::new().or_default_mode(config.table.default_mapping_mode),
    )?;
    let without_cm_file = write_rows(&without_cm, "firstname", "part-00000.parquet")?;
    describe(&without_cm);

    step(
        "ALTER TABLE customer_with_cm RENAME COLUMN `first name` TO full_name",
        with_cm.rename_column("first name", "full_name"),
    );
    step(
        "ALTER TABLE customer_without_cm RENAME COLUMN firstname TO full_name",
        without_cm.rename_column("firstname", "full_name"),
    );
    step(
        "ALTER TABLE customer_with_cm DROP COLUMN full_name",
        with_cm.drop_column("full_name"),
    );
    step(
        "ALTER TABLE customer_without_cm DROP COLUMN firstname",
        without_cm.drop_column("firstname"),
    );
    step(
        "ALTER TABLE customer_without_cm SET TBLPROPERTIES ('delta.columnMapping.mode' = 'name')",
        without_cm.set_mapping_mode(MappingMode::Name),
    );

    describe(&with_cm);
    select_all(&with_cm, &with_cm_file)?;
    select_all(&without_cm, &without_cm_file)?;

    for table in [&with_cm, &without_cm] {
        let path = config.log.dir.join(format!("{}.json", table.name()));
        HistoryExport::from_history(table.name(), table.history())
            .save(&path)
            .with_context(|| format!("failed to export {}", path.display()))?;
        println!("Exported history of {} to {}", table.name(), path.display());
    }

    Ok(())
}

fn customer_columns(name_column: &str) -> Vec<ColumnDef> {
    vec![
        ColumnDef::new("id", DataType::Integer),
        ColumnDef::new(name_column, DataType::String),
        ColumnDef::new("department", DataType::String),
    ]
}

fn create_table(config: &Config, name: &str, name_column: &str, properties: TableProperties) -> ColmapResult<Table> {
    let log = SchemaLog::create(config.log.table_log_path(name), config.log.sync_on_write)?;
    let log_path = log.path().to_path_buf();
    let table = Table::create_with_log(name, customer_columns(name_column), properties, log)?;
    println!(
        "\n{} {} (column mapping mode '{}', schema log {})",
        "CREATE TABLE".bright_green(),
        name,
        table.mapping_mode(),
        log_path.display()
    );
    Ok(table)
}

/// Place the sample rows into a file written under the latest version.
fn write_rows(table: &Table, name_column: &str, path: &str) -> ColmapResult<MemoryFile> {
    let id = table.resolve("id")?;
    let name = table.resolve(name_column)?;
    let department = table.resolve("department")?;

    let rows = SAMPLE_ROWS
        .iter()
        .map(|(i, n, d)| {
            BTreeMap::from([
                (id, i.to_string()),
                (name, n.to_string()),
                (department, d.to_string()),
            ])
        })
        .collect();

    Ok(MemoryFile {
        file: table.new_data_file(path),
        rows,
    })
}

fn step<T>(statement: &str, result: ColmapResult<T>) {
    println!("\n{}", statement.bold());
    match result {
        Ok(_) => println!("  {}", "SUCCESS".bright_green()),
        Err(e) => println!("  {} {} [{}]", "FAILED:".bright_red(), e, e.kind()),
    }
}

fn describe(table: &Table) {
    let latest = table.latest();
    let mut grid = Grid::new();
    grid.set_header(vec!["column", "type", "nullable", "id", "slot", "physical name"]);
    for column in &latest.columns {
        grid.add_row(vec![
            column.logical_name.clone(),
            column.data_type.to_string(),
            column.nullable.to_string(),
            column.id().to_string(),
            column.physical_slot.to_string(),
            column.physical_name(),
        ]);
    }

    println!(
        "\nDESCRIBE {} (version {})\n{}",
        table.name(),
        latest.version_number,
        grid
    );
    for (key, value) in table.properties().iter() {
        println!("  TBLPROPERTIES {} = '{}'", key, value);
    }
}

/// `SELECT *` over one file, resolved through the latest schema.
fn select_all(table: &Table, data: &MemoryFile) -> ColmapResult<()> {
    let latest = table.latest().version_number;
    let plan = table.plan_read(&data.file, latest)?;

    let mut grid = Grid::new();
    grid.set_header(plan.columns.iter().map(|(name, _)| name.clone()).collect::<Vec<_>>());
    for row in &data.rows {
        let values: Vec<String> = plan
            .columns
            .iter()
            .map(|(_, instruction)| match instruction {
                ReadInstruction::Read(slot) => row.get(slot).cloned().unwrap_or_else(|| "NULL".into()),
                ReadInstruction::NullFill { .. } | ReadInstruction::Ignore(_) => "NULL".into(),
            })
            .collect();
        grid.add_row(values);
    }

    println!(
        "\nSELECT * FROM {} ({} written at version {}, read at version {}, {} ignored slot(s))\n{}",
        table.name(),
        data.file.path,
        plan.file_version,
        plan.query_version,
        plan.ignored.len(),
        grid
    );
    Ok(())
}
