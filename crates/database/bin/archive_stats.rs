use anyhow::{Context, Result, bail};
use ra_database::{ArchiveConfig, ArchiveReader, DateRange};
use ra_types::{ArchiveRecord, StatusRecord};
use tracing::level_filters::LevelFilter;

const MAX_SAMPLE_ROWS: usize = 5; // rows echoed at the end for a quick eyeball

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(LevelFilter::INFO)
        .with_target(true)
        .with_line_number(true)
        .with_file(true)
        .compact()
        .init();

    // 1) Store location from ARCHIVE_* env (and .env)
    let cfg = ArchiveConfig::from_env().context("failed to load archive config")?;

    // 2) Optional date window: archive_stats [START END] as YYYYMMDD
    let args: Vec<String> = std::env::args().skip(1).collect();
    let dates = match args.as_slice() {
        [] => None,
        [start, end] => Some(DateRange::parse(start, end)?),
        _ => bail!("usage: archive_stats [START_YYYYMMDD END_YYYYMMDD]"),
    };

    let reader = ArchiveReader::open(&cfg.base_dir, &cfg.store_name, dates)
        .with_context(|| format!("failed to open store {}", cfg.store_dir().display()))?;

    println!("Store: {}", reader.store_dir().display());
    if reader.is_empty() {
        println!("No partitions matched.");
        return Ok(());
    }

    // 3) Partitions
    for p in reader.partitions() {
        println!("  {}  {} file(s)", p.date.format("%Y-%m-%d"), p.files.len());
    }

    // 4) Schema
    let schema = reader.schema()?;
    println!("Schema ({} columns):", schema.len());
    for (name, ty) in &schema.columns {
        println!("  {name}: {ty}");
    }

    // 5) Counts + duplicate audit on the identifier column
    let (total, distinct) = reader.counts()?;
    println!("Rows: total={total} distinct={distinct}");
    let id_col = std::env::var("ARCHIVE_ID_FIELD")
        .unwrap_or_else(|_| StatusRecord::SCHEMA.id_field.to_string());
    if schema.get(&id_col).is_some() {
        let dups = reader.duplicate_id_count(&id_col)?;
        println!("Audit: rows with a repeated {id_col}: {dups}");
        if let Some(newest) = reader.recent_ids(&id_col, 1, None)?.first() {
            println!("Newest {id_col}: {newest}");
        }
    } else {
        println!("Audit skipped: no column named {id_col}");
    }

    for row in reader.with_limit(MAX_SAMPLE_ROWS).rows()? {
        let cells: Vec<String> = row.iter().map(|v| v.to_string()).collect();
        println!("  | {}", cells.join(" | "));
    }
    Ok(())
}
