use anyhow::Context;
use log::{debug, error, info};

use xsd_validate::cli::{Cli, SchemaVersion};
use xsd_validate::discovery;
use xsd_validate::driver::{validate_all, RunConfig};
use xsd_validate::engine::Engine;
use xsd_validate::report::NamespaceMap;
use xsd_validate::resolver::Resolver;

fn main() {
    match run() {
        // Exit status is the total number of reported errors.
        Ok(total) => std::process::exit(total as i32),
        Err(failure) => {
            eprintln!("xsd-validate: {:#}", failure);
            std::process::exit(2);
        }
    }
}

fn run() -> anyhow::Result<usize> {
    let cli = Cli::parse_args().context("failed to expand arguments")?;

    env_logger::Builder::new()
        .filter_level(cli.level_filter())
        .init();

    let resolver = Resolver::new(cli.include.clone());

    // Explicit -L paths are absolutized up front; the engine resolves
    // schema locations with no useful base directory of its own.
    let mut locations = cli.locations();
    for path in locations.values_mut() {
        *path = std::path::absolute(path.as_path()).unwrap_or_else(|_| path.clone());
    }
    let mut schema_name = cli.schema.clone();
    let mut version = cli.version;

    // Parse the first file to determine the schema and add locations.
    if schema_name.is_none() {
        if let Some(path) = resolver.resolve(&cli.file[0]) {
            info!("parsing {} (first file)", path.display());
            let hints = discovery::sniff_document(&path)
                .with_context(|| format!("cannot sniff {}", path.display()))?;
            if let Some(schema) = hints.schema {
                info!("set schema to {}", schema);
                schema_name = Some(schema);
            }
            discovery::add_locations(&mut locations, &hints.locations, &resolver);
        }
    }

    // Parse the schema to determine its minimum version, its imports, and
    // the prefixes used for error rendering.
    let mut schema_path = None;
    let mut schema_hints = None;
    if let Some(name) = &schema_name {
        if let Some(path) = resolver.resolve(name) {
            info!("parsing {}", path.display());
            let hints = discovery::sniff_schema(&path)
                .with_context(|| format!("cannot sniff {}", path.display()))?;

            if version.is_none() {
                if let Some(min_version) = hints.min_version.as_deref() {
                    version = SchemaVersion::from_attr(min_version);
                    if let Some(v) = version {
                        info!("set schema version to {}", v);
                    }
                }
            }
            discovery::add_locations(&mut locations, &hints.imports, &resolver);

            schema_path = Some(std::path::absolute(&path).unwrap_or(path));
            schema_hints = Some(hints);
        }
    }

    let engine = Engine::new(version.unwrap_or(SchemaVersion::V10));

    // Load the schema once; it is shared read-only across all files. A load
    // failure is logged and validation proceeds without a schema.
    let mut schema = None;
    let mut namespaces = NamespaceMap::new();
    if let (Some(path), Some(hints)) = (&schema_path, &schema_hints) {
        info!("loading {}", path.display());
        match engine.compile(path, hints.target_namespace.as_deref(), &locations) {
            Ok(compiled) => {
                info!("loaded {}", path.display());
                schema = Some(compiled);
                namespaces = hints.prefixes.clone();
            }
            Err(failure) => error!("{}", failure),
        }
    }

    let config = RunConfig {
        terse: cli.terse,
        lazy: cli.lazy,
        defuse: cli.defuse,
    };
    let totals = validate_all(
        &cli.file,
        &resolver,
        &engine,
        schema.as_ref(),
        &namespaces,
        &config,
    );

    debug!("{} errors (ignored {})", totals.reported, totals.ignored);
    Ok(totals.reported)
}
