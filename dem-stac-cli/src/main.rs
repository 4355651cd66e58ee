use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use dem_stac::dataset::DatasetSpec;
use dem_stac::{AdditionalProperties, CatalogConfig, CatalogManager, DatasetDescriptor, DuplicatePolicy};
use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Catalog directory (overrides the config file)
    #[arg(short = 'd', long, value_name = "DIR", global = true)]
    catalog_dir: Option<PathBuf>,

    /// JSON file with catalog settings
    #[arg(short, long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    /// What to do when a collection id is already in the catalog
    #[arg(long, value_enum, global = true)]
    on_duplicate: Option<OnDuplicate>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create an empty root catalog
    Init {
        #[arg(long)]
        id: Option<String>,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        description: Option<String>,
    },
    /// Add one raster or VRT mosaic as a collection
    Add {
        #[arg(value_name = "PATH")]
        path: String,

        /// Data provider name, e.g. USGS
        #[arg(short, long)]
        provider: String,

        #[arg(long)]
        provider_url: Option<String>,

        /// Provider roles (default: producer, processor)
        #[arg(long = "provider-role")]
        provider_roles: Vec<String>,

        #[arg(long)]
        collection_id: Option<String>,

        #[arg(long)]
        title: Option<String>,

        #[arg(long)]
        description: Option<String>,

        /// Dataset type used as property prefix
        #[arg(long, default_value = "dem")]
        dataset_type: String,

        /// One item per source file instead of one item for the VRT
        #[arg(long)]
        per_file: bool,

        /// Extra item property, repeatable (value parsed as JSON when possible)
        #[arg(long = "property", value_name = "KEY=VALUE")]
        properties: Vec<String>,
    },
    /// Add every dataset listed in a JSON array
    AddBatch {
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },
    /// List the collections of the catalog
    List,
    /// Remove a collection and its items
    Remove {
        #[arg(value_name = "COLLECTION_ID")]
        collection_id: String,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum OnDuplicate {
    Replace,
    Append,
    Reject,
}

impl From<OnDuplicate> for DuplicatePolicy {
    fn from(value: OnDuplicate) -> Self {
        match value {
            OnDuplicate::Replace => DuplicatePolicy::Replace,
            OnDuplicate::Append => DuplicatePolicy::Append,
            OnDuplicate::Reject => DuplicatePolicy::Reject,
        }
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let start_time = std::time::Instant::now();

    let config = load_config(&args)?;

    match args.command {
        Command::Init {
            id,
            title,
            description,
        } => {
            let mut config = config;
            if let Some(id) = id {
                config.catalog_id = id;
            }
            if let Some(title) = title {
                config.title = title;
            }
            if let Some(description) = description {
                config.description = description;
            }
            let manager = CatalogManager::new(config);
            let catalog = manager.init().context("Failed to initialize catalog")?;
            info!("Catalog {} has {} links", catalog.id, catalog.links.len());
        }
        Command::Add {
            path,
            provider,
            provider_url,
            provider_roles,
            collection_id,
            title,
            description,
            dataset_type,
            per_file,
            properties,
        } => {
            let mut spec = DatasetDescriptor::builder(path, provider)
                .dataset_type(dataset_type)
                .use_composite_as_item(!per_file)
                .properties(parse_properties(&properties)?);
            spec.provider_url = provider_url;
            spec.collection_id = collection_id;
            spec.title = title;
            spec.description = description;
            if !provider_roles.is_empty() {
                spec = spec.provider_roles(provider_roles);
            }
            let descriptor = spec.build()?;

            let manager = CatalogManager::new(config);
            let processed = manager
                .add_dataset(&descriptor)
                .with_context(|| format!("Failed to add {}", descriptor.path()))?;
            info!(
                "Added collection {} with {} items",
                processed.collection.id,
                processed.items.len()
            );
        }
        Command::AddBatch { file } => {
            let reader = BufReader::new(
                File::open(&file).with_context(|| format!("Failed to open {:?}", file))?,
            );
            let specs: Vec<DatasetSpec> = serde_json::from_reader(reader)
                .with_context(|| format!("Failed to parse dataset list {:?}", file))?;
            let descriptors = specs
                .into_iter()
                .map(DatasetSpec::build)
                .collect::<dem_stac::Result<Vec<_>>>()?;

            let manager = CatalogManager::new(config);
            let report = manager.add_datasets(&descriptors);
            for (path, e) in &report.failed {
                error!("{}: {}", path, e);
            }
            if !report.is_success() {
                anyhow::bail!(
                    "{} of {} datasets failed",
                    report.failed.len(),
                    descriptors.len()
                );
            }
        }
        Command::List => {
            let manager = CatalogManager::new(config);
            for id in manager.collection_ids()? {
                let collection = manager.load_collection(&id)?;
                println!(
                    "{}\t{}\t{} items",
                    id,
                    collection.title.as_deref().unwrap_or(""),
                    collection.item_links().count()
                );
            }
        }
        Command::Remove { collection_id } => {
            let manager = CatalogManager::new(config);
            manager
                .remove_collection(&collection_id)
                .with_context(|| format!("Failed to remove {}", collection_id))?;
        }
    }

    let elapsed = start_time.elapsed();
    info!("Total processing time: {:?}", elapsed);

    Ok(())
}

fn load_config(args: &Args) -> Result<CatalogConfig> {
    let mut config = match &args.config {
        Some(path) => CatalogConfig::from_json_file(path)
            .with_context(|| format!("Failed to load config {:?}", path))?,
        None => CatalogConfig::default(),
    };
    if let Some(dir) = &args.catalog_dir {
        config.catalog_dir = dir.clone();
    }
    if let Some(policy) = args.on_duplicate {
        config.duplicate_policy = policy.into();
    }
    Ok(config)
}

fn parse_properties(pairs: &[String]) -> Result<AdditionalProperties> {
    pairs
        .iter()
        .map(|pair| {
            AdditionalProperties::parse_pair(pair)
                .with_context(|| format!("Expected KEY=VALUE, got `{}`", pair))
        })
        .collect()
}
