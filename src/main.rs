use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::io::Read;
use std::path::PathBuf;
use tracing_subscriber::{fmt, EnvFilter};
use wakawave_prompts::browser::{self, Confirmation, PresetBrowser};
use wakawave_prompts::editor::{NodeWidgets, PromptBinding};
use wakawave_prompts::transfer::{self, FileSource, ImportMode};
use wakawave_prompts::{parser, ConflictPolicy, Direction, PresetStore, StoreConfig, StoreError};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Directory holding the preset library
    #[arg(long, default_value = "./presets")]
    preset_dir: PathBuf,

    /// Storage key of the preset library
    #[arg(long, default_value = wakawave_prompts::storage::PRESETS_KEY)]
    key: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Parse prompt text (from a file or stdin) and print its bundle
    Parse {
        /// Read text from this file instead of stdin
        #[arg(long)]
        file: Option<PathBuf>,
        /// Print the normalized editor text instead of the bundle
        #[arg(long)]
        editor_text: bool,
    },
    /// List presets, optionally filtered by a search term
    List {
        #[arg(long)]
        search: Option<String>,
    },
    /// Show one preset by name or list position
    Show { choice: String },
    /// Save the given texts as a preset
    Save {
        name: String,
        #[arg(long, default_value = "")]
        positive: String,
        #[arg(long, default_value = "")]
        negative: String,
        /// Read the positive text from a file
        #[arg(long, conflicts_with = "positive")]
        positive_file: Option<PathBuf>,
        /// Read the negative text from a file
        #[arg(long, conflicts_with = "negative")]
        negative_file: Option<PathBuf>,
    },
    /// Load a preset into a node and print the resulting texts and bundles
    Load { choice: String },
    Rename { old: String, new: String },
    Duplicate { name: String },
    Delete {
        name: String,
        /// Confirm deletion; nothing is removed without it
        #[arg(long)]
        yes: bool,
    },
    /// Mark or unmark a preset as favorite
    Favorite {
        name: String,
        #[arg(long)]
        off: bool,
    },
    /// Set a preset's description and tags
    Annotate {
        name: String,
        #[arg(long)]
        description: Option<String>,
        /// Comma separated tags
        #[arg(long, value_delimiter = ',')]
        tags: Option<Vec<String>>,
    },
    /// Import presets from a JSON file
    Import {
        file: PathBuf,
        /// Replace the whole library instead of merging
        #[arg(long)]
        replace: bool,
        /// Keep local presets when names clash (default overwrites)
        #[arg(long, conflicts_with = "replace")]
        skip_existing: bool,
    },
    /// Export one preset, or the whole library, to a JSON file
    Export {
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        out: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Use `RUST_LOG=info` (or debug, trace, etc.) to control log level
    // Example: RUST_LOG=wakawave_prompts=debug wakawave-prompts list
    fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Cli::parse();
    tracing::debug!(args = ?args, "Starting Wakawave prompt tool");

    // Parsing needs no preset library.
    if let Command::Parse { file, editor_text } = &args.command {
        return parse_text(file.as_ref(), *editor_text);
    }

    let config = StoreConfig::new(args.preset_dir, args.key);
    let mut store = config.open_store();
    run(&mut store, args.command).await.or_else(report_unsaved)
}

async fn run(store: &mut PresetStore, command: Command) -> Result<()> {
    match command {
        Command::Parse { file, editor_text } => parse_text(file.as_ref(), editor_text)?,
        Command::List { search } => {
            let mut view = PresetBrowser::open();
            if let Some(term) = search {
                view.set_search(&term);
            }
            let items = view.list_items(store.presets());
            println!("{}", browser::count_label(items.len()));
            if items.is_empty() {
                println!("{}", view.empty_message());
            }
            for (i, item) in items.iter().enumerate() {
                println!(
                    "{:>3}. {}{}  [{}] {}x  {}",
                    i + 1,
                    item.name,
                    if item.favorite { " ★" } else { "" },
                    item.created,
                    item.usage_count,
                    item.preview.as_deref().unwrap_or("(empty)"),
                );
            }
        }
        Command::Show { choice } => {
            let name = resolve(store, &choice)?;
            let mut view = PresetBrowser::open();
            view.select(store.presets(), &name);
            let preview = view.preview(store.presets()).context("Preset not found!")?;
            println!("{}", preview.name);
            if !preview.description.is_empty() {
                println!("{}", preview.description);
            }
            if !preview.tags.is_empty() {
                println!("Tags: {}", preview.tags.join(", "));
            }
            println!("Positive Prompts:\n{}", or_none(&preview.positive));
            println!("Negative Prompts:\n{}", or_none(&preview.negative));
            println!("Created: {}", preview.created);
            println!("Modified: {}", preview.modified);
            println!("{}", preview.usage);
        }
        Command::Save {
            name,
            positive,
            negative,
            positive_file,
            negative_file,
        } => {
            let positive = match positive_file {
                Some(path) => read_input(Some(&path))?,
                None => positive,
            };
            let negative = match negative_file {
                Some(path) => read_input(Some(&path))?,
                None => negative,
            };
            store.put(&name, &positive, &negative)?;
            println!("Preset \"{}\" saved!", name);
        }
        Command::Load { choice } => {
            let name = resolve(store, &choice)?;
            let mut view = PresetBrowser::open();
            view.select(store.presets(), &name);
            let mut binding = PromptBinding::new(NodeWidgets::default());
            view.load_selected(store, &mut binding)?;
            let widgets = binding.into_surface();
            println!("Preset \"{}\" loaded!", name);
            for direction in Direction::ALL {
                let text = match direction {
                    Direction::Positive => &widgets.positive_prompts,
                    Direction::Negative => &widgets.negative_prompts,
                };
                println!("{}:\n{}", direction.text_slot(), text);
                println!("{}: {}", direction.bundle_slot(), widgets.bundle(direction));
            }
        }
        Command::Rename { old, new } => {
            let mut view = PresetBrowser::open();
            if !view.select(store.presets(), &old) {
                bail!("Preset not found!");
            }
            if let Err(e) = view.rename_selected(store, Some(new.as_str())) {
                if e.is_unsaved_change() {
                    return Err(e.into());
                }
                bail!(e.user_message());
            }
            println!("Renamed \"{}\" to \"{}\"", old, new);
        }
        Command::Duplicate { name } => {
            let copy = store.duplicate(&name).map_err(user_error)?;
            println!("Duplicated \"{}\" as \"{}\"", name, copy);
        }
        Command::Delete { name, yes } => {
            let mut view = PresetBrowser::open();
            if !view.select(store.presets(), &name) {
                println!("Preset \"{}\" does not exist; nothing to delete", name);
                return Ok(());
            }
            let answer = if yes { Confirmation::Confirmed } else { Confirmation::Cancelled };
            if view.delete_selected(store, answer)? {
                println!("Preset \"{}\" deleted!", name);
            } else {
                println!("Not deleted; pass --yes to confirm. This cannot be undone.");
            }
        }
        Command::Favorite { name, off } => {
            store.set_favorite(&name, !off).map_err(user_error)?;
            println!("{} \"{}\"", if off { "Unstarred" } else { "Starred" }, name);
        }
        Command::Annotate { name, description, tags } => {
            if let Some(description) = description {
                store.set_description(&name, &description).map_err(user_error)?;
            }
            if let Some(tags) = tags {
                let tags = tags.into_iter().map(|t| t.trim().to_string()).filter(|t| !t.is_empty()).collect();
                store.set_tags(&name, tags).map_err(user_error)?;
            }
        }
        Command::Import {
            file,
            replace,
            skip_existing,
        } => {
            let mode = if replace {
                ImportMode::ReplaceAll
            } else if skip_existing {
                ImportMode::Merge(ConflictPolicy::SkipExisting)
            } else {
                ImportMode::Merge(ConflictPolicy::Overwrite)
            };
            let count = transfer::import_into(store, &FileSource::new(&file), mode)
                .await
                .with_context(|| format!("Failed to import presets from {}", file.display()))?;
            println!("Imported {} preset{}", count, if count == 1 { "" } else { "s" });
        }
        Command::Export { name, out } => {
            let out = out.unwrap_or_else(|| PathBuf::from(transfer::export_file_name(name.as_deref())));
            match &name {
                Some(name) => transfer::export_one(store, name, &out).await?,
                None => transfer::export_all(store, &out).await?,
            }
            println!("Exported to {}", out.display());
        }
    }
    Ok(())
}

fn parse_text(file: Option<&PathBuf>, editor_text: bool) -> Result<()> {
    let text = read_input(file)?;
    let entries = parser::parse(&text);
    if editor_text {
        println!("{}", parser::to_editor_text(&entries));
    } else {
        println!("{}", parser::to_bundle(&entries));
    }
    Ok(())
}

fn resolve(store: &PresetStore, choice: &str) -> Result<String> {
    match browser::resolve_choice(store.presets(), choice) {
        Some(name) => Ok(name),
        None if store.is_empty() => bail!("No presets saved yet!"),
        None => bail!("Preset not found!"),
    }
}

fn read_input(file: Option<&PathBuf>) -> Result<String> {
    match file {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read text file: {}", path.display())),
        None => {
            let mut text = String::new();
            std::io::stdin()
                .read_to_string(&mut text)
                .context("Failed to read text from stdin")?;
            Ok(text)
        }
    }
}

fn or_none(text: &str) -> &str {
    if text.is_empty() {
        "(none)"
    } else {
        text
    }
}

fn user_error(e: StoreError) -> anyhow::Error {
    if e.is_unsaved_change() {
        e.into()
    } else {
        anyhow::anyhow!(e.user_message())
    }
}

/// Makes a failed library write loud: the command's change only exists in
/// this process and is lost on exit.
fn report_unsaved(e: anyhow::Error) -> Result<()> {
    if e.downcast_ref::<StoreError>().is_some_and(StoreError::is_unsaved_change) {
        eprintln!("WARNING: the preset library could not be written; this change was NOT saved.");
    }
    Err(e)
}
