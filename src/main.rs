use clap::{Parser, Subcommand};
use color_eyre::{eyre::eyre, Result};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use recruitdir::cache::{KeyValueStore, SqliteStore};
use recruitdir::config::Config;
use recruitdir::remote::{HttpRemoteStore, RemoteStore};
use recruitdir::{
  Audience, Coordinator, ListFilter, ListingFeed, NewRecord, Origin, Record, RecordKind,
  RecordPatch, Source, SyncContext, Vote,
};

#[derive(Parser, Debug)]
#[command(name = "recruitdir")]
#[command(about = "Recruiter and AI-tool directory that keeps working offline")]
#[command(version)]
struct Args {
  /// Path to config file (default: $XDG_CONFIG_HOME/recruitdir/config.yaml)
  #[arg(short, long)]
  config: Option<PathBuf>,

  /// Skip the remote store and work from the local cache
  #[arg(long)]
  offline: bool,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
  /// List directory entries
  List {
    #[arg(long)]
    category: Option<String>,
    #[arg(long)]
    kind: Option<RecordKind>,
    /// Include hidden, pending and rejected entries
    #[arg(long)]
    admin: bool,
  },
  /// Show one entry by id or slug
  Show { key: String },
  /// Add a live entry
  Add(ListingArgs),
  /// Submit an entry for review
  Submit(ListingArgs),
  Approve { id: String },
  Reject { id: String },
  /// Change fields of an entry
  Edit(EditArgs),
  Hide { id: String },
  Unhide { id: String },
  Feature { id: String },
  Unfeature { id: String },
  /// Vote an entry up or down
  Vote { id: String, vote: Vote },
  Comment {
    id: String,
    #[arg(long)]
    author: String,
    #[arg(long)]
    body: String,
  },
  Remove { id: String },
  /// Keep syncing and print the listing whenever it changes
  Watch {
    #[arg(long)]
    admin: bool,
  },
}

#[derive(clap::Args, Debug)]
struct ListingArgs {
  name: String,
  #[arg(long, default_value = "recruiter")]
  kind: RecordKind,
  #[arg(long)]
  id: Option<String>,
  #[arg(long)]
  slug: Option<String>,
  #[arg(long)]
  title: Option<String>,
  #[arg(long)]
  company: Option<String>,
  #[arg(long)]
  description: Option<String>,
  /// Comma-separated tags
  #[arg(long, default_value = "")]
  category: String,
  #[arg(long)]
  location: Option<String>,
  #[arg(long)]
  website: Option<String>,
}

impl ListingArgs {
  fn into_new_record(self) -> NewRecord {
    let mut new = NewRecord::new(self.name, self.kind);
    new.id = self.id;
    new.slug = self.slug;
    new.title = self.title;
    new.company = self.company;
    new.description = self.description;
    new.category = self.category;
    new.location = self.location;
    new.website = self.website;
    new
  }
}

#[derive(clap::Args, Debug)]
struct EditArgs {
  id: String,
  #[arg(long)]
  name: Option<String>,
  #[arg(long)]
  title: Option<String>,
  #[arg(long)]
  company: Option<String>,
  #[arg(long)]
  description: Option<String>,
  #[arg(long)]
  category: Option<String>,
  #[arg(long)]
  location: Option<String>,
  #[arg(long)]
  website: Option<String>,
  #[arg(long)]
  rating: Option<f64>,
}

impl EditArgs {
  fn into_patch(self) -> (String, RecordPatch) {
    let patch = RecordPatch {
      name: self.name,
      title: self.title.map(Some),
      company: self.company.map(Some),
      description: self.description.map(Some),
      category: self.category,
      location: self.location.map(Some),
      website: self.website.map(Some),
      rating: self.rating,
      ..RecordPatch::default()
    };
    (self.id, patch)
  }
}

/// Log to stderr, and to a daily file under the data directory when one
/// exists. The returned guard flushes the file writer on drop.
fn init_logging() -> Option<WorkerGuard> {
  let filter =
    EnvFilter::try_from_env("RECRUITDIR_LOG").unwrap_or_else(|_| EnvFilter::new("info"));

  let file = dirs::data_dir().map(|dir| {
    let logs = dir.join("recruitdir").join("logs");
    tracing_appender::non_blocking(tracing_appender::rolling::daily(logs, "recruitdir.log"))
  });
  let (file_layer, guard) = match file {
    Some((writer, guard)) => (
      Some(fmt::layer().with_ansi(false).with_writer(writer)),
      Some(guard),
    ),
    None => (None, None),
  };

  tracing_subscriber::registry()
    .with(filter)
    .with(fmt::layer().with_writer(std::io::stderr))
    .with(file_layer)
    .init();

  guard
}

fn print_listing(records: &[Record], source: Source) {
  if records.is_empty() {
    println!("No entries.");
  }
  for record in records {
    let mut flags = Vec::new();
    if record.featured {
      flags.push("featured");
    }
    if record.hidden {
      flags.push("hidden");
    }
    if !record.is_public() && !record.hidden {
      flags.push(record.status.as_str());
    }
    let flags = if flags.is_empty() {
      String::new()
    } else {
      format!(" [{}]", flags.join(", "))
    };
    println!(
      "{:<16} {:<28} {:<10} {:>+4}{}",
      record.id,
      record.name,
      record.kind.as_str(),
      record.score(),
      flags
    );
  }
  if source.is_degraded() {
    println!("{}", source.note());
  }
}

fn print_record(record: &Record, source: Source) {
  println!("{} ({})", record.name, record.slug);
  println!("  id:        {}", record.id);
  println!("  kind:      {}", record.kind.as_str());
  println!("  status:    {}", record.status.as_str());
  for (label, value) in [
    ("title", &record.title),
    ("company", &record.company),
    ("location", &record.location),
    ("website", &record.website),
  ] {
    if let Some(value) = value {
      println!("  {:<10} {}", format!("{}:", label), value);
    }
  }
  if !record.category.is_empty() {
    println!("  category:  {}", record.category);
  }
  if let Some(availability) = &record.availability {
    let next = availability.next_available.as_deref().unwrap_or("-");
    println!(
      "  available: {} (next: {})",
      if availability.accepting { "yes" } else { "no" },
      next
    );
  }
  println!(
    "  rating:    {:.1} ({} reviews), votes +{} / -{}",
    record.rating, record.review_count, record.upvotes, record.downvotes
  );
  if let Some(description) = &record.description {
    println!();
    println!("{}", description);
  }
  for comment in &record.comments {
    println!(
      "  - {} ({}): {}",
      comment.author,
      comment.created_at.format("%Y-%m-%d"),
      comment.body
    );
  }
  if source.is_degraded() {
    println!("{}", source.note());
  }
}

#[tokio::main]
async fn main() -> Result<()> {
  color_eyre::install()?;
  let _log_guard = init_logging();

  let args = Args::parse();

  // Load configuration
  let config = Config::load(args.config.as_deref())?;

  // Shared storage for every session on this machine
  let store: Arc<dyn KeyValueStore> = match &config.cache.path {
    Some(path) => Arc::new(SqliteStore::open_at(path)?),
    None => Arc::new(SqliteStore::open()?),
  };
  let origin = Origin::new(store);

  let remote: Option<Arc<dyn RemoteStore>> = if args.offline {
    None
  } else {
    let api_key = Config::get_api_key();
    HttpRemoteStore::from_config(&config.remote, api_key.as_deref())
      .map(|store| Arc::new(store) as Arc<dyn RemoteStore>)
  };

  let ctx = SyncContext::new(origin, remote, config.cache.key.clone());
  let coordinator = Arc::new(Coordinator::new(ctx.clone(), config.sync.poll_interval()));

  match args.command {
    Command::List {
      category,
      kind,
      admin,
    } => {
      let mut filter = if admin {
        ListFilter::admin()
      } else {
        ListFilter::default()
      };
      filter.category = category;
      filter.kind = kind;
      let listed = ctx.client().list(&filter).await;
      print_listing(&listed.data, listed.source);
    }
    Command::Show { key } => {
      let found = match ctx.client().get_by_id(&key).await {
        Ok(found) => found,
        Err(e) if e.is_not_found() => ctx.client().get_by_slug(&key).await?,
        Err(e) => return Err(e.into()),
      };
      print_record(&found.data, found.source);
    }
    Command::Add(listing) => {
      coordinator.start().await;
      let record = coordinator.create(listing.into_new_record()).await?;
      println!("Added {} ({})", record.id, record.slug);
    }
    Command::Submit(listing) => {
      coordinator.start().await;
      let record = coordinator.submit(listing.into_new_record()).await?;
      println!("Submitted {} for review", record.id);
    }
    Command::Approve { id } => {
      coordinator.start().await;
      coordinator.approve(&id).await?;
      println!("Approved {}", id);
    }
    Command::Reject { id } => {
      coordinator.start().await;
      coordinator.reject(&id).await?;
      println!("Rejected {}", id);
    }
    Command::Edit(edit) => {
      let (id, patch) = edit.into_patch();
      if patch.is_empty() {
        return Err(eyre!("Nothing to change for {}", id));
      }
      coordinator.start().await;
      let record = coordinator.update(&id, patch).await?;
      print_record(&record, ctx.working_set().source());
    }
    Command::Hide { id } => {
      coordinator.start().await;
      coordinator.set_hidden(&id, true).await?;
      println!("Hid {}", id);
    }
    Command::Unhide { id } => {
      coordinator.start().await;
      coordinator.set_hidden(&id, false).await?;
      println!("Unhid {}", id);
    }
    Command::Feature { id } => {
      coordinator.start().await;
      coordinator.set_featured(&id, true).await?;
      println!("Featured {}", id);
    }
    Command::Unfeature { id } => {
      coordinator.start().await;
      coordinator.set_featured(&id, false).await?;
      println!("Unfeatured {}", id);
    }
    Command::Vote { id, vote } => {
      coordinator.start().await;
      let record = coordinator.vote(&id, vote).await?;
      println!("{}: +{} / -{}", record.name, record.upvotes, record.downvotes);
    }
    Command::Comment { id, author, body } => {
      coordinator.start().await;
      let record = coordinator.comment(&id, &author, &body).await?;
      println!("{} now has {} comments", record.name, record.comments.len());
    }
    Command::Remove { id } => {
      coordinator.start().await;
      coordinator.remove(&id).await?;
      println!("Removed {}", id);
    }
    Command::Watch { admin } => {
      let audience = if admin { Audience::Admin } else { Audience::Public };
      let filter = ListFilter {
        audience,
        ..ListFilter::default()
      };

      coordinator.start().await;
      let mut feed = ListingFeed::new(&ctx, filter);
      let handle = Arc::clone(&coordinator).spawn();
      print_listing(feed.rendered(), feed.source());

      loop {
        let alive = tokio::select! {
          rendered = feed.next_render() => rendered.is_some(),
          _ = tokio::signal::ctrl_c() => false,
        };
        if !alive {
          break;
        }
        println!();
        print_listing(feed.rendered(), feed.source());
      }
      handle.abort();
    }
  }

  Ok(())
}
