//! cdvault CLI
//!
//! Command-line interface for inspecting and editing a cdvault catalog.

use clap::{Parser, Subcommand};
use cdvault::{CatalogRecord, CatalogSearch, Config, Repository, Result, TrackRecord};
use tracing_subscriber::{fmt, EnvFilter};

/// cdvault CLI
#[derive(Parser, Debug)]
#[command(name = "cdvault-cli")]
#[command(about = "CLI for the cdvault CD catalog store")]
#[command(version)]
struct Args {
    /// Data directory holding the table files
    #[arg(short, long, default_value = ".")]
    data_dir: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Create the tables (or wipe them with --fresh)
    Init {
        /// Remove any existing tables first
        #[arg(long)]
        fresh: bool,
    },

    /// Add or replace a CD
    AddCd {
        catalog: String,
        #[arg(long, default_value = "")]
        title: String,
        #[arg(long = "type", default_value = "")]
        kind: String,
        #[arg(long, default_value = "")]
        artist: String,
    },

    /// Add or replace a track
    AddTrack {
        catalog: String,
        track_no: u32,
        #[arg(long, default_value = "")]
        text: String,
    },

    /// Show a CD
    Get { catalog: String },

    /// Show a track
    GetTrack { catalog: String, track_no: u32 },

    /// Delete a CD (tracks are kept unless --with-tracks)
    Del {
        catalog: String,
        /// Also delete tracks 1.. up to the first gap
        #[arg(long)]
        with_tracks: bool,
    },

    /// Delete a track
    DelTrack { catalog: String, track_no: u32 },

    /// List CDs whose catalog identifier contains a substring
    Search { needle: String },

    /// List a CD's tracks
    Tracks { catalog: String },

    /// Count CDs and tracks
    Count,
}

fn main() {
    // Initialize tracing/logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("warn,cdvault=info"));

    fmt().with_env_filter(filter).with_target(true).init();

    let args = Args::parse();

    if let Err(e) = run(args) {
        tracing::error!("{}", e);
        eprintln!("error: {}", e);
        std::process::exit(1);
    }
}

fn run(args: Args) -> Result<()> {
    let fresh = matches!(args.command, Commands::Init { fresh: true });
    let config = Config::builder().data_dir(&args.data_dir).build();
    let repo = Repository::open(config, fresh)?;

    match args.command {
        Commands::Init { .. } => {
            let counts = repo.try_count_entries()?;
            println!("{} CDs, {} tracks", counts.catalogs, counts.tracks);
        }
        Commands::AddCd {
            catalog,
            title,
            kind,
            artist,
        } => {
            repo.try_add_catalog_entry(&CatalogRecord::new(catalog, title, kind, artist))?;
        }
        Commands::AddTrack {
            catalog,
            track_no,
            text,
        } => {
            repo.try_add_track_entry(&TrackRecord::new(catalog, track_no, text))?;
        }
        Commands::Get { catalog } => match repo.try_get_catalog_entry(&catalog)? {
            Some(record) => print_catalog(&record),
            None => println!("{}: not found", catalog),
        },
        Commands::GetTrack { catalog, track_no } => {
            match repo.try_get_track_entry(&catalog, track_no)? {
                Some(track) => print_track(&track),
                None => println!("{} {}: not found", catalog, track_no),
            }
        }
        Commands::Del {
            catalog,
            with_tracks,
        } => {
            if with_tracks {
                let removed = repo.try_delete_tracks(&catalog)?;
                println!("Removed {} tracks", removed);
            }
            repo.try_delete_catalog_entry(&catalog)?;
        }
        Commands::DelTrack { catalog, track_no } => {
            repo.try_delete_track_entry(&catalog, track_no)?;
        }
        Commands::Search { needle } => {
            let mut search = CatalogSearch::new();
            let mut found = 0;
            while let Some(record) = repo.try_search_catalog(&needle, &mut search)? {
                print_catalog(&record);
                found += 1;
            }
            println!("{} matches", found);
        }
        Commands::Tracks { catalog } => {
            for track in repo.try_tracks(&catalog)? {
                print_track(&track);
            }
        }
        Commands::Count => {
            let counts = repo.try_count_entries()?;
            println!("{} CDs, {} tracks", counts.catalogs, counts.tracks);
        }
    }

    repo.close();
    Ok(())
}

fn print_catalog(record: &CatalogRecord) {
    println!(
        "{}\t{}\t{}\t{}",
        record.catalog, record.title, record.kind, record.artist
    );
}

fn print_track(track: &TrackRecord) {
    println!("{}\t{}\t{}", track.catalog, track.track_no, track.text);
}
