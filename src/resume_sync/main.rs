use clap::Parser;
use directories::ProjectDirs;
use resume_sync::api::SyncApi;
use resume_sync::config::SyncConfig;
use resume_sync::diff::diff_documents;
use resume_sync::document::DocumentStore;
use resume_sync::error::{Result, SyncError};
use resume_sync::model::ResumeDocument;
use resume_sync::remote::DirRemote;
use resume_sync::session::SessionCache;
use resume_sync::store::{doctor, FsBackend, StorageAdapter};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;
use tracing_subscriber::EnvFilter;

mod args;
mod cli;
use args::{Cli, Commands};
use cli::print;

const DATA_DIR_ENV: &str = "RESUME_SYNC_DATA";
const LOG_ENV: &str = "RESUME_SYNC_LOG";

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if let Err(e) = run(cli) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("resume_sync=debug")
    } else {
        EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("resume_sync=warn"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

type CliApi = SyncApi<FsBackend, FsBackend, DirRemote>;

struct AppContext {
    api: CliApi,
    config: SyncConfig,
    data_dir: PathBuf,
}

fn run(cli: Cli) -> Result<()> {
    let mut ctx = init_context(&cli)?;

    let result = match cli.command {
        Some(Commands::Show) | None => handle_show(&ctx),
        Some(Commands::Select { id }) => handle_select(&mut ctx, &id),
        Some(Commands::Restore) => handle_restore(&mut ctx),
        Some(Commands::Reset) => handle_reset(&mut ctx),
        Some(Commands::Save { id }) => handle_save(&mut ctx, &id),
        Some(Commands::Jobs { status, email }) => handle_jobs(&mut ctx, status, email),
        Some(Commands::Status { id, to, email }) => handle_status(&mut ctx, &id, &to, email),
        Some(Commands::Diff { before, after }) => handle_diff(&before, &after),
        Some(Commands::Doctor) => handle_doctor(&ctx),
        Some(Commands::Config { key, value }) => handle_config(&mut ctx, key, value),
    };

    // Debounced edits must land before the process goes away.
    ctx.api.flush();
    result
}

fn resolve_data_dir(cli: &Cli) -> Result<PathBuf> {
    if let Some(dir) = &cli.data_dir {
        return Ok(dir.clone());
    }
    if let Some(dir) = std::env::var_os(DATA_DIR_ENV) {
        return Ok(PathBuf::from(dir));
    }
    ProjectDirs::from("com", "resume-sync", "resume-sync")
        .map(|dirs| dirs.data_dir().to_path_buf())
        .ok_or_else(|| SyncError::Store("Could not determine data dir".into()))
}

fn init_context(cli: &Cli) -> Result<AppContext> {
    let data_dir = resolve_data_dir(cli)?;
    let config = SyncConfig::load(&data_dir).unwrap_or_else(|e| {
        warn!(error = %e, "unreadable config, using defaults");
        SyncConfig::default()
    });

    let durable = FsBackend::new(data_dir.join("store")).with_quota(config.quota_bytes);
    let session = FsBackend::new(data_dir.join("session")).with_quota(config.quota_bytes);
    let remote_dir = cli
        .remote_dir
        .clone()
        .unwrap_or_else(|| data_dir.join("remote"));

    let document = DocumentStore::open(StorageAdapter::from_config(durable, &config), &config);
    let cache = SessionCache::open(StorageAdapter::from_config(session, &config), &config);
    let api = SyncApi::new(document, cache, DirRemote::new(remote_dir));

    Ok(AppContext {
        api,
        config,
        data_dir,
    })
}

fn handle_show(ctx: &AppContext) -> Result<()> {
    print::print_document(ctx.api.document());
    Ok(())
}

fn handle_select(ctx: &mut AppContext, id: &str) -> Result<()> {
    let doc = ctx.api.select_resume_by_id(id)?;
    print::success(&format!("Selected {} ({})", id, doc.personal_info.name));
    Ok(())
}

fn handle_restore(ctx: &mut AppContext) -> Result<()> {
    if ctx.api.restore_selection() {
        print::success("Restored the last selected resume.");
    } else {
        print::info("No previous selection to restore.");
    }
    Ok(())
}

fn handle_reset(ctx: &mut AppContext) -> Result<()> {
    ctx.api.start_over();
    print::success("Started over with an empty resume.");
    Ok(())
}

fn handle_save(ctx: &mut AppContext, id: &str) -> Result<()> {
    ctx.api.save_active(id)?;
    print::success(&format!("Saved active resume as {}", id));
    Ok(())
}

fn resolve_email(ctx: &AppContext, email: Option<String>) -> Result<String> {
    email
        .or_else(|| ctx.api.session().meta().user_email.clone())
        .ok_or_else(|| SyncError::NotFound("No cached user, pass --email".into()))
}

fn handle_jobs(ctx: &mut AppContext, status: Option<String>, email: Option<String>) -> Result<()> {
    let email = resolve_email(ctx, email)?;
    ctx.api.jobs(&email)?;

    let cache = ctx.api.session();
    let records = match status.as_deref() {
        Some(status) => cache.by_status(status),
        None => cache.all().iter().collect(),
    };
    print::print_jobs(cache, &records);
    Ok(())
}

fn handle_status(ctx: &mut AppContext, id: &str, to: &str, email: Option<String>) -> Result<()> {
    let email = resolve_email(ctx, email)?;
    ctx.api.jobs(&email)?;
    ctx.api.change_status(id, to)?;
    print::success(&format!("{} is now {}", id, to));
    Ok(())
}

fn read_resume(path: &Path) -> Result<ResumeDocument> {
    let content = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}

fn handle_diff(before: &Path, after: &Path) -> Result<()> {
    let diff = diff_documents(&read_resume(before)?, &read_resume(after)?)?;
    print::print_diff(&diff);
    Ok(())
}

fn handle_doctor(ctx: &AppContext) -> Result<()> {
    let report = doctor(ctx.api.document().adapter())?;
    print::print_doctor("store", &report);
    let report = doctor(ctx.api.session().adapter())?;
    print::print_doctor("session", &report);
    Ok(())
}

fn handle_config(ctx: &mut AppContext, key: Option<String>, value: Option<String>) -> Result<()> {
    match (key, value) {
        (None, _) => print::print_config(&ctx.config),
        (Some(key), None) => match ctx.config.get(&key) {
            Some(value) => println!("{} = {}", key, value),
            None => println!("Unknown config key: {}", key),
        },
        (Some(key), Some(value)) => {
            ctx.config.set(&key, &value)?;
            ctx.config.save(&ctx.data_dir)?;
            print::success(&format!("{} = {}", key, value));
        }
    }
    Ok(())
}
