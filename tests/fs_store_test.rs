use resume_sync::api::SyncApi;
use resume_sync::config::SyncConfig;
use resume_sync::document::DocumentStore;
use resume_sync::model::{Experience, JobRecord, ResumeDocument};
use resume_sync::remote::{DirRemote, RemoteApi};
use resume_sync::session::SessionCache;
use resume_sync::store::{doctor, FsBackend, StorageAdapter, StorageBackend};
use std::fs;
use std::path::Path;
use tempfile::TempDir;

const EMAIL: &str = "jane@example.com";

fn open_document(dir: &Path) -> DocumentStore<FsBackend> {
    let config = SyncConfig::default();
    let backend = FsBackend::new(dir.join("store"));
    DocumentStore::open(StorageAdapter::from_config(backend, &config), &config)
}

fn open_session(dir: &Path, quota: Option<usize>) -> SessionCache<FsBackend> {
    let config = SyncConfig::default();
    let backend = FsBackend::new(dir.join("session")).with_quota(quota);
    SessionCache::open(StorageAdapter::from_config(backend, &config), &config)
}

fn open_api(dir: &Path) -> SyncApi<FsBackend, FsBackend, DirRemote> {
    SyncApi::new(
        open_document(dir),
        open_session(dir, None),
        DirRemote::new(dir.join("remote")),
    )
}

fn jane() -> ResumeDocument {
    let mut doc = ResumeDocument::with_name("Jane Doe");
    doc.experience.push(Experience {
        company: "Acme".into(),
        position: "Engineer".into(),
        ..Default::default()
    });
    doc
}

#[test]
fn test_selection_survives_reload() {
    let dir = TempDir::new().unwrap();
    {
        let mut store = open_document(dir.path());
        store.set_active_document(ResumeDocument::empty());
        store.select_resume(jane(), "r1");
    }

    let mut store = open_document(dir.path());
    assert!(store.load_selection());
    assert_eq!(store.active().personal_info.name, "Jane Doe");
    assert_eq!(store.active(), &jane());
}

#[test]
fn test_reset_then_reload_still_offers_selection() {
    let dir = TempDir::new().unwrap();
    {
        let mut store = open_document(dir.path());
        store.select_resume(jane(), "r1");
        store.reset();
    }

    let mut store = open_document(dir.path());
    assert!(store.active().is_empty());
    assert_eq!(store.last_selected().map(|(_, id)| id), Some("r1"));
    assert!(store.load_selection());
    assert_eq!(store.active(), &jane());
}

#[test]
fn test_no_temp_files_left_behind() {
    let dir = TempDir::new().unwrap();
    let mut store = open_document(dir.path());
    store.select_resume(jane(), "r1");
    store.update(|doc| doc.summary = "Edited".into());
    store.flush();

    let entries: Vec<String> = fs::read_dir(dir.path().join("store"))
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
        .collect();
    assert_eq!(entries, vec!["resume-store.json".to_string()]);
}

#[test]
fn test_full_job_list_is_truncated_under_quota() {
    let dir = TempDir::new().unwrap();
    let records: Vec<JobRecord> = (0..500)
        .map(|i| JobRecord::new(&format!("job-{:03}", i), "Backend Engineer", "Acme", "saved"))
        .collect();
    let one = serde_json::to_vec(&records[0]).unwrap().len();
    let quota = Some(one * 150);

    {
        let mut cache = open_session(dir.path(), quota);
        cache.set_all(records, EMAIL);
        assert_eq!(cache.all().len(), 500);
    }

    let cache = open_session(dir.path(), quota);
    assert_eq!(cache.all().len(), 100);
    assert_eq!(cache.all()[0].job_id, "job-000");
    assert_eq!(cache.meta().user_email.as_deref(), Some(EMAIL));
    assert!(cache.meta().last_fetched.is_some());
}

#[test]
fn test_status_change_reaches_remote_and_survives_reload() {
    let dir = TempDir::new().unwrap();
    let remote = DirRemote::new(dir.path().join("remote"));
    remote
        .put_jobs(
            EMAIL,
            &[
                JobRecord::new("j1", "Rust Dev", "Acme", "saved").with_server_id("s1"),
                JobRecord::new("j2", "Go Dev", "Globex", "applied").with_server_id("s2"),
            ],
        )
        .unwrap();

    {
        let mut api = open_api(dir.path());
        assert_eq!(api.jobs(EMAIL).unwrap().len(), 2);
        api.change_status("j1", "Applied - Follow-up").unwrap();
        assert!(api.session().pending("j1").is_none());
    }

    assert_eq!(
        remote.fetch_job("s1").unwrap().current_status,
        "Applied - Follow-up"
    );

    let mut api = open_api(dir.path());
    let applied = api.jobs_by_status(EMAIL, "Applied").unwrap();
    assert_eq!(applied.len(), 1);
    assert_eq!(applied[0].job_id, "j1");
}

#[test]
fn test_failed_status_change_reverts() {
    let dir = TempDir::new().unwrap();
    let remote = DirRemote::new(dir.path().join("remote"));
    remote
        .put_jobs(EMAIL, &[JobRecord::new("j1", "Rust Dev", "Acme", "saved").with_server_id("s1")])
        .unwrap();

    let mut api = open_api(dir.path());
    api.jobs(EMAIL).unwrap();

    // the server no longer knows the record
    remote.put_jobs(EMAIL, &[]).unwrap();

    assert!(api.change_status("j1", "applied").is_err());
    assert!(api.session().pending("j1").is_none());
    assert_eq!(api.session().by_status("saved").len(), 1);
}

#[test]
fn test_select_by_id_from_remote_dir() {
    let dir = TempDir::new().unwrap();
    let remote = DirRemote::new(dir.path().join("remote"));
    remote.save_resume("r1", &jane()).unwrap();

    {
        let mut api = open_api(dir.path());
        api.select_resume_by_id("r1").unwrap();
        assert!(api.select_resume_by_id("r2").is_err());
    }

    let mut api = open_api(dir.path());
    assert!(api.restore_selection());
    assert_eq!(api.document().active(), &jane());
}

#[test]
fn test_doctor_removes_corrupt_files() {
    let dir = TempDir::new().unwrap();
    let store_dir = dir.path().join("store");
    fs::create_dir_all(&store_dir).unwrap();
    fs::write(store_dir.join("resume-store.json"), "{\"resumeData\": ").unwrap();

    let store = open_document(dir.path());
    assert!(store.active().is_empty());

    let report = doctor(store.adapter()).unwrap();
    assert_eq!(report.checked, 1);
    assert_eq!(report.removed_corrupt, 1);
    assert!(store.adapter().backend().get("resume-store").unwrap().is_none());
}
