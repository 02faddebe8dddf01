//! Backend selection: API first, filesystem fallback, per-note locking

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Mutex;
use tempfile::TempDir;
use vaultlink_remote::VaultApi;
use vaultlink_tools::prelude::*;

/// In-memory API that can be switched off to simulate an outage
#[derive(Default)]
struct StubApi {
    down: AtomicBool,
    calls: AtomicU32,
    notes: Mutex<BTreeMap<String, String>>,
}

impl StubApi {
    fn unavailable() -> Self {
        let api = Self::default();
        api.down.store(true, Ordering::SeqCst);
        api
    }

    fn with_note(self, path: &str, content: &str) -> Self {
        self.notes
            .lock()
            .unwrap()
            .insert(path.to_string(), content.to_string());
        self
    }

    fn note(&self, path: &str) -> Option<String> {
        self.notes.lock().unwrap().get(path).cloned()
    }

    fn check(&self, operation: &str) -> Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.down.load(Ordering::SeqCst) {
            Err(Error::backend_unavailable(operation, "connection refused"))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl VaultApi for StubApi {
    async fn list_notes(&self) -> Result<Vec<String>> {
        self.check("list_notes")?;
        Ok(self.notes.lock().unwrap().keys().cloned().collect())
    }

    async fn read_note(&self, path: &NotePath) -> Result<String> {
        self.check("read_note")?;
        self.note(path.as_str())
            .ok_or_else(|| Error::backend_unavailable("read_note", "HTTP 404 Not Found"))
    }

    async fn create_note(&self, path: &NotePath, content: &str) -> Result<()> {
        self.check("create_note")?;
        self.notes
            .lock()
            .unwrap()
            .insert(path.to_string(), content.to_string());
        Ok(())
    }

    async fn update_note(&self, path: &NotePath, content: &str) -> Result<()> {
        self.check("update_note")?;
        self.notes
            .lock()
            .unwrap()
            .insert(path.to_string(), content.to_string());
        Ok(())
    }

    async fn delete_note(&self, path: &NotePath) -> Result<()> {
        self.check("delete_note")?;
        self.notes.lock().unwrap().remove(path.as_str());
        Ok(())
    }

    async fn move_note(&self, source: &NotePath, destination: &NotePath) -> Result<()> {
        self.check("move_note")?;
        let mut notes = self.notes.lock().unwrap();
        let content = notes
            .remove(source.as_str())
            .ok_or_else(|| Error::backend_unavailable("move_note", "HTTP 404 Not Found"))?;
        notes.insert(destination.to_string(), content);
        Ok(())
    }

    async fn search(&self, query: &str) -> Result<Vec<SearchHit>> {
        self.check("search_vault")?;
        Ok(self
            .notes
            .lock()
            .unwrap()
            .iter()
            .filter(|(_, content)| content.contains(query))
            .map(|(path, _)| SearchHit {
                path: path.clone(),
                score: 0.9,
                matches: Vec::new(),
            })
            .collect())
    }

    async fn create_folder(&self, _path: &NotePath) -> Result<()> {
        self.check("create_folder")
    }

    async fn rename_folder(&self, _source: &NotePath, _destination: &NotePath) -> Result<()> {
        self.check("rename_folder")
    }

    async fn delete_folder(&self, _path: &NotePath) -> Result<()> {
        self.check("delete_folder")
    }
}

fn setup(api: Option<Arc<StubApi>>) -> (TempDir, VaultService) {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let vault_config = VaultConfig::builder(temp_dir.path())
        .build()
        .expect("Failed to create vault config");
    let config = ConfigProfile::Development.create_config(vault_config);

    let service = match api {
        Some(api) => VaultService::with_api(&config, api),
        None => VaultService::offline(&config),
    };
    (temp_dir, service)
}

fn note(raw: &str) -> NotePath {
    NotePath::parse(raw).expect("valid note path")
}

#[tokio::test]
async fn test_api_success_leaves_filesystem_untouched() {
    let api = Arc::new(StubApi::default());
    let (temp_dir, service) = setup(Some(api.clone()));

    let outcome = service.create_note(&note("a.md"), "remote").await.unwrap();

    assert_eq!(outcome.backend(), Backend::Api);
    assert_eq!(api.note("a.md").as_deref(), Some("remote"));
    assert!(!temp_dir.path().join("a.md").exists());
}

#[tokio::test]
async fn test_unavailable_api_falls_back_to_filesystem() {
    let api = Arc::new(StubApi::unavailable());
    let (temp_dir, service) = setup(Some(api.clone()));

    let outcome = service.create_note(&note("a.md"), "local").await.unwrap();

    assert_eq!(outcome.backend(), Backend::Filesystem);
    assert_eq!(api.calls.load(Ordering::SeqCst), 1);
    assert_eq!(
        std::fs::read_to_string(temp_dir.path().join("a.md")).unwrap(),
        "local"
    );
}

#[tokio::test]
async fn test_both_backends_failing_surfaces_filesystem_error() {
    let api = Arc::new(StubApi::unavailable());
    let (_temp_dir, service) = setup(Some(api));

    let err = service.update_note(&note("missing.md"), "x").await.unwrap_err();
    assert!(matches!(err, Error::NotFound { .. }));
}

#[tokio::test]
async fn test_offline_never_calls_api() {
    let (temp_dir, service) = setup(None);
    assert!(!service.has_api());

    let outcome = service
        .execute(VaultOperation::CreateNote {
            path: note("dir/n.md"),
            content: "x".into(),
        })
        .await
        .unwrap();

    assert_eq!(outcome.backend(), Backend::Filesystem);
    assert_eq!(
        outcome.into_inner(),
        OperationOutput::Message("Note created successfully at dir/n.md".into())
    );
    assert!(temp_dir.path().join("dir/n.md").exists());
}

#[tokio::test]
async fn test_edit_over_api_patches_remote_copy() {
    let api = Arc::new(StubApi::default().with_note("n.md", "  foo\n  bar\n"));
    let (_temp_dir, service) = setup(Some(api.clone()));

    let outcome = service
        .edit_note(
            &note("n.md"),
            &[EditOperation::new("foo\nbar", "baz\nqux")],
            false,
            None,
        )
        .await
        .unwrap();

    assert_eq!(outcome.backend(), Backend::Api);
    assert_eq!(api.note("n.md").as_deref(), Some("  baz\n  qux\n"));
}

#[tokio::test]
async fn test_edit_not_found_over_api_does_not_fall_back() {
    let api = Arc::new(StubApi::default().with_note("n.md", "hello\n"));
    let (temp_dir, service) = setup(Some(api.clone()));
    std::fs::write(temp_dir.path().join("n.md"), "goodbye\n").unwrap();

    let err = service
        .edit_note(&note("n.md"), &[EditOperation::new("goodbye", "x")], false, None)
        .await
        .unwrap_err();

    assert!(matches!(err, Error::EditNotFound { index: 1, .. }));
    assert!(err.to_string().contains("goodbye"));
    assert_eq!(
        std::fs::read_to_string(temp_dir.path().join("n.md")).unwrap(),
        "goodbye\n"
    );
}

#[tokio::test]
async fn test_preview_over_api_does_not_write() {
    let api = Arc::new(StubApi::default().with_note("n.md", "a\nb\n"));
    let (_temp_dir, service) = setup(Some(api.clone()));
    let edits = [EditOperation::new("b", "c")];

    let first = service
        .edit_note(&note("n.md"), &edits, true, None)
        .await
        .unwrap()
        .into_inner();
    let second = service
        .edit_note(&note("n.md"), &edits, true, None)
        .await
        .unwrap()
        .into_inner();

    assert!(first.is_preview());
    assert_eq!(first, second);
    assert_eq!(api.note("n.md").as_deref(), Some("a\nb\n"));
}

#[tokio::test]
async fn test_list_notes_over_api_filters_by_folder() {
    let api = Arc::new(
        StubApi::default()
            .with_note("daily/a.md", "")
            .with_note("daily-log/b.md", "")
            .with_note("top.md", ""),
    );
    let (_temp_dir, service) = setup(Some(api));

    let notes = service
        .list_notes(Some(&note("daily")))
        .await
        .unwrap()
        .into_inner();
    assert_eq!(notes, vec!["daily/a.md"]);
}

#[tokio::test]
async fn test_read_multiple_mixes_backends_and_errors() {
    let api = Arc::new(StubApi::unavailable());
    let (temp_dir, service) = setup(Some(api));
    std::fs::write(temp_dir.path().join("a.md"), "A").unwrap();

    let outcome = service
        .read_multiple_notes(&[note("a.md"), note("b.md")])
        .await;

    assert_eq!(outcome.backend(), Backend::Filesystem);
    let results = outcome.into_inner();
    assert_eq!(results[0].content.as_deref(), Some("A"));
    assert!(results[1].error.as_deref().unwrap().contains("b.md"));
}

#[tokio::test]
async fn test_search_prefers_api_results() {
    let api = Arc::new(StubApi::default().with_note("remote.md", "needle"));
    let (temp_dir, service) = setup(Some(api.clone()));
    std::fs::write(temp_dir.path().join("local.md"), "needle").unwrap();

    let hits = service.search_vault("needle").await.unwrap();
    assert_eq!(hits.backend(), Backend::Api);
    assert_eq!(hits.as_inner()[0].path, "remote.md");

    api.down.store(true, Ordering::SeqCst);
    let hits = service.search_vault("NEEDLE").await.unwrap();
    assert_eq!(hits.backend(), Backend::Filesystem);
    assert_eq!(hits.as_inner()[0].path, "local.md");
    assert_eq!(hits.as_inner()[0].score, 1.0);
}

#[tokio::test]
async fn test_empty_search_is_rejected_before_any_backend() {
    let api = Arc::new(StubApi::default());
    let (_temp_dir, service) = setup(Some(api.clone()));

    let err = service.search_vault("").await.unwrap_err();
    assert!(matches!(err, Error::ValidationError { .. }));
    assert_eq!(api.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_ordering_sensitivity_through_service() {
    let (temp_dir, service) = setup(None);
    std::fs::write(temp_dir.path().join("n.md"), "alpha\n").unwrap();

    let forward = [
        EditOperation::new("alpha", "beta"),
        EditOperation::new("beta", "gamma"),
    ];
    let backward = [
        EditOperation::new("beta", "gamma"),
        EditOperation::new("alpha", "beta"),
    ];

    let err = service
        .edit_note(&note("n.md"), &backward, false, None)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::EditNotFound { index: 1, .. }));

    service
        .edit_note(&note("n.md"), &forward, false, None)
        .await
        .unwrap();
    assert_eq!(
        std::fs::read_to_string(temp_dir.path().join("n.md")).unwrap(),
        "gamma\n"
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_edits_to_one_note_all_apply() {
    let (temp_dir, service) = setup(None);
    let service = Arc::new(service);
    let content: String = (0..16).map(|i| format!("slot{:02}\n", i)).collect();
    std::fs::write(temp_dir.path().join("shared.md"), &content).unwrap();

    let tasks: Vec<_> = (0..16)
        .map(|i| {
            let service = Arc::clone(&service);
            tokio::spawn(async move {
                service
                    .edit_note(
                        &note("shared.md"),
                        &[EditOperation::new(
                            format!("slot{:02}", i),
                            format!("done{:02}", i),
                        )],
                        false,
                        None,
                    )
                    .await
            })
        })
        .collect();

    for task in tasks {
        task.await.unwrap().unwrap();
    }

    let expected: String = (0..16).map(|i| format!("done{:02}\n", i)).collect();
    assert_eq!(
        std::fs::read_to_string(temp_dir.path().join("shared.md")).unwrap(),
        expected
    );
}

#[tokio::test]
async fn test_delete_and_move_prune_through_service() {
    let (temp_dir, service) = setup(None);

    service.create_note(&note("a/b/c.md"), "x").await.unwrap();
    service.delete_note(&note("a/b/c.md")).await.unwrap();
    assert!(!temp_dir.path().join("a").exists());

    service.create_note(&note("p/q/n.md"), "y").await.unwrap();
    service
        .move_note(&note("p/q/n.md"), &note("r/n.md"))
        .await
        .unwrap();
    assert!(!temp_dir.path().join("p").exists());
    assert!(temp_dir.path().join("r/n.md").exists());
}

#[tokio::test]
async fn test_execute_folder_operations_from_json() {
    let (temp_dir, service) = setup(None);

    for (json, expected) in [
        (
            r#"{"tool":"create_folder","path":"projects"}"#,
            "Folder created successfully at projects",
        ),
        (
            r#"{"tool":"rename_folder","path":"projects","newPath":"archive"}"#,
            "Folder renamed from projects to archive",
        ),
        (
            r#"{"tool":"move_folder","path":"archive","newPath":"old/archive"}"#,
            "Folder moved from archive to old/archive",
        ),
        (
            r#"{"tool":"delete_folder","path":"old/archive"}"#,
            "Folder deleted successfully: old/archive",
        ),
    ] {
        let op = VaultOperation::from_json(json).unwrap();
        let output = service.execute(op).await.unwrap().into_inner();
        assert_eq!(output, OperationOutput::Message(expected.to_string()));
    }

    assert!(!temp_dir.path().join("old").exists());
    assert!(!temp_dir.path().join("projects").exists());
}

#[tokio::test]
async fn test_api_timeout_falls_back_to_filesystem() {
    // Accepts connections and never answers
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    let server = tokio::spawn(async move {
        let mut held = Vec::new();
        while let Ok((socket, _)) = listener.accept().await {
            held.push(socket);
        }
    });

    let temp_dir = TempDir::new().unwrap();
    std::fs::write(temp_dir.path().join("n.md"), "local copy").unwrap();
    let vault_config = VaultConfig::builder(temp_dir.path()).build().unwrap();
    let config = ConfigProfile::Production
        .create_config(vault_config)
        .with_api(ApiConfig {
            port,
            timeout_ms: 200,
            ..ApiConfig::default()
        });
    let service = VaultService::new(&config).unwrap();
    assert!(service.has_api());

    let started = std::time::Instant::now();
    let outcome = service.read_note(&note("n.md")).await.unwrap();
    assert_eq!(outcome.backend(), Backend::Filesystem);
    assert_eq!(outcome.into_inner(), "local copy");
    assert!(started.elapsed() < std::time::Duration::from_secs(5));

    server.abort();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_folder_rename_never_interleaves_with_note_edits() {
    let (temp_dir, service) = setup(None);
    let service = Arc::new(service);
    std::fs::create_dir(temp_dir.path().join("a")).unwrap();
    std::fs::write(temp_dir.path().join("a/x.md"), "v0\n").unwrap();

    let edits: Vec<_> = (0..8)
        .map(|i| {
            let service = Arc::clone(&service);
            tokio::spawn(async move {
                service
                    .edit_note(
                        &note("a/x.md"),
                        &[EditOperation::new(format!("v{}", i), format!("v{}", i + 1))],
                        false,
                        None,
                    )
                    .await
            })
        })
        .collect();
    service.rename_folder(&note("a"), &note("b")).await.unwrap();

    for edit in edits {
        // Edits queued behind the rename find the note gone or out of order
        let _ = edit.await.unwrap();
    }

    assert!(!temp_dir.path().join("a").exists());
    let moved: Vec<String> = std::fs::read_dir(temp_dir.path().join("b"))
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    assert_eq!(moved, vec!["x.md"]);
}
