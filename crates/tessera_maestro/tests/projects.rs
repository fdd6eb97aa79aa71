//! Multi-project hosting: discovery, ownership, lifecycle and validation.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use tessera_maestro::{
    DiagnosticPublisher, EmbeddedService, FileEvent, FileEventKind, HostOptions, HostState,
    LanguageServices, MemoryFileSystem, OsFileSystem, ProjectError, ProjectManager,
};
use tessera_carton::lsp_types::{
    Diagnostic, Hover, HoverContents, MarkedString, Position, Range, TextDocumentContentChangeEvent,
    Url,
};
use tessera_carton::LineIndex;
use tessera_mosaic::{SurfaceFamily, VirtualDocument};

fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

/// Answers hovers over identifiers in script surfaces and flags `bad`.
struct ScriptEngine;

fn word_range(doc: &VirtualDocument, position: Position) -> Option<Range> {
    let text = doc.text();
    let (offset, _) = doc.index.range_to_span(Range::new(position, position))?;
    let offset = offset as usize;
    let is_ident = |c: char| c.is_alphanumeric() || c == '_' || c == '$';
    let start = text[..offset]
        .rfind(|c: char| !is_ident(c))
        .map_or(0, |i| i + 1);
    let end = text[offset..]
        .find(|c: char| !is_ident(c))
        .map_or(text.len(), |i| offset + i);
    (start < end).then(|| doc.index.span_to_range(start as u32, end as u32))
}

#[async_trait]
impl EmbeddedService for ScriptEngine {
    fn hover(&self, doc: &VirtualDocument, position: Position) -> Option<Hover> {
        if doc.kind.family() != SurfaceFamily::Script {
            return None;
        }
        let range = word_range(doc, position)?;
        Some(Hover {
            contents: HoverContents::Scalar(MarkedString::String("string".into())),
            range: Some(range),
        })
    }

    async fn validate(&self, doc: &VirtualDocument) -> Vec<Diagnostic> {
        doc.text()
            .match_indices("bad")
            .map(|(i, _)| Diagnostic {
                range: doc.index.span_to_range(i as u32, i as u32 + 3),
                message: "bad".into(),
                ..Default::default()
            })
            .collect()
    }
}

fn services() -> LanguageServices {
    LanguageServices {
        script: Some(Arc::new(ScriptEngine)),
        ..Default::default()
    }
}

fn uri(path: &str) -> Url {
    Url::from_file_path(path).unwrap()
}

fn manager(fs: &Arc<MemoryFileSystem>) -> ProjectManager {
    init_tracing();
    ProjectManager::new("/work", fs.clone(), services(), HostOptions::default()).unwrap()
}

fn owner(manager: &ProjectManager, path: &str) -> Option<PathBuf> {
    manager.project_for(Path::new(path)).map(Path::to_path_buf)
}

const APP: &str = "<script setup lang=\"ts\">\nconst msg: string = 'hi'\n</script>\n<template><div>{{ msg }}</div></template>\n";

#[test]
fn nested_manifest_owns_its_files() {
    let fs = Arc::new(MemoryFileSystem::new());
    fs.insert("/work/tsconfig.json", "{}");
    fs.insert("/work/projA/tsconfig.json", "{}");
    fs.insert("/work/projA/src/App.vue", APP);
    fs.insert("/work/main.ts", "");
    let manager = manager(&fs);

    assert_eq!(manager.projects().count(), 2);
    // Both list the file and both are ancestors: the deeper one wins
    assert_eq!(
        owner(&manager, "/work/projA/src/App.vue"),
        Some(PathBuf::from("/work/projA/tsconfig.json"))
    );
    assert_eq!(
        owner(&manager, "/work/main.ts"),
        Some(PathBuf::from("/work/tsconfig.json"))
    );
    assert_eq!(owner(&manager, "/elsewhere/x.vue"), None);
}

#[test]
fn ancestor_beats_deeper_reference() {
    let fs = Arc::new(MemoryFileSystem::new());
    fs.insert("/work/lib/tsconfig.json", "{}");
    fs.insert("/work/lib/Button.vue", "");
    fs.insert(
        "/work/apps/web/deep/tsconfig.json",
        r#"{ "files": ["../../../lib/Button.vue"] }"#,
    );
    let manager = manager(&fs);

    assert_eq!(
        owner(&manager, "/work/lib/Button.vue"),
        Some(PathBuf::from("/work/lib/tsconfig.json"))
    );
}

#[test]
fn equal_depth_tie_takes_smallest_manifest_path() {
    let fs = Arc::new(MemoryFileSystem::new());
    fs.insert("/work/shared/Card.vue", "");
    fs.insert("/work/b/tsconfig.json", r#"{ "files": ["../shared/Card.vue"] }"#);
    fs.insert("/work/a/tsconfig.json", r#"{ "files": ["../shared/Card.vue"] }"#);
    let manager = manager(&fs);

    assert_eq!(
        owner(&manager, "/work/shared/Card.vue"),
        Some(PathBuf::from("/work/a/tsconfig.json"))
    );
}

#[test]
fn skipped_directories_and_broken_manifests() {
    let fs = Arc::new(MemoryFileSystem::new());
    fs.insert("/work/app/tsconfig.json", "{}");
    fs.insert("/work/app/main.ts", "");
    fs.insert("/work/node_modules/pkg/tsconfig.json", "{}");
    fs.insert("/work/broken/tsconfig.json", "{ nope");
    let manager = manager(&fs);

    let manifests: Vec<_> = manager.projects().map(|p| p.manifest_path().to_path_buf()).collect();
    assert_eq!(manifests, vec![PathBuf::from("/work/app/tsconfig.json")]);
}

#[test]
fn root_watch_failure_is_fatal() {
    let fs = Arc::new(MemoryFileSystem::new());
    fs.insert("/work/tsconfig.json", "{}");
    fs.reject_watch("/work");
    let result = ProjectManager::new("/work", fs.clone(), services(), HostOptions::default());
    assert!(matches!(result, Err(ProjectError::Watch(_))));
}

#[test]
fn hover_inside_interpolation() {
    let fs = Arc::new(MemoryFileSystem::new());
    fs.insert("/work/tsconfig.json", "{}");
    fs.insert("/work/src/App.vue", APP);
    let mut manager = manager(&fs);

    let index = LineIndex::new(APP);
    let offset = APP.find("{{ msg }}").unwrap() as u32 + 3;
    let at = index.offset_to_position(offset + 1);
    let hover = manager.hover(&uri("/work/src/App.vue"), at).unwrap();
    assert_eq!(
        hover.contents,
        HoverContents::Scalar(MarkedString::String("string".into()))
    );
    assert_eq!(hover.range, Some(index.span_to_range(offset, offset + 3)));

    // Files outside every project are not analyzed
    assert!(manager.hover(&uri("/other/App.vue"), at).is_none());
}

#[test]
fn hover_in_plain_script_member() {
    let fs = Arc::new(MemoryFileSystem::new());
    fs.insert("/work/tsconfig.json", "{}");
    fs.insert("/work/src/App.vue", APP);
    fs.insert("/work/src/main.ts", "import App from './App.vue'\nconst count = 1\n");
    let mut manager = manager(&fs);

    let main = uri("/work/src/main.ts");
    let hover = manager.hover(&main, Position::new(1, 7)).unwrap();
    assert_eq!(
        hover.range,
        Some(Range::new(Position::new(1, 6), Position::new(1, 11)))
    );

    // The open document wins over the file on disk
    manager.open_document(main.clone(), "let total = 2", 1, "typescript");
    let hover = manager.hover(&main, Position::new(0, 5)).unwrap();
    assert_eq!(
        hover.range,
        Some(Range::new(Position::new(0, 4), Position::new(0, 9)))
    );

    assert!(manager.hover(&uri("/other/main.ts"), Position::new(0, 0)).is_none());
}

#[test]
fn deleted_manifest_disposes_its_host() {
    let fs = Arc::new(MemoryFileSystem::new());
    fs.insert("/work/app/tsconfig.json", "{}");
    fs.insert("/work/app/src/App.vue", APP);
    let mut manager = manager(&fs);
    let app = uri("/work/app/src/App.vue");
    manager.open_document(app.clone(), APP, 1, "vue");

    let at = Position::new(3, 18);
    assert!(manager.hover(&app, at).is_some());
    // root, manifest, directory, member
    assert_eq!(fs.active_watches(), 4);

    fs.remove(Path::new("/work/app/tsconfig.json"));
    manager.on_file_event(FileEvent::new(
        "/work/app/tsconfig.json",
        FileEventKind::Deleted,
    ));

    assert_eq!(manager.projects().count(), 0);
    assert_eq!(fs.active_watches(), 1);
    assert!(fs.is_watched(Path::new("/work/app/src/App.vue")));
    assert!(manager.hover(&app, at).is_none());
    assert!(manager.take_validation_passes().is_empty());

    // Recreating it brings the project back
    fs.insert("/work/app/tsconfig.json", "{}");
    manager.on_file_event(FileEvent::new(
        "/work/app/tsconfig.json",
        FileEventKind::Created,
    ));
    assert!(manager.hover(&app, at).is_some());
}

#[test]
fn directory_bursts_are_coalesced() {
    let fs = Arc::new(MemoryFileSystem::new());
    fs.insert("/work/tsconfig.json", "{}");
    fs.insert("/work/src/a.ts", "");
    let mut manager = manager(&fs);
    let manifest = Path::new("/work/tsconfig.json");
    let before = manager.project(manifest).unwrap().project_version();

    for name in ["b.ts", "c.ts", "d.ts"] {
        let path = format!("/work/src/{name}");
        fs.insert(path.as_str(), "");
        manager.on_file_event(FileEvent::new(path, FileEventKind::Created));
    }
    assert!(manager.project_for(Path::new("/work/src/b.ts")).is_none());

    manager.flush_deferred();
    let host = manager.project(manifest).unwrap();
    assert_eq!(host.manifest().file_names.len(), 4);
    assert_eq!(host.project_version(), before + 1);
    assert_eq!(host.state(), HostState::Watching);
}

#[test]
fn broken_manifest_edit_disposes_host() {
    let fs = Arc::new(MemoryFileSystem::new());
    fs.insert("/work/tsconfig.json", "{}");
    fs.insert("/work/src/a.ts", "");
    let mut manager = manager(&fs);

    fs.insert("/work/tsconfig.json", "{ nope");
    manager.on_file_event(FileEvent::new("/work/tsconfig.json", FileEventKind::Changed));
    assert_eq!(manager.projects().count(), 0);
    assert_eq!(fs.active_watches(), 1);
}

#[test]
fn watched_and_open_versions() {
    let fs = Arc::new(MemoryFileSystem::new());
    fs.insert("/work/tsconfig.json", "{}");
    fs.insert("/work/src/main.ts", "export {}");
    let mut manager = manager(&fs);
    let manifest = Path::new("/work/tsconfig.json");
    let main = Path::new("/work/src/main.ts");

    manager.on_file_event(FileEvent::new(main, FileEventKind::Changed));
    manager.on_file_event(FileEvent::new(main, FileEventKind::Changed));
    assert_eq!(manager.project(manifest).unwrap().script_version(main), "1");

    let main_uri = uri("/work/src/main.ts");
    manager.open_document(main_uri.clone(), "export {}", 1, "typescript");
    let opened = manager.project(manifest).unwrap().script_version(main);
    assert_eq!(opened.len(), 16);

    // A change that leaves the text as it was keeps the version
    let version = manager.project(manifest).unwrap().project_version();
    let change = TextDocumentContentChangeEvent {
        range: None,
        range_length: None,
        text: "export {}".into(),
    };
    assert!(manager.change_document(&main_uri, &[change], 2));
    let host = manager.project(manifest).unwrap();
    assert_eq!(host.script_version(main), opened);
    assert_eq!(host.project_version(), version);
}

#[derive(Default)]
struct Collect(Mutex<Vec<(Url, Option<i32>, Vec<Diagnostic>)>>);

#[async_trait]
impl DiagnosticPublisher for Collect {
    async fn publish(&self, uri: Url, version: Option<i32>, diagnostics: Vec<Diagnostic>) {
        self.0.lock().push((uri, version, diagnostics));
    }
}

#[tokio::test]
async fn superseded_sweep_publishes_nothing() {
    let fs = Arc::new(MemoryFileSystem::new());
    fs.insert("/work/tsconfig.json", "{}");
    fs.insert("/work/src/App.vue", APP);
    fs.insert("/work/src/Other.vue", "<template><p :a=\"bad\"></p></template>");
    let mut manager = manager(&fs);

    let mut first = manager.take_validation_passes();
    assert_eq!(first.len(), 1);

    let app = uri("/work/src/App.vue");
    let text = APP.replace("'hi'", "bad");
    manager.open_document(app.clone(), &text, 5, "vue");
    let mut second = manager.take_validation_passes();
    assert_eq!(second.len(), 1);

    let publisher = Collect::default();
    assert_eq!(first.remove(0).run(&publisher).await, 0);
    assert!(publisher.0.lock().is_empty());

    let pass = second.remove(0);
    let order: Vec<_> = pass.uris().cloned().collect();
    assert_eq!(order, vec![app.clone(), uri("/work/src/Other.vue")]);
    assert_eq!(pass.run(&publisher).await, 2);

    let published = publisher.0.lock();
    assert_eq!(published[0].0, app);
    assert_eq!(published[0].1, Some(5));
    assert_eq!(published[0].2.len(), 1);
    assert_eq!(published[1].1, None);
    assert_eq!(published[1].2.len(), 1);
}

#[test]
fn diagnostics_option_disables_sweeps() {
    let fs = Arc::new(MemoryFileSystem::new());
    fs.insert("/work/tsconfig.json", "{}");
    fs.insert("/work/src/App.vue", APP);
    let options = HostOptions {
        diagnostics: false,
        ..Default::default()
    };
    let mut manager = ProjectManager::new("/work", fs.clone(), services(), options).unwrap();
    manager.open_document(uri("/work/src/App.vue"), APP, 1, "vue");
    assert!(manager.take_validation_passes().is_empty());
}

#[test]
fn dispose_releases_everything() {
    let fs = Arc::new(MemoryFileSystem::new());
    fs.insert("/work/a/tsconfig.json", "{}");
    fs.insert("/work/a/x.ts", "");
    fs.insert("/work/b/tsconfig.json", "{}");
    let mut manager = manager(&fs);
    assert_eq!(manager.projects().count(), 2);

    assert!(manager.dispose_project(Path::new("/work/b/tsconfig.json")));
    assert!(!manager.dispose_project(Path::new("/work/b/tsconfig.json")));
    assert_eq!(manager.projects().count(), 1);

    manager.dispose();
    assert_eq!(manager.projects().count(), 0);
    assert_eq!(fs.active_watches(), 0);
}

#[test]
fn os_file_system_project() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    std::fs::create_dir_all(root.join("src")).unwrap();
    std::fs::write(
        root.join("tsconfig.json"),
        "{\n  // comment\n  \"include\": [\"src\"],\n}\n",
    )
    .unwrap();
    std::fs::write(root.join("src/App.vue"), APP).unwrap();
    std::fs::write(root.join("src/main.ts"), "").unwrap();
    std::fs::write(root.join("README.md"), "").unwrap();

    let (fs, _events) = OsFileSystem::new();
    let fs = Arc::new(fs);
    let manager =
        ProjectManager::new(root, fs.clone(), services(), HostOptions::default()).unwrap();
    let host = manager.project(&root.join("tsconfig.json")).unwrap();
    let files: Vec<_> = host.manifest().file_names.iter().cloned().collect();
    assert_eq!(files, vec![root.join("src/App.vue"), root.join("src/main.ts")]);
    // root, manifest, directory, two members
    assert_eq!(fs.active_watches(), 5);
}
