//! Validation sweeps and their cancellation.
//!
//! Each host hands out [`ValidationPass`] values that the protocol layer
//! drives. Starting a new sweep cancels the previous one, and starting a
//! new diagnostic request for a document cancels the older request for that
//! document, so a superseded result is never published.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use lsp_types::{Diagnostic, Url};
use parking_lot::Mutex;
use tessera_carton::FxHashMap;
use tessera_mosaic::SourceFile;
use tokio_util::sync::CancellationToken;

use crate::ide::DiagnosticService;
use crate::service::LanguageServices;

/// Receives finished diagnostics.
#[async_trait]
pub trait DiagnosticPublisher: Send + Sync {
    async fn publish(&self, uri: Url, version: Option<i32>, diagnostics: Vec<Diagnostic>);
}

/// Live cancellation tokens of one host.
#[derive(Debug, Default)]
pub struct RequestTracker {
    state: Mutex<TrackerState>,
}

#[derive(Debug, Default)]
struct TrackerState {
    sweep: CancellationToken,
    documents: FxHashMap<Url, CancellationToken>,
}

impl RequestTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a sweep, cancelling the running one.
    pub fn new_sweep(&self) -> CancellationToken {
        let mut state = self.state.lock();
        state.sweep.cancel();
        state.sweep = CancellationToken::new();
        state.sweep.clone()
    }

    /// Start a diagnostic request for `uri`, cancelling the older one.
    pub fn begin_document(&self, uri: &Url) -> CancellationToken {
        let token = CancellationToken::new();
        let mut state = self.state.lock();
        if let Some(old) = state.documents.insert(uri.clone(), token.clone()) {
            old.cancel();
        }
        token
    }

    pub fn cancel_all(&self) {
        let mut state = self.state.lock();
        state.sweep.cancel();
        for (_, token) in state.documents.drain() {
            token.cancel();
        }
    }
}

/// One document to validate. `version` is set for open documents only.
#[derive(Debug, Clone)]
pub(crate) struct PassTarget {
    pub(crate) file: SourceFile,
    pub(crate) version: Option<i32>,
}

/// A full validation sweep over one project.
#[derive(Debug)]
pub struct ValidationPass {
    manifest: PathBuf,
    sweep: CancellationToken,
    targets: Vec<PassTarget>,
    services: LanguageServices,
    tracker: Arc<RequestTracker>,
}

impl ValidationPass {
    pub(crate) fn new(
        manifest: PathBuf,
        sweep: CancellationToken,
        targets: Vec<PassTarget>,
        services: LanguageServices,
        tracker: Arc<RequestTracker>,
    ) -> Self {
        Self {
            manifest,
            sweep,
            targets,
            services,
            tracker,
        }
    }

    pub fn manifest(&self) -> &Path {
        &self.manifest
    }

    /// Documents in validation order.
    pub fn uris(&self) -> impl Iterator<Item = &Url> {
        self.targets.iter().map(|target| target.file.uri())
    }

    pub fn is_cancelled(&self) -> bool {
        self.sweep.is_cancelled()
    }

    /// Validate and publish every document until the sweep is superseded.
    /// Returns the number of published documents.
    pub async fn run(self, publisher: &dyn DiagnosticPublisher) -> usize {
        let mut published = 0;
        for target in &self.targets {
            if self.sweep.is_cancelled() {
                tracing::debug!(manifest = %self.manifest.display(), "validation sweep superseded");
                break;
            }
            let token = self.tracker.begin_document(target.file.uri());
            let Some(diagnostics) =
                DiagnosticService::diagnostics(&target.file, &self.services, &token).await
            else {
                continue;
            };
            if self.sweep.is_cancelled() {
                tracing::debug!(manifest = %self.manifest.display(), "validation sweep superseded");
                break;
            }
            publisher
                .publish(target.file.uri().clone(), target.version, diagnostics)
                .await;
            published += 1;
        }
        published
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ide::test_utils::source_file;
    use crate::service::EmbeddedService;
    use tessera_mosaic::VirtualDocument;
    use tokio::sync::Notify;

    /// Waits for `gate` before reporting nothing.
    struct Gated(Arc<Notify>);

    #[async_trait]
    impl EmbeddedService for Gated {
        async fn validate(&self, _doc: &VirtualDocument) -> Vec<Diagnostic> {
            self.0.notified().await;
            Vec::new()
        }
    }

    #[derive(Default)]
    struct Collect(Mutex<Vec<(Url, Option<i32>, usize)>>);

    #[async_trait]
    impl DiagnosticPublisher for Collect {
        async fn publish(&self, uri: Url, version: Option<i32>, diagnostics: Vec<Diagnostic>) {
            self.0.lock().push((uri, version, diagnostics.len()));
        }
    }

    fn pass(tracker: &Arc<RequestTracker>) -> ValidationPass {
        let file = source_file("<template><div></template>");
        ValidationPass::new(
            PathBuf::from("/work/src/tsconfig.json"),
            tracker.new_sweep(),
            vec![PassTarget {
                file,
                version: Some(3),
            }],
            LanguageServices::default(),
            tracker.clone(),
        )
    }

    #[test]
    fn test_tokens_supersede() {
        let tracker = RequestTracker::new();
        let first = tracker.new_sweep();
        let second = tracker.new_sweep();
        assert!(first.is_cancelled());
        assert!(!second.is_cancelled());

        let uri = Url::parse("file:///work/src/App.vue").unwrap();
        let a = tracker.begin_document(&uri);
        let b = tracker.begin_document(&uri);
        assert!(a.is_cancelled());
        assert!(!b.is_cancelled());

        tracker.cancel_all();
        assert!(second.is_cancelled());
        assert!(b.is_cancelled());
    }

    #[tokio::test]
    async fn test_pass_publishes_until_superseded() {
        let tracker = Arc::new(RequestTracker::new());
        let publisher = Collect::default();

        let older = pass(&tracker);
        let newer = pass(&tracker);
        assert!(older.is_cancelled());
        assert_eq!(older.run(&publisher).await, 0);
        assert!(publisher.0.lock().is_empty());

        assert_eq!(newer.run(&publisher).await, 1);
        let published = publisher.0.lock().clone();
        assert_eq!(published.len(), 1);
        assert_eq!(published[0].0.as_str(), "file:///work/src/App.vue");
        assert_eq!(published[0].1, Some(3));
        // The unclosed element
        assert_eq!(published[0].2, 1);
    }

    #[tokio::test]
    async fn test_superseded_during_validation_publishes_nothing() {
        let tracker = Arc::new(RequestTracker::new());
        let publisher = Collect::default();
        let gate = Arc::new(Notify::new());
        let services = LanguageServices {
            script: Some(Arc::new(Gated(gate.clone()))),
            ..Default::default()
        };
        let pass = ValidationPass::new(
            PathBuf::from("/work/src/tsconfig.json"),
            tracker.new_sweep(),
            vec![PassTarget {
                file: source_file("<script setup>\nconst a = 1\n</script>"),
                version: Some(1),
            }],
            services,
            tracker.clone(),
        );

        let running = pass.run(&publisher);
        let supersede = async {
            tracker.new_sweep();
            gate.notify_one();
        };
        let (published, ()) = tokio::join!(running, supersede);
        assert_eq!(published, 0);
        assert!(publisher.0.lock().is_empty());
    }
}
