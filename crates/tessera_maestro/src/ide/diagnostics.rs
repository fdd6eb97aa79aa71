//! Diagnostics aggregation.
//!
//! Block-level and template parse problems are reported directly; every
//! virtual document is then validated by its engine and the results are
//! mapped back through `diagnostic`-capable entries. The caller's
//! cancellation token is checked after each await, and a cancelled request
//! yields `None` so a stale result is never published.

use lsp_types::{Diagnostic, DiagnosticSeverity, NumberOrString};
use tokio_util::sync::CancellationToken;
use tessera_mosaic::{Capabilities, SourceFile};

use crate::service::LanguageServices;

/// Source tag for diagnostics produced by tessera itself.
pub const SOURCE: &str = "tessera";

/// Diagnostic service.
pub struct DiagnosticService;

impl DiagnosticService {
    pub async fn diagnostics(
        file: &SourceFile,
        services: &LanguageServices,
        token: &CancellationToken,
    ) -> Option<Vec<Diagnostic>> {
        if token.is_cancelled() {
            return None;
        }
        let source = file.line_index();
        let mut result = Self::syntax_diagnostics(file);

        for doc in file.virtual_documents().iter() {
            let Some(service) = services.for_family(doc.kind.family()) else {
                continue;
            };
            let diagnostics = service.validate(doc).await;
            if token.is_cancelled() {
                tracing::debug!(uri = %file.uri(), version = file.version(), "drop stale diagnostics");
                return None;
            }
            result.extend(diagnostics.into_iter().filter_map(|mut diagnostic| {
                diagnostic.range =
                    doc.first_source_range(source, diagnostic.range, Capabilities::DIAGNOSTIC)?;
                Some(diagnostic)
            }));
        }
        Some(result)
    }

    /// Duplicate blocks and template parse errors.
    pub fn syntax_diagnostics(file: &SourceFile) -> Vec<Diagnostic> {
        let source = file.line_index();
        let mut result: Vec<Diagnostic> = file
            .sfc_errors()
            .iter()
            .map(|error| {
                let range = source.span_to_range(error.loc.tag_start as u32, error.loc.tag_end as u32);
                error_diagnostic(range, error.code.to_string(), error.message.to_string())
            })
            .collect();

        // Offsets of alternate-syntax templates point into rendered markup
        let template = file.descriptor().template.as_ref();
        if let Some(template) = template.filter(|t| t.lang() == "html") {
            let base = template.loc.start as u32;
            result.extend(file.template_errors().iter().map(|error| {
                let range = source.span_to_range(
                    base + error.loc.start.offset,
                    base + error.loc.end.offset,
                );
                error_diagnostic(range, format!("{:?}", error.code), error.code.message().to_string())
            }));
        }
        result
    }
}

fn error_diagnostic(range: lsp_types::Range, code: String, message: String) -> Diagnostic {
    Diagnostic {
        range,
        severity: Some(DiagnosticSeverity::ERROR),
        code: Some(NumberOrString::String(code)),
        source: Some(SOURCE.to_string()),
        message,
        ..Default::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ide::test_utils::{range_of, source_file};
    use crate::service::EmbeddedService;
    use async_trait::async_trait;
    use lsp_types::Range;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tessera_mosaic::VirtualDocument;
    use tokio::sync::Notify;

    /// Reports every `bad` identifier; the first call waits for `gate`.
    struct Checker {
        calls: AtomicUsize,
        gate: Option<Arc<Notify>>,
    }

    impl Checker {
        fn new(gate: Option<Arc<Notify>>) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                gate,
            }
        }
    }

    #[async_trait]
    impl EmbeddedService for Checker {
        async fn validate(&self, doc: &VirtualDocument) -> Vec<Diagnostic> {
            if self.calls.fetch_add(1, Ordering::SeqCst) == 0 {
                if let Some(gate) = &self.gate {
                    gate.notified().await;
                }
            }
            doc.text()
                .match_indices("bad")
                .map(|(i, _)| Diagnostic {
                    range: doc.index.span_to_range(i as u32, i as u32 + 3),
                    message: "bad name".into(),
                    ..Default::default()
                })
                .collect()
        }
    }

    const APP: &str = "<script setup>\nconst bad = 1\n</script>\n<template><p :id=\"bad\"></p></template>";

    #[tokio::test]
    async fn test_results_map_back() {
        let file = source_file(APP);
        let services = LanguageServices {
            script: Some(Arc::new(Checker::new(None))),
            ..Default::default()
        };
        let diagnostics = DiagnosticService::diagnostics(&file, &services, &CancellationToken::new())
            .await
            .unwrap();
        let ranges: Vec<Range> = diagnostics.iter().map(|d| d.range).collect();
        assert_eq!(ranges, vec![range_of(APP, "bad", 0), range_of(APP, "bad", 1)]);
    }

    #[tokio::test]
    async fn test_cancelled_before_start() {
        let file = source_file(APP);
        let token = CancellationToken::new();
        token.cancel();
        let services = LanguageServices::default();
        assert!(DiagnosticService::diagnostics(&file, &services, &token).await.is_none());
    }

    #[tokio::test]
    async fn test_newer_request_wins() {
        let file = source_file(APP);
        let gate = Arc::new(Notify::new());
        let services = LanguageServices {
            script: Some(Arc::new(Checker::new(Some(gate.clone())))),
            ..Default::default()
        };

        let first = CancellationToken::new();
        let older = DiagnosticService::diagnostics(&file, &services, &first);
        let newer = async {
            // Request N+1 supersedes request N while N is suspended
            first.cancel();
            let second = CancellationToken::new();
            gate.notify_one();
            DiagnosticService::diagnostics(&file, &services, &second).await
        };
        let (older, newer) = tokio::join!(older, newer);
        assert!(older.is_none());
        assert_eq!(newer.unwrap().len(), 2);
    }

    #[test]
    fn test_syntax_diagnostics() {
        let text = "<template><div></template>\n<template></template>";
        let file = source_file(text);
        let diagnostics = DiagnosticService::syntax_diagnostics(&file);
        let codes: Vec<_> = diagnostics
            .iter()
            .map(|d| d.code.clone().unwrap())
            .collect();
        assert_eq!(
            codes,
            vec![
                NumberOrString::String("DUPLICATE_TEMPLATE".into()),
                NumberOrString::String("MissingEndTag".into()),
            ]
        );
        assert!(diagnostics.iter().all(|d| d.source.as_deref() == Some(SOURCE)));
    }
}
