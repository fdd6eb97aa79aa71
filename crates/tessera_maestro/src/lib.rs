//! # tessera_maestro
//!
//! Maestro - feature dispatch and multi-project hosting for tessera.
//!
//! ## Name Origin
//!
//! **Maestro** is a master conductor who coordinates an orchestra.
//! `tessera_maestro` coordinates the embedded-language services: it routes
//! every request to the project that owns the document, translates
//! coordinates into each virtual document, asks the matching service, and
//! translates the answers back.
//!
//! ## Architecture
//!
//! ```text
//! +------------------------------------------------------------------+
//! |                       Protocol layer (external)                   |
//! +------------------------------------------------------------------+
//!         |  open/change/close, features, file events, flush
//!         v
//! +------------------------------------------------------------------+
//! |  ProjectManager                                                   |
//! |    DocumentStore (rope)     BTreeMap<manifest, ProjectHost>       |
//! +------------------------------------------------------------------+
//!         |                                  |
//!         v                                  v
//! +---------------------------+   +-------------------------------+
//! |  ide (feature dispatch)   |   |  ProjectHost                  |
//! |  hover, color, formatting |   |  manifest, watchers,          |
//! |  definition, references,  |   |  snapshot cache, versions,    |
//! |  rename, diagnostics      |   |  validation passes            |
//! +---------------------------+   +-------------------------------+
//!         |
//!         v
//! +------------------------------------------------------------------+
//! |  tessera_mosaic: SourceFile → VirtualDocuments + MappingTables    |
//! +------------------------------------------------------------------+
//! ```
//!
//! Logging goes through `tracing`; installing a subscriber is left to the
//! embedding binary.

pub mod document;
pub mod ide;
pub mod project;
pub mod service;

pub use document::{Document, DocumentStore};
pub use ide::{
    ColorService, DefinitionService, DiagnosticService, FormattingService, HoverService,
    ReferencesService, RenameService,
};
pub use project::{
    DiagnosticPublisher, FileEvent, FileEventKind, FileSystem, HostOptions, HostState, Manifest,
    ManifestError, MemoryFileSystem, OsFileSystem, ProjectError, ProjectHost, ProjectManager,
    ProjectResult, RequestTracker, SnapshotCache, ValidationPass, WatchError, WatchId,
};
pub use service::{EmbeddedService, LanguageServices, TextFormatter};
