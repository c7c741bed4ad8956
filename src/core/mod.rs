// ─── InterfaceOficial Sync Core ───
// Loader composition and content update backend.
//
// Architecture:
//   core/
//     error/       LauncherError + selection validation errors
//     http/        Shared reqwest client
//     maven/       maven-metadata.xml parsing
//     loaders/     Loader kinds, compatibility, selection, version lists
//     content/     Content kinds, policies, file identity
//     registry/    Modrinth / CurseForge lookups + chain
//     downloader/  Streaming downloads with cancellation
//     update/      Verified, atomic replacement of content files
//     state/       Settings + application facade

pub mod content;
pub mod downloader;
pub mod error;
pub mod http;
pub mod loaders;
pub mod maven;
pub mod registry;
pub mod state;
pub mod update;
