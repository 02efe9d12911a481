//! # Gallery Datamodel
//!
//! Builds the JavaScript datamodel behind a static photo gallery. The
//! photographer keeps a hand-edited `admin.toml` next to a directory of
//! images; each run turns the two into:
//!
//! - `datamodel.js`: a frozen `const DATAMODEL = {...}` object with every
//!   image's EXIF summary plus indices by tag, rating and date added.
//! - `images/thumbnails/`: one metadata-free thumbnail per image.
//! - `.datamodel-cache.json`: the records of this run, reused by the next.
//!
//! # Pipeline
//!
//! ```text
//! 1. Validate   admin.toml + images/  →  included / not included
//! 2. Reconcile  prior state + exiftool →  Datamodel
//! 3. Thumbnails Datamodel + magick     →  images/thumbnails/
//! 4. Serialize  Datamodel              →  datamodel.js + snapshot
//! ```
//!
//! Every stage is a function that returns a `Result`; [`pipeline::run_build`]
//! chains them. A failure in stages 1-3 stops the run before the artifact is
//! rewritten, so the previous datamodel stays loadable. In stage 4 the
//! artifact is written first; a snapshot write failing after it is reported
//! but leaves the new artifact in place.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`config`] | `admin.toml` loading, defaults and validation |
//! | [`scan`] | Stage 1: lists the image directory and checks it against the manifest |
//! | [`metadata`] | Raw EXIF → canonical fields via a fallback table |
//! | [`cache`] | Prior-run snapshot, content hashing, cache statistics |
//! | [`datamodel`] | Stage 2: reconciles records and derives the indices |
//! | [`process`] | Stage 3: thumbnail synchronization |
//! | [`generate`] | Stage 4: deterministic rendering and atomic writes |
//! | [`imaging`] | External tool backend and thumbnail sizing |
//! | [`pipeline`] | One full run, with a single error type |
//! | [`output`] | CLI output formatting |
//! | [`types`] | Datamodel types shared by every stage |
//!
//! # Design Decisions
//!
//! ## Manifest as Source of Truth
//!
//! An image is in the gallery only if `admin.toml` declares it. Files nobody
//! declared are listed at the end of the run rather than silently published,
//! and a declared file that is missing fails the run before any work starts.
//!
//! ## External Tools Behind a Trait
//!
//! EXIF extraction and resizing shell out to `exiftool` and ImageMagick.
//! Both sit behind [`imaging::ImageBackend`], so every stage is tested with a
//! recording mock and never needs the tools installed.
//!
//! ## Deterministic Output
//!
//! Every collection in [`types`] is a `BTreeMap` or `BTreeSet` and struct
//! fields are declared in key order, so the same input renders to the same
//! bytes. The generated file diffs cleanly under version control.

pub mod cache;
pub mod config;
pub mod datamodel;
pub mod generate;
pub mod imaging;
pub mod metadata;
pub mod output;
pub mod pipeline;
pub mod process;
pub mod scan;
pub mod types;

#[cfg(test)]
pub(crate) mod test_helpers;
