/*!
# Submission Linker

Links a folder of student submission files to the rows of a gradebook sheet,
built in Rust.

## Overview

Given a folder of files downloaded from an LMS and a gradebook laid out as a
spreadsheet, the tool works out which row each file belongs to, stores the file
with a file-hosting service and writes a shareable link into that row. Every
run first produces a plan; a dry run stops there and reports it, a live run
executes the same plan.

## Architecture

### Planning (pure)
- **Parser** - Extracts candidate identities (student id, person name, group
  name) from a filename. Moodle-style names, legacy numeric prefixes and bare
  "First Last" names are recognised.
- **Match tables** - An optional group mapping (student name -> group) and an
  optional precomputed match table (filename -> identity) loaded from CSV.
- **Resolver** - Maps candidates onto a gradebook row with a fixed, configurable
  strategy precedence and records the method that matched.
- **Conflict guard** - A row whose link cell already holds text is never
  overwritten.
- **Planner** - One decision per file, in enumeration order, with counts.

### Execution
- **Executor** - Stores each actionable file, writes its link, appends rows for
  new groups. Failures stay with their file; the batch continues.
- **Live overlay** - Writes made during the run are visible to later entries, so
  two files never fill the same row.

### Stores
- `FileStore`, `TabularStore` and `CredentialProvider` traits with local adapters
  (a directory and a CSV file) and, behind the `google` feature, Drive and Sheets
  adapters.

### Persistence
- Reports as plain text, match tables as CSV, saved plans as gzip-compressed
  bincode.

## Modules

- **cell**: Column letters, A1 cell references and range specs
- **config**: `config.json` loading and validation
- **error**: Error types
- **submissions**: Folder enumeration and MIME types
- **gradebook**: Gradebook snapshot and the live overlay
- **parser**: Filename parsing
- **tables**: Group mapping, precomputed matches and CSV helpers
- **resolver**: Identity resolution
- **guard**: Link-cell conflict check
- **planner**: Decisions and plans
- **remote**: Store and credential traits
- **credentials**: Token file credentials
- **local**: Local store adapters
- **google**: Drive and Sheets adapters (feature `google`)
- **executor**: Plan execution
- **report**: Reports and match table export
- **suggest**: Closest-match hints for unresolved files
- **saving**: Saved plans

## Usage

```text
submission-linker plan                 # dry run, writes the report
submission-linker plan --save plan.bin.gz
submission-linker upload --expect-plan plan.bin.gz
submission-linker matches --out matches.csv
submission-linker check-auth
```
*/

pub mod cell;
pub mod config;
pub mod credentials;
pub mod error;
pub mod executor;
#[cfg(feature = "google")]
pub mod google;
pub mod gradebook;
pub mod guard;
pub mod local;
pub mod parser;
pub mod planner;
pub mod remote;
pub mod report;
pub mod resolver;
pub mod saving;
pub mod submissions;
pub mod suggest;
pub mod tables;

/// Re-export the types most callers need
pub use cell::*;
pub use config::*;
pub use credentials::*;
pub use error::*;
pub use executor::*;
#[cfg(feature = "google")]
pub use google::*;
pub use gradebook::*;
pub use local::*;
pub use planner::*;
pub use remote::*;
pub use report::*;
pub use resolver::*;
pub use saving::*;
pub use submissions::*;
pub use tables::*;
