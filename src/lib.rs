/*!
# Salesboard

A business-intelligence dashboard server for organizational groups, fed by
Google Sheets published as CSV export URLs.

## Overview

The sheets are the system's data store: non-engineers maintain weekly KPI
figures, member lists, deals and CEO messages in spreadsheet tabs. This
server pulls the published CSV exports on demand, shapes them into a
canonical JSON payload, and serves them to the dashboard screens, which poll
the API every 30-60 seconds.

## Architecture

The server follows a fetch-shape-serve pipeline:

### Ingestion Layer
- **CSV Parser** (`loader`) - Single-pass quote-aware scanner turning raw CSV
  text into header-keyed records
- **Sheet Fetcher** (`fetcher`) - Pulls the published CSV URLs; if any sheet
  required by the primary payload fails, the whole response falls back to a
  bundled static sample

### Shaping Layer
- **Mapper** (`mapper`) - Normalizes drifting sheet headers through
  declarative alias tables into weekly reports, latest snapshots, active
  deals, trend history, members and CEO messages
- **Row State Tracker** (`tracker`) - Derives per-phase countdown status
  (dispatch 60d / transit 30d / customs 14d) for the logistics rows,
  anchoring each phase at the tick it first became meaningful
- **Status Store** (`store`) - Injected state service persisting the
  tracker's anchors as a versioned JSON document

### HTTP Layer
- **Router & Handlers** (`app`) - axum routes for the JSON API, static pages
  and the media listing
- **Login & Page Gate** (`login`) - env-configured credentials, in-memory
  sessions with an 8-hour HTTP-only cookie, and middleware gating every page
  outside the allow-list behind `/login?next=...`
- **News** (`news`) - best-effort RSS aggregation for the ticker endpoints

## REST API Endpoints

- `GET /api/data` - primary KPI payload (weekly, latest, deals, history...)
- `GET /api/technical` - technical rows plus logistics countdown statuses
- `GET /api/supply` - supply-chain rows
- `GET /api/events` - media file listing
- `GET /api/news`, `GET /api/news-en` - aggregated RSS items
- `GET /api/rates` - best-effort FX rates relay
- `POST /api/login`, `POST /api/logout` - session management
- `POST /api/ceo-message` - forwards a group message to the sheet webhook

## Error Handling

Failures never cascade to the client: sheet fetch errors fall back to the
sample or an empty row set, news sources drop out individually, and status
store write failures are swallowed (countdowns re-anchor on the next
recompute). The only surfaced error is 401 on a bad login.
*/

// Re-export all modules so they appear in the documentation
pub mod app;
pub mod config;
pub mod fetcher;
pub mod loader;
pub mod login;
pub mod mapper;
pub mod news;
pub mod store;
pub mod tracker;

/// Re-export the core types to make them easier to use
pub use loader::*;
pub use mapper::*;
pub use store::*;
pub use tracker::*;
