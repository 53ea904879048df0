//! HTTP UI shell.
//!
//! One server-rendered page per browser session plus a small JSON API:
//! - `GET  /`             - analysis page
//! - `POST /upload`       - store one smear image (multipart field `file`)
//! - `POST /analyze`      - run one attempt on the held image
//! - `GET  /api/health`   - liveness and configuration state
//! - `POST /api/analyze`  - one-shot upload + analysis, JSON in/out

pub mod endpoints;
pub mod error;
pub mod page;
pub mod router;
pub mod server;
pub mod types;
