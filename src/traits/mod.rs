//! Traits at the browser seam.
//!
//! The service never talks to `headless_chrome` directly. It goes through two
//! small traits so the Chrome implementation and the test doubles in
//! [`crate::factory::mock`] are interchangeable:
//!
//! - [`BrowserEngine`]: one launched browser, shared read-only by all requests
//! - [`PageSession`]: one isolated browsing context + page, owned by one request
//!
//! # Implementing a Custom Engine
//!
//! ```rust,ignore
//! use html2pdf_overlay_api::{BrowserEngine, PageSession, Result};
//!
//! struct RemoteEngine { /* websocket to a browser farm */ }
//!
//! impl BrowserEngine for RemoteEngine {
//!     fn new_session(&self) -> Result<Box<dyn PageSession>> {
//!         todo!()
//!     }
//!
//!     fn shutdown(&self) {}
//! }
//! ```

mod engine;

pub use engine::{BrowserEngine, PageSession, PdfPrintOptions};
