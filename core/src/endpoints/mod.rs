//! Endpoint wrappers, one file per resource family.
//!
//! Each wrapper maps to exactly one `send_request` call. Reads use GET and
//! every write uses POST, including updates, closes, moves and deletes,
//! because that is the verb the remote API expects for them.

mod cases;
mod datasets;
mod projects;
mod results;
mod runs;
mod sections;
mod suites;
