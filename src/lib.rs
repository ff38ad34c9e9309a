// Library root
// -----------
// Watches a directory and uploads new video files to api.video in chunks.
// The binary (`main.rs`) wires these modules together.
//
// Module responsibilities:
// - `api`: HTTP calls to the api.video endpoints behind the `VideoApi` trait.
// - `auth`: when to fetch a new bearer token.
// - `chunk`: byte ranges and the chunk reader.
// - `config`: command line / environment configuration.
// - `errors`: error types.
// - `uploader`: the classify -> create -> chunk loop workflow.
// - `watcher`: filesystem creation events.
pub mod api;
pub mod auth;
pub mod chunk;
pub mod config;
pub mod errors;
pub mod uploader;
pub mod watcher;
