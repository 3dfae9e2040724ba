//! # storymap-core
//!
//! Core types shared by every stage of the story map pipeline.
//!
//! ## Overview
//!
//! - [`StoryMap`] / [`Activity`] / [`Task`] / [`Story`] - the generated map tree
//! - [`Priority`] / [`ReleaseBucket`] - release planning labels
//! - [`Language`] - target natural language for generated content
//! - [`Cache`] / [`InMemoryCache`] - optional key-value cache used by the generator
//! - [`StoryMapError`] / [`Result`] - unified error handling
//!
//! The JSON field names of the map are fixed by the wire format consumed by
//! downstream layers:
//!
//! ```rust
//! use storymap_core::StoryMap;
//!
//! let json = r#"{
//!     "productName": "Bookstore",
//!     "personas": ["Reader"],
//!     "map": [{
//!         "activity": "Discover",
//!         "tasks": [{
//!             "taskTitle": "Search",
//!             "stories": [{
//!                 "title": "Search by author",
//!                 "description": "As a reader I can search books by author name",
//!                 "priority": "MVP",
//!                 "acceptanceCriteria": ["Results list matching books"]
//!             }]
//!         }]
//!     }]
//! }"#;
//!
//! let map: StoryMap = serde_json::from_str(json).unwrap();
//! assert_eq!(map.story_count(), 1);
//! ```

pub mod cache;
pub mod error;
pub mod language;
pub mod map;

pub use cache::{Cache, InMemoryCache, cache_key};
pub use error::{InputError, Result, StoryMapError};
pub use language::Language;
pub use map::{Activity, Priority, ReleaseBucket, Story, StoryId, StoryMap, StoryRef, Task};
