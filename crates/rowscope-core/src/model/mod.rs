//! Runtime data model definitions.
//!
//! Types in `model` describe *what the engine queries*: entity descriptors,
//! column handles, stored rows, and the record status vocabulary shared by
//! access policies and the status workflow. They are supplied by the schema
//! layer and never owned by the plan builder.
pub mod entity;
pub mod row;
pub mod status;
