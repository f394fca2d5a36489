//! Process bootstrap (env, tracing, DB pool) and the job queue shared
//! between the API (producer) and the worker (consumer).

pub mod bootstrap;
pub mod jobs;
pub mod repo;
