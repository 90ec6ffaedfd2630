pub mod assemble;
pub mod deps_cache;
pub mod entrypoint;
pub mod schema_export;
