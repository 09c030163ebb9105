// Resume analysis: prompt construction, response normalization, schema
// checks, the upload pipeline, and its HTTP handlers.
// All model calls go through llm_client.

pub mod handlers;
pub mod normalizer;
pub mod pipeline;
pub mod prompts;
pub mod schema;
