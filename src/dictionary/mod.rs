//! Word resolution / 查词
//!
//! local dictionary -> persistent cache -> ordered remote endpoints

pub mod cache;
pub mod failover;
pub mod local;
pub mod remote;
pub mod resolver;

pub use cache::{CacheStats, WordCache};
pub use failover::{ChainOutcome, Endpoint, FailoverChain};
pub use local::LocalDictionary;
pub use remote::{GoogleTranslator, JishoProvider, RemoteLookup, RemoteSense, Translator, WordProvider};
pub use resolver::{ResolverStats, WordResolver};
